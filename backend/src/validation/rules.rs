//! Common validation rules shared across request payloads.

use std::borrow::Cow;
use validator::ValidationError;

/// Smallest session extension a caller may request, in minutes.
pub const MIN_EXTEND_MINUTES: i64 = 5;
/// Largest session extension a caller may request (8 hours).
pub const MAX_EXTEND_MINUTES: i64 = 480;
/// Extension applied when the caller does not name one.
pub const DEFAULT_EXTEND_MINUTES: i64 = 30;

/// Validates a display name.
///
/// Requirements:
/// - Not blank after trimming
/// - At most 100 characters
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(ValidationError::new("name_invalid_length")
            .with_message(Cow::Borrowed("must be between 1 and 100 characters")));
    }
    Ok(())
}

/// Validates a requested session extension.
///
/// Runs before the store is touched; the store itself trusts its caller.
pub fn validate_extend_minutes(minutes: i64) -> Result<(), ValidationError> {
    if !(MIN_EXTEND_MINUTES..=MAX_EXTEND_MINUTES).contains(&minutes) {
        return Err(ValidationError::new("extend_minutes_out_of_range")
            .with_message(Cow::Owned(extend_minutes_range_message())));
    }
    Ok(())
}

pub fn extend_minutes_range_message() -> String {
    format!(
        "Minutes must be between {} and {}",
        MIN_EXTEND_MINUTES, MAX_EXTEND_MINUTES
    )
}
