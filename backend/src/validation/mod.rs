//! Validation for request payloads.
//!
//! Range and format checks live here so handlers reject bad input before it
//! reaches the session store.

pub mod rules;

pub use validator::Validate;
