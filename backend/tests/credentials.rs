use authkeeper_backend::utils::{
    jwt::TokenIssuer,
    password::{hash_password, verify_password},
};
use chrono::Duration;

#[test]
fn password_digest_round_trip() {
    let digest = hash_password("correct").unwrap();
    assert!(digest.starts_with("$argon2id$"));
    assert!(verify_password("correct", &digest));
    assert!(!verify_password("wrong", &digest));
}

#[test]
fn malformed_digest_is_a_mismatch_not_an_error() {
    assert!(!verify_password("anything", "not-a-phc-string"));
    assert!(!verify_password("anything", ""));
    assert!(!verify_password("anything", "$argon2id$v=19$broken"));
}

#[test]
fn same_password_hashes_differently_each_time() {
    let first = hash_password("correct").unwrap();
    let second = hash_password("correct").unwrap();
    assert_ne!(first, second);
    assert!(verify_password("correct", &first));
    assert!(verify_password("correct", &second));
}

#[test]
fn expired_bearer_token_is_rejected() {
    let issuer = TokenIssuer::new("secret", Duration::minutes(30));
    let (token, _) = issuer
        .issue_with_ttl("alice@example.com", Duration::minutes(-5))
        .unwrap();
    assert!(issuer.verify(&token).is_err());
}

#[test]
fn bearer_token_carries_principal_and_expiry() {
    let issuer = TokenIssuer::new("secret", Duration::minutes(30));
    let (token, claims) = issuer.issue("alice@example.com").unwrap();
    assert_eq!(claims.exp - claims.iat, 30 * 60);

    let verified = issuer.verify(&token).unwrap();
    assert_eq!(verified.sub, "alice@example.com");
    assert_eq!(verified.jti, claims.jti);

    let other = TokenIssuer::new("other-secret", Duration::minutes(30));
    assert!(other.verify(&token).is_err());
}
