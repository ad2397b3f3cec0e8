//! Device token signing tests against the fixture key pair

use envagent::auth::jwt::Es256Signer;
use envagent::auth::{Claims, CredentialSigner, SigningError};
use envagent::protocol::Identity;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use proptest::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn signer() -> Es256Signer {
    Es256Signer::from_pem_file(&fixture("device-ec-private.pem")).unwrap()
}

fn identity() -> Identity {
    Identity::new("my-project", "europe-west1", "sensors", "mkr-env-01")
}

fn decode_claims(token: &str) -> Claims {
    let public = std::fs::read(fixture("device-ec-public.pem")).unwrap();
    let mut validation = Validation::new(Algorithm::ES256);
    validation.set_audience(&["my-project"]);
    validation.validate_exp = false;
    decode::<Claims>(token, &DecodingKey::from_ec_pem(&public).unwrap(), &validation)
        .unwrap()
        .claims
}

#[test]
fn test_token_expires_one_day_after_issue() {
    let token = signer().sign(1_700_000_000, &identity()).unwrap();
    let claims = decode_claims(token.as_str());

    assert_eq!(claims.aud, "my-project");
    assert_eq!(claims.exp - claims.iat, 86_400);
}

#[test]
fn test_token_rejected_for_other_audience() {
    let token = signer().sign(1_700_000_000, &identity()).unwrap();
    let public = std::fs::read(fixture("device-ec-public.pem")).unwrap();

    let mut validation = Validation::new(Algorithm::ES256);
    validation.set_audience(&["other-project"]);
    validation.validate_exp = false;
    let result = decode::<Claims>(
        token.as_str(),
        &DecodingKey::from_ec_pem(&public).unwrap(),
        &validation,
    );
    assert!(result.is_err());
}

#[test]
fn test_public_key_is_not_a_signing_key() {
    let result = Es256Signer::from_pem_file(&fixture("device-ec-public.pem"));
    assert!(matches!(result, Err(SigningError::SigningUnavailable(_))));
}

#[test]
fn test_token_debug_hides_value() {
    let token = signer().sign(1_700_000_000, &identity()).unwrap();
    let rendered = format!("{token:?}");
    assert!(!rendered.contains(token.as_str()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_claims_follow_issue_time(iat in 0u64..4_000_000_000) {
        let token = signer().sign(iat, &identity()).unwrap();
        let claims = decode_claims(token.as_str());
        prop_assert_eq!(claims.iat, iat);
        prop_assert_eq!(claims.exp, iat + 86_400);
    }

    #[test]
    fn prop_different_issue_times_give_different_tokens(
        iat in 0u64..4_000_000_000,
        offset in 1u64..100_000,
    ) {
        let signer = signer();
        let first = signer.sign(iat, &identity()).unwrap();
        let second = signer.sign(iat + offset, &identity()).unwrap();
        prop_assert_ne!(first.as_str(), second.as_str());
    }
}
