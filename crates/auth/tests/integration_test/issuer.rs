//! Tests for the stateful `TokenIssuer`.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use flurry_auth::{CredentialProvider, FixedClock, TokenIssuer};

use crate::{token_config, verified_claims};

#[test]
fn issuer_uses_injected_clock() {
    let now = Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap();
    let issuer =
        TokenIssuer::with_clock(&token_config("org.acct", "svc_user"), Arc::new(FixedClock(now)))
            .unwrap();

    let cred = issuer.credential().unwrap();
    let claims = verified_claims(cred.as_str());

    assert_eq!(claims.iat, now.timestamp());
    assert_eq!(claims.exp, now.timestamp() + 120);
    assert_eq!(claims.sub, "ORG-ACCT.SVC_USER");
    assert_eq!(issuer.subject(), "ORG-ACCT.SVC_USER");
    assert_eq!(claims.iss, format!("ORG-ACCT.SVC_USER.{}", issuer.fingerprint()));
}

#[test]
fn every_call_issues_a_fresh_credential() {
    let issuer = TokenIssuer::new(&token_config("acct", "jdoe")).unwrap();

    let first = issuer.credential().unwrap();
    let second = issuer.credential().unwrap();

    assert!(second.issued_at() >= first.issued_at());
    assert!(first.expires_at() > first.issued_at());
}

#[test]
fn construction_fails_on_bad_keys() {
    let mut config = token_config("acct", "jdoe");
    config.public_key_pem = String::new();
    assert!(TokenIssuer::new(&config).is_err());
}

#[test]
fn clock_at_end_of_calendar_fails_instead_of_overflowing() {
    let issuer = TokenIssuer::with_clock(
        &token_config("acct", "jdoe"),
        Arc::new(FixedClock(chrono::DateTime::<Utc>::MAX_UTC)),
    )
    .unwrap();

    let err = issuer.credential().unwrap_err();
    assert!(matches!(err, flurry_auth::AuthError::SigningFailed(_)), "got {err:?}");
}
