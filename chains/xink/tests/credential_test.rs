use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use core_logic::CredentialError;
use xink_project::credential::Credential;

fn jwt(payload: &str) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(payload)
    )
}

#[test]
fn test_claims_are_read_from_payload() {
    let credential =
        Credential::parse(&jwt(r#"{"walletAddress":"0xAbC","exp":1700000000}"#)).unwrap();

    assert_eq!(credential.wallet_address(), "0xAbC");
    assert_eq!(credential.expires_at().unwrap().timestamp(), 1_700_000_000);
}

#[test]
fn test_expiry_compares_against_now() {
    let credential =
        Credential::parse(&jwt(r#"{"walletAddress":"0x1","exp":1000}"#)).unwrap();

    assert!(!credential.is_expired_at(999));
    assert!(!credential.is_expired_at(1000));
    assert!(credential.is_expired_at(1001));
    assert!(credential.is_expired());
}

#[test]
fn test_missing_claims_are_reported() {
    let err = Credential::parse(&jwt(r#"{"exp":1000}"#)).unwrap_err();
    assert_eq!(
        err,
        CredentialError::MissingClaim {
            claim: "walletAddress".into()
        }
    );

    let err = Credential::parse(&jwt(r#"{"walletAddress":"0x1"}"#)).unwrap_err();
    assert_eq!(err, CredentialError::MissingClaim { claim: "exp".into() });
}

#[test]
fn test_malformed_tokens_are_rejected() {
    assert!(matches!(
        Credential::parse("only.two").unwrap_err(),
        CredentialError::InvalidSegments { segments: 2 }
    ));
    assert!(matches!(
        Credential::parse("a.!!!.c").unwrap_err(),
        CredentialError::InvalidEncoding { .. }
    ));
    assert!(matches!(
        Credential::parse(&jwt("not json")).unwrap_err(),
        CredentialError::InvalidPayload { .. }
    ));
}

#[test]
fn test_debug_hides_token() {
    let raw = jwt(r#"{"walletAddress":"0x1","exp":1000}"#);
    let credential = Credential::parse(&raw).unwrap();

    let dbg = format!("{:?}", credential);
    assert!(!dbg.contains(&raw));
    assert!(dbg.contains("REDACTED"));
    assert_eq!(credential.token(), raw);
}
