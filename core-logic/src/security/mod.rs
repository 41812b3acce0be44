use crate::error::CredentialError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

pub struct SecurityUtils;

impl SecurityUtils {
    /// Decodes the payload segment of a JWT.
    ///
    /// The signature is NOT verified; callers only read claims they already
    /// trust (expiry, account identity).
    pub fn decode_jwt_payload(token: &str) -> Result<Value, CredentialError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        if segments.len() != 3 {
            return Err(CredentialError::InvalidSegments {
                segments: segments.len(),
            });
        }

        // Some issuers keep the '=' padding.
        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| CredentialError::InvalidEncoding {
                reason: e.to_string(),
            })?;

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| CredentialError::InvalidPayload {
                reason: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(CredentialError::InvalidPayload {
                reason: "payload is not a JSON object".to_string(),
            });
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decodes_payload_claims() {
        let token = encode(r#"{"walletAddress":"0xabc","exp":1700000000}"#);
        let claims = SecurityUtils::decode_jwt_payload(&token).unwrap();
        assert_eq!(claims["walletAddress"], "0xabc");
        assert_eq!(claims["exp"], 1700000000);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = SecurityUtils::decode_jwt_payload("abc.def").unwrap_err();
        assert_eq!(err, CredentialError::InvalidSegments { segments: 2 });
    }

    #[test]
    fn rejects_non_base64_payload() {
        let err = SecurityUtils::decode_jwt_payload("a.!!!.c").unwrap_err();
        assert!(matches!(err, CredentialError::InvalidEncoding { .. }));
    }

    #[test]
    fn rejects_non_object_payload() {
        let token = encode("[1,2,3]");
        let err = SecurityUtils::decode_jwt_payload(&token).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidPayload { .. }));
    }
}
