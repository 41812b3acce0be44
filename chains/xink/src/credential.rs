use chrono::{DateTime, TimeZone, Utc};
use core_logic::{CredentialError, SecurityUtils};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A bearer token together with the claims read from its payload.
///
/// The raw token is wiped on drop and never shows up in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    token: String,
    #[zeroize(skip)]
    wallet_address: String,
    #[zeroize(skip)]
    expires_at: i64,
}

impl Credential {
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let token = raw.trim();
        let claims = SecurityUtils::decode_jwt_payload(token)?;

        let wallet_address = claims
            .get("walletAddress")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CredentialError::MissingClaim {
                claim: "walletAddress".to_string(),
            })?
            .to_string();

        // Some issuers emit `exp` as a float.
        let expires_at = claims
            .get("exp")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .ok_or_else(|| CredentialError::MissingClaim {
                claim: "exp".to_string(),
            })?;

        Ok(Self {
            token: token.to_string(),
            wallet_address,
            expires_at,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }

    /// `now` is UNIX seconds.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"***REDACTED***")
            .field("wallet_address", &self.wallet_address)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
