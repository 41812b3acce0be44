//! Rewards API surface: response types, the error taxonomy and the traits
//! the account task talks to.

pub mod client;
pub mod discovery;

use async_trait::async_trait;
use core_logic::ProxyConfig;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::credential::Credential;

/// `GET /me`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub points: Value,
    #[serde(default)]
    pub check_in_count: Value,
    /// Date string or epoch milliseconds, depending on the backend build.
    #[serde(default, rename = "lastCheckIn")]
    pub last_check_in: Value,
    #[serde(default, rename = "currentDraws", deserialize_with = "lenient_count")]
    pub current_draws: u32,
}

impl UserInfo {
    /// `lastCheckIn` as text; numbers become their integer millisecond form.
    pub fn last_check_in_text(&self) -> Option<String> {
        match &self.last_check_in {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(|millis| millis.to_string()),
            _ => None,
        }
    }
}

/// Accepts a count as a number, a numeric string or null (0).
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let count = match raw {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Body of a check-in or draw response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewardReceipt {
    #[serde(default, rename = "pointsEarned")]
    pub points_earned: Option<Value>,
}

impl RewardReceipt {
    pub fn points_label(&self) -> String {
        match &self.points_earned {
            Some(Value::Null) | None => "?".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 400: the server no longer accepts what this client sends.
    #[error("Invalid request for {endpoint} (HTTP 400), the API has probably changed; update the bot")]
    Incompatible { endpoint: String },

    #[error("HTTP {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Request failed after {attempts} attempts: {endpoint} | {message}")]
    Exhausted {
        endpoint: String,
        attempts: u32,
        message: String,
    },

    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Incompatible { .. })
    }

    /// Transport failures and non-400 statuses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Status { .. } | ApiError::Transport { .. })
    }
}

/// Everything one account does against the rewards backend.
#[async_trait]
pub trait RewardsApi: Send + Sync {
    /// Public IP as seen through the account's proxy.
    async fn public_ip(&self) -> Result<String, ApiError>;

    async fn user_info(&self) -> Result<UserInfo, ApiError>;

    async fn check_in(&self) -> Result<RewardReceipt, ApiError>;

    async fn spin_records(&self) -> Result<Value, ApiError>;

    async fn draw(&self) -> Result<RewardReceipt, ApiError>;
}

/// Builds the per-account [`RewardsApi`] once the credential is known to be
/// usable.
#[async_trait]
pub trait ApiFactory: Send + Sync + 'static {
    type Api: RewardsApi;

    async fn connect(
        &self,
        credential: &Credential,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self::Api, ApiError>;
}
