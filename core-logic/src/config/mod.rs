use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// One HTTP proxy as read from the proxy list.
///
/// `url` is always the bare `scheme://host:port`; credentials live in their
/// own fields so they never end up in log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Full URL including credentials, in the form reqwest expects.
    ///
    /// Credentials are percent-encoded, so `@`, `/` or `:` in a password
    /// cannot change the proxy host. A username without a password is kept.
    pub fn to_url(&self) -> Result<String, ConfigError> {
        let invalid = || ConfigError::InvalidUrl {
            field: "proxy".to_string(),
            url: self.host().to_string(),
        };
        let mut url = Url::parse(&self.url).map_err(|_| invalid())?;

        if let Some(user) = self.username.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(user).map_err(|_| invalid())?;
            if let Some(pass) = self.password.as_deref() {
                url.set_password(Some(pass)).map_err(|_| invalid())?;
            }
        }

        // Url keeps a trailing '/' path on http URLs; proxies don't need it.
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    /// Host and port only, safe to log.
    pub fn host(&self) -> &str {
        self.url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(self.url.as_str())
    }
}

/// Account list entry handed to the runner: one credential line plus the
/// proxy paired with it by position.
#[derive(Clone)]
pub struct AccountRecord {
    pub index: usize,
    pub credential: String,
    pub proxy: Option<ProxyConfig>,
}

impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("index", &self.index)
            .field("credential", &"***REDACTED***")
            .field("proxy", &self.proxy.as_ref().map(|p| p.host()))
            .finish()
    }
}
