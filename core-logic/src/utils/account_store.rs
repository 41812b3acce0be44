use crate::config::{AccountRecord, ProxyConfig};
use crate::error::ConfigError;
use std::fs;
use std::path::Path;
use tracing::info;

/// Loads the newline-delimited credential list and pairs it with proxies.
pub struct AccountStore;

impl AccountStore {
    /// Reads one credential per line. Blank lines and `#` comments are ignored.
    pub fn load_credentials(path: &Path) -> Result<Vec<String>, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            msg: e.to_string(),
        })?;

        let credentials: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        info!(
            "Loaded {} credentials from {}",
            credentials.len(),
            path.display()
        );
        Ok(credentials)
    }

    /// Builds account records without proxies.
    pub fn direct(credentials: Vec<String>) -> Vec<AccountRecord> {
        credentials
            .into_iter()
            .enumerate()
            .map(|(index, credential)| AccountRecord {
                index,
                credential,
                proxy: None,
            })
            .collect()
    }

    /// Pairs credential `i` with proxy `i`. Both lists must be the same length.
    pub fn paired(
        credentials: Vec<String>,
        proxies: Vec<ProxyConfig>,
    ) -> Result<Vec<AccountRecord>, ConfigError> {
        if credentials.len() != proxies.len() {
            return Err(ConfigError::CountMismatch {
                credentials: credentials.len(),
                proxies: proxies.len(),
            });
        }

        Ok(credentials
            .into_iter()
            .zip(proxies)
            .enumerate()
            .map(|(index, (credential, proxy))| AccountRecord {
                index,
                credential,
                proxy: Some(proxy),
            })
            .collect())
    }
}
