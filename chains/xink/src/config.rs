use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use core_logic::{ConfigError, RetryConfig, RunnerConfig};
use serde::Deserialize;
use std::time::Duration;

use crate::account::RunSettings;
use crate::api::client::HttpSettings;

/// Bot settings. Every field has a default, so the TOML file is optional and
/// any key can be overridden with an `XINK_` environment variable.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct XinkConfig {
    pub base_url: String,
    /// Queried once at startup; its `endpoint` wins over `base_url`.
    pub discovery_url: Option<String>,
    pub origin: String,
    pub ip_check_url: String,

    pub tokens_file: String,
    pub proxy_file: String,
    pub fingerprint_file: String,
    pub expired_file: String,

    pub use_proxy: bool,
    pub max_threads: usize,
    pub max_threads_no_proxy: usize,

    pub request_timeout_secs: u64,
    pub request_retries: u32,
    pub retry_delay_ms: u64,
    pub status_attempts: u32,

    pub action_delay_ms: u64,
    pub start_delay_min: u64,
    pub start_delay_max: u64,
    pub batch_pause_secs: u64,
    pub time_sleep_minutes: u64,
    pub account_timeout_hours: u64,
}

impl Default for XinkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.x.ink/v1".to_string(),
            discovery_url: None,
            origin: "https://x.ink".to_string(),
            ip_check_url: "https://api.ipify.org?format=json".to_string(),
            tokens_file: "tokens.txt".to_string(),
            proxy_file: "proxy.txt".to_string(),
            fingerprint_file: "session_user_agents.json".to_string(),
            expired_file: "expired_wallets.txt".to_string(),
            use_proxy: false,
            max_threads: 50,
            max_threads_no_proxy: 1,
            request_timeout_secs: 30,
            request_retries: 1,
            retry_delay_ms: 3000,
            status_attempts: 2,
            action_delay_ms: 1000,
            start_delay_min: 1,
            start_delay_max: 5,
            batch_pause_secs: 3,
            time_sleep_minutes: 1440,
            account_timeout_hours: 24,
        }
    }
}

impl XinkConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("XINK").try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path, e))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("base_url", &self.base_url, true)?;
        check_url("origin", &self.origin, false)?;
        check_url("ip_check_url", &self.ip_check_url, false)?;
        if let Some(url) = &self.discovery_url {
            check_url("discovery_url", url, false)?;
        }

        if self.max_threads == 0 {
            return Err(invalid("max_threads", "must be at least 1"));
        }
        if self.max_threads_no_proxy == 0 {
            return Err(invalid("max_threads_no_proxy", "must be at least 1"));
        }
        if self.status_attempts == 0 {
            return Err(invalid("status_attempts", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.start_delay_min > self.start_delay_max {
            return Err(invalid(
                "start_delay_min",
                &format!(
                    "{} is greater than start_delay_max ({})",
                    self.start_delay_min, self.start_delay_max
                ),
            ));
        }
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        if self.use_proxy {
            self.max_threads
        } else {
            self.max_threads_no_proxy
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            batch_size: self.batch_size(),
            account_timeout: Duration::from_secs(self.account_timeout_hours * 60 * 60),
            batch_pause: Duration::from_secs(self.batch_pause_secs),
            pass_interval: Duration::from_secs(self.time_sleep_minutes * 60),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.request_retries, self.retry_delay_ms)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.request_timeout_secs),
            retry: self.retry_config(),
            origin: self.origin.clone(),
            ip_check_url: self.ip_check_url.clone(),
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            use_proxy: self.use_proxy,
            status_attempts: self.status_attempts,
            action_delay: Duration::from_millis(self.action_delay_ms),
            start_delay_min: Duration::from_secs(self.start_delay_min),
            start_delay_max: Duration::from_secs(self.start_delay_max),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// `base_url` may be empty when a discovery URL is expected to supply it.
fn check_url(field: &str, value: &str, allow_empty: bool) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() && allow_empty {
        return Ok(());
    }
    let parsed = reqwest::Url::parse(value).ok().filter(|url| {
        matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some_and(|host| !host.is_empty())
    });
    match parsed {
        Some(_) => Ok(()),
        None => Err(ConfigError::InvalidUrl {
            field: field.to_string(),
            url: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = XinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.retry_config().attempts(), 2);
    }

    #[test]
    fn proxy_variant_uses_max_threads() {
        let config = XinkConfig {
            use_proxy: true,
            ..Default::default()
        };
        assert_eq!(config.runner_config().batch_size, 50);
    }

    #[test]
    fn rejects_inverted_start_delay() {
        let config = XinkConfig {
            start_delay_min: 9,
            start_delay_max: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_bad_urls() {
        let cases = [
            ("origin", "x.ink"),
            ("origin", "http://:99999"),
            ("origin", "ftp://x.ink"),
            ("base_url", "https://exa mple.com/v1"),
            ("base_url", "https:///v1"),
            ("ip_check_url", "http://1.2.3.4:99999"),
        ];
        for (field, url) in cases {
            let mut config = XinkConfig::default();
            match field {
                "origin" => config.origin = url.into(),
                "base_url" => config.base_url = url.into(),
                _ => config.ip_check_url = url.into(),
            }
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })),
                "{} = {:?} should be rejected",
                field,
                url
            );
        }
    }

    #[test]
    fn accepts_empty_base_url_and_ports() {
        let config = XinkConfig {
            base_url: String::new(),
            origin: "http://localhost:8080".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
