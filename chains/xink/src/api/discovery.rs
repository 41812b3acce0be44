use core_logic::ConfigError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Body served by the discovery URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryResponse {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBase {
    pub base_url: String,
    pub discovered: bool,
}

/// Picks the discovered endpoint when present, otherwise the configured
/// fallback.
pub fn pick_base_url(
    discovered: Option<&DiscoveryResponse>,
    fallback: &str,
) -> Result<ResolvedBase, ConfigError> {
    let endpoint = discovered
        .and_then(|d| d.endpoint.as_deref())
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if let Some(endpoint) = endpoint {
        return Ok(ResolvedBase {
            base_url: endpoint.trim_end_matches('/').to_string(),
            discovered: true,
        });
    }

    let fallback = fallback.trim();
    if fallback.is_empty() {
        return Err(ConfigError::BaseUrlUnresolved {
            reason: "no endpoint discovered and base_url is empty".to_string(),
        });
    }
    Ok(ResolvedBase {
        base_url: fallback.trim_end_matches('/').to_string(),
        discovered: false,
    })
}

async fn fetch(url: &str, timeout: Duration) -> Result<DiscoveryResponse, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<DiscoveryResponse>()
        .await
}

/// Resolves the API base URL once at startup. Discovery failures fall back
/// to `base_url`; only a missing fallback is an error.
pub async fn resolve_base_url(
    discovery_url: Option<&str>,
    base_url: &str,
    timeout: Duration,
) -> Result<ResolvedBase, ConfigError> {
    let discovered = match discovery_url {
        Some(url) => match fetch(url, timeout).await {
            Ok(resp) => {
                if let Some(message) = resp.message.as_deref().filter(|m| !m.is_empty()) {
                    info!("{}", message);
                }
                Some(resp)
            }
            Err(e) => {
                warn!("Base URL discovery failed ({}), using configured base_url", e);
                None
            }
        },
        None => None,
    };

    let resolved = pick_base_url(discovered.as_ref(), base_url)?;
    info!(
        "API base URL: {}{}",
        resolved.base_url,
        if resolved.discovered { " (discovered)" } else { "" }
    );
    Ok(resolved)
}
