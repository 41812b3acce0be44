use async_trait::async_trait;
use core_logic::{with_retry_if, ProxyConfig, RetryConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

use super::{ApiError, ApiFactory, RewardReceipt, RewardsApi, UserInfo};
use crate::credential::Credential;
use crate::fingerprint::{DeviceProfile, FingerprintService};

/// Request behaviour shared by every account client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub origin: String,
    pub ip_check_url: String,
}

/// Builds a reqwest client carrying the device headers, routed through
/// `proxy` when given. Without a proxy, system proxy variables are ignored.
pub fn build_http_client(
    profile: &DeviceProfile,
    proxy: Option<&ProxyConfig>,
    settings: &HttpSettings,
) -> Result<Client, ApiError> {
    let mut builder = Client::builder()
        .default_headers(device_headers(profile, &settings.origin)?)
        .timeout(settings.timeout);

    builder = match proxy {
        // Credentials ride in the URL so socks5 proxies get them too.
        Some(p) => {
            let full = p.to_url().map_err(|e| ApiError::Setup(e.to_string()))?;
            let px = reqwest::Proxy::all(full).map_err(|e| {
                ApiError::Setup(format!("Invalid proxy {}: {}", p.host(), e))
            })?;
            builder.proxy(px)
        }
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| ApiError::Setup(e.to_string()))
}

fn device_headers(profile: &DeviceProfile, origin: &str) -> Result<HeaderMap, ApiError> {
    let origin = origin.trim_end_matches('/');
    let pairs = [
        ("accept", "application/json, text/plain, */*".to_string()),
        ("accept-language", "en-US,en;q=0.9".to_string()),
        ("content-type", "application/json".to_string()),
        ("origin", origin.to_string()),
        ("referer", format!("{}/", origin)),
        ("sec-ch-ua", profile.sec_ch_ua()),
        ("sec-ch-ua-mobile", "?1".to_string()),
        ("sec-ch-ua-platform", format!("\"{}\"", profile.platform)),
        ("sec-fetch-dest", "empty".to_string()),
        ("sec-fetch-mode", "cors".to_string()),
        ("sec-fetch-site", "same-site".to_string()),
        ("user-agent", profile.user_agent.clone()),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| ApiError::Setup(format!("Bad header {}: {}", name, e)))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Replaces the body with its `data` field when that field holds something.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() && data != Value::Bool(false) => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Rewards API client bound to one credential, one device profile and
/// optionally one proxy.
pub struct XinkClient {
    http: Client,
    base_url: String,
    token: Zeroizing<String>,
    settings: Arc<HttpSettings>,
}

impl XinkClient {
    pub fn new(
        base_url: &str,
        token: &str,
        profile: &DeviceProfile,
        proxy: Option<&ProxyConfig>,
        settings: Arc<HttpSettings>,
    ) -> Result<Self, ApiError> {
        let http = build_http_client(profile, proxy, &settings)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token.to_string()),
            settings,
        })
    }

    /// Authenticated call with retry. HTTP 400 is returned at once; any other
    /// failure is retried and, once the budget is spent, reported as
    /// [`ApiError::Exhausted`] with the last error's message.
    pub async fn request(&self, method: Method, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let retry = self.settings.retry;

        let result = with_retry_if(
            retry,
            &url,
            || self.send_once(method.clone(), &url),
            ApiError::is_retryable,
        )
        .await;

        result.map_err(|e| match e {
            ApiError::Status { .. } | ApiError::Transport { .. } => ApiError::Exhausted {
                endpoint: url.clone(),
                attempts: retry.attempts(),
                message: e.to_string(),
            },
            other => other,
        })
    }

    async fn send_once(&self, method: Method, url: &str) -> Result<Value, ApiError> {
        let response = self
            .http
            .request(method, url)
            .bearer_auth(self.token.as_str())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(ApiError::Incompatible {
                endpoint: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(url, e))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        // A 2xx is a success even when the body isn't JSON; callers decide
        // whether they needed one.
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(unwrap_data(body)),
            Err(_) => Ok(Value::String(text)),
        }
    }

    async fn request_as<T: DeserializeOwned + Default>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, ApiError> {
        let payload = self.request(method, path).await?;
        if payload.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(payload).map_err(|e| ApiError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Any 2xx counts as success; an unexpected body only loses the points label.
    async fn request_receipt(&self, path: &str) -> Result<RewardReceipt, ApiError> {
        let payload = self.request(Method::POST, path).await?;
        Ok(serde_json::from_value(payload).unwrap_or_default())
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> ApiError {
    let message = if e.is_timeout() {
        "timed out".to_string()
    } else {
        e.to_string()
    };
    ApiError::Transport {
        endpoint: url.to_string(),
        message,
    }
}

#[async_trait]
impl RewardsApi for XinkClient {
    async fn public_ip(&self) -> Result<String, ApiError> {
        let url = self.settings.ip_check_url.as_str();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| ApiError::Decode {
            endpoint: url.to_string(),
            message: e.to_string(),
        })?;
        body.get("ip")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode {
                endpoint: url.to_string(),
                message: "no ip field".to_string(),
            })
    }

    async fn user_info(&self) -> Result<UserInfo, ApiError> {
        self.request_as(Method::GET, "/me").await
    }

    async fn check_in(&self) -> Result<RewardReceipt, ApiError> {
        self.request_receipt("/check-in").await
    }

    async fn spin_records(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/my-spinRecords").await
    }

    async fn draw(&self) -> Result<RewardReceipt, ApiError> {
        self.request_receipt("/draw").await
    }
}

/// Produces an [`XinkClient`] per account, looking up the account's device
/// profile in the fingerprint cache.
pub struct XinkApiFactory {
    base_url: String,
    settings: Arc<HttpSettings>,
    fingerprints: FingerprintService,
}

impl XinkApiFactory {
    pub fn new(base_url: String, settings: HttpSettings, fingerprints: FingerprintService) -> Self {
        Self {
            base_url,
            settings: Arc::new(settings),
            fingerprints,
        }
    }
}

#[async_trait]
impl ApiFactory for XinkApiFactory {
    type Api = XinkClient;

    async fn connect(
        &self,
        credential: &Credential,
        proxy: Option<&ProxyConfig>,
    ) -> Result<XinkClient, ApiError> {
        let profile = self
            .fingerprints
            .resolve(credential.wallet_address())
            .await
            .map_err(|e| ApiError::Setup(format!("{:#}", e)))?;
        debug!(
            "{} using {} profile",
            credential.wallet_address(),
            profile.platform
        );
        XinkClient::new(
            &self.base_url,
            credential.token(),
            &profile,
            proxy,
            self.settings.clone(),
        )
    }
}
