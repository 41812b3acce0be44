use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use core_logic::{AccountRecord, AccountTask, TaskError};
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{ApiError, ApiFactory, RewardsApi};
use crate::credential::Credential;

/// Per-account pacing, shared by every task of a pass.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub use_proxy: bool,
    pub status_attempts: u32,
    /// Wait before the check-in and before every spin.
    pub action_delay: Duration,
    pub start_delay_min: Duration,
    pub start_delay_max: Duration,
}

impl RunSettings {
    pub fn random_start_delay(&self) -> Duration {
        let min = self.start_delay_min.as_millis() as u64;
        let max = self.start_delay_max.as_millis() as u64;
        if max <= min {
            return self.start_delay_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    /// Credential past its `exp`; nothing was sent.
    Expired,
    Processed {
        checked_in: bool,
        spins: u32,
        spins_available: u32,
    },
}

/// What the coordinator gets back from one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub index: usize,
    pub wallet: String,
    pub ip: Option<String>,
    pub status: AccountStatus,
}

/// Log helper that prefixes every line with `[Account N][ip]`.
struct AccountLog {
    number: usize,
    ip: Option<String>,
}

impl AccountLog {
    fn new(index: usize) -> Self {
        Self {
            number: index + 1,
            ip: None,
        }
    }

    fn tag(&self) -> String {
        match &self.ip {
            Some(ip) => format!("[Account {}][{}]", self.number, ip),
            None => format!("[Account {}]", self.number),
        }
    }

    fn info(&self, msg: &str) {
        info!("{} {}", self.tag(), msg);
    }

    fn warn(&self, msg: &str) {
        warn!("{} {}", self.tag(), msg);
    }

    fn error(&self, msg: &str) {
        error!("{} {}", self.tag(), msg);
    }

    /// Logs an API error and maps it to the runner's tiers.
    fn fail(&self, what: &str, e: ApiError) -> TaskError {
        if e.is_fatal() {
            self.error(&e.to_string());
            TaskError::Fatal(e.to_string())
        } else {
            self.error(&format!("{}: {}", what, e));
            TaskError::Failed(format!("{}: {}", what, e))
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "0".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads a `lastCheckIn` value as a local calendar date. Accepts RFC 3339,
/// naive date-times (taken as local), bare dates and epoch milliseconds.
pub fn parse_check_in_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|dt| dt.date_naive())
}

/// True only when `last_check_in` parses to `today`. Absent or unreadable
/// values count as "not checked in".
pub fn is_checked_in_today(last_check_in: Option<&str>, today: NaiveDate) -> bool {
    last_check_in
        .and_then(parse_check_in_date)
        .map(|date| date == today)
        .unwrap_or(false)
}

/// Status, check-in, spins and spin records for one account whose credential
/// has already been checked.
pub async fn run_account<A: RewardsApi + ?Sized>(
    api: &A,
    credential: &Credential,
    index: usize,
    settings: &RunSettings,
) -> Result<AccountReport, TaskError> {
    let mut log = AccountLog::new(index);

    if settings.use_proxy {
        match api.public_ip().await {
            Ok(ip) => log.ip = Some(ip),
            Err(e) => {
                log.warn(&format!("Cannot check proxy IP, skipping: {}", e));
                return Err(TaskError::Failed(format!("proxy check: {}", e)));
            }
        }
    }

    let delay = settings.random_start_delay();
    log.info(&format!(
        "========= Account {} | {} | Starting in {:.1} seconds...",
        index + 1,
        credential.wallet_address(),
        delay.as_secs_f64()
    ));
    sleep(delay).await;

    let mut info = None;
    let mut last_error = None;
    for _ in 0..settings.status_attempts.max(1) {
        match api.user_info().await {
            Ok(data) => {
                info = Some(data);
                break;
            }
            Err(e) if e.is_fatal() => return Err(log.fail("Status", e)),
            Err(e) => last_error = Some(e),
        }
    }
    let info = match (info, last_error) {
        (Some(info), _) => info,
        (None, Some(e)) => return Err(log.fail("Can't get user info, skipping", e)),
        (None, None) => return Err(TaskError::Failed("no status attempts".to_string())),
    };

    // Magenta in the console formatter.
    log.info(&format!(
        "Wallet: {} | Points: {} | Check-in Days: {} | Spins: {}",
        credential.wallet_address(),
        display(&info.points),
        display(&info.check_in_count),
        info.current_draws
    ));

    let mut checked_in = false;
    if is_checked_in_today(
        info.last_check_in_text().as_deref(),
        Local::now().date_naive(),
    ) {
        log.info("Already checked in today");
    } else {
        sleep(settings.action_delay).await;
        match api.check_in().await {
            Ok(receipt) => {
                checked_in = true;
                log.info(&format!(
                    "Check-in successful! Reward: {}",
                    receipt.points_label()
                ));
            }
            Err(e) if e.is_fatal() => return Err(log.fail("Check-in", e)),
            Err(e) => log.warn(&format!("Check-in failed: {}", e)),
        }
    }

    let available = info.current_draws;
    let mut spins = 0;
    if available > 0 {
        for _ in 0..available {
            sleep(settings.action_delay).await;
            match api.draw().await {
                Ok(receipt) => {
                    spins += 1;
                    log.info(&format!(
                        "Spin successful: +{} points",
                        receipt.points_label()
                    ));
                }
                Err(e) if e.is_fatal() => return Err(log.fail("Spin", e)),
                Err(e) => {
                    log.warn(&format!(
                        "Spin failed, leaving {} draws for the next pass: {}",
                        available - spins,
                        e
                    ));
                    break;
                }
            }
        }

        match api.spin_records().await {
            Ok(records) => {
                let count = records.as_array().map(Vec::len).unwrap_or(0);
                log.info(&format!("Spin records: {}", count));
            }
            Err(e) if e.is_fatal() => return Err(log.fail("Spin records", e)),
            Err(e) => log.warn(&format!("Can't load spin records: {}", e)),
        }
    }

    Ok(AccountReport {
        index,
        wallet: credential.wallet_address().to_string(),
        ip: log.ip.clone(),
        status: AccountStatus::Processed {
            checked_in,
            spins,
            spins_available: available,
        },
    })
}

/// One account for one pass. Built fresh every pass from its record.
pub struct AccountJob<F: ApiFactory> {
    record: AccountRecord,
    factory: Arc<F>,
    settings: Arc<RunSettings>,
}

impl<F: ApiFactory> AccountJob<F> {
    pub fn new(record: AccountRecord, factory: Arc<F>, settings: Arc<RunSettings>) -> Self {
        Self {
            record,
            factory,
            settings,
        }
    }
}

#[async_trait]
impl<F: ApiFactory> AccountTask for AccountJob<F> {
    type Report = AccountReport;

    fn index(&self) -> usize {
        self.record.index
    }

    async fn run(&self, _cancel: CancellationToken) -> Result<AccountReport, TaskError> {
        let index = self.record.index;
        let log = AccountLog::new(index);

        let credential = match Credential::parse(&self.record.credential) {
            Ok(c) => c,
            Err(e) => {
                log.error(&format!("Can't decode token, get a new one: {}", e));
                return Err(TaskError::Skipped(e.to_string()));
            }
        };

        // Local check, before any request goes out.
        if credential.is_expired() {
            log.warn(&format!(
                "Token expired for wallet {}, skipping",
                credential.wallet_address()
            ));
            return Ok(AccountReport {
                index,
                wallet: credential.wallet_address().to_string(),
                ip: None,
                status: AccountStatus::Expired,
            });
        }

        let api = self
            .factory
            .connect(&credential, self.record.proxy.as_ref())
            .await
            .map_err(|e| log.fail("Client setup", e))?;

        run_account(&api, &credential, index, &self.settings).await
    }
}
