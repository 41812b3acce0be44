use xink_project::account::{AccountJob, AccountReport};
use xink_project::api::client::XinkApiFactory;
use xink_project::api::discovery;
use xink_project::config::XinkConfig;
use xink_project::credential::Credential;
use xink_project::fingerprint::{FingerprintService, FingerprintStore};
use xink_project::ledger;

use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{
    setup_logger, AccountRecord, AccountStore, CoreError, PassSummary, ProxyManager,
    WorkerRunner,
};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/xink/config.toml")]
    config: String,
    /// Pair every credential with the proxy on the same line of the proxy file.
    #[arg(long)]
    proxy: bool,
    /// Run a single pass and exit.
    #[arg(long)]
    once: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();
    let log_guard = setup_logger("xink_project", args.verbose);

    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            exit_code(&e)
        }
    };

    // Flush the file writer before exiting.
    drop(log_guard);
    std::process::exit(code);
}

fn exit_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<CoreError>() {
        Some(CoreError::Fatal { .. }) => 2,
        _ => 1,
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Loading config from: {}", args.config);
    let mut config = XinkConfig::load(&args.config)?;
    if args.proxy {
        config.use_proxy = true;
    }
    config.validate()?;

    let records = load_accounts(&config)?;
    info!(
        "Loaded {} accounts ({})",
        records.len(),
        if config.use_proxy { "proxy" } else { "direct" }
    );

    let base = discovery::resolve_base_url(
        config.discovery_url.as_deref(),
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .await?;

    let store = FingerprintStore::load(&config.fingerprint_file)?;
    info!("Loaded {} saved user agents", store.len());
    let fingerprints = FingerprintService::spawn(store);
    prepare_fingerprints(&records, &fingerprints).await;

    let factory = Arc::new(XinkApiFactory::new(
        base.base_url,
        config.http_settings(),
        fingerprints,
    ));
    let settings = Arc::new(config.run_settings());
    let runner_config = config.runner_config();
    let cancel = WorkerRunner::shutdown_token();
    let expired_path = config.expired_file.clone();

    let make_tasks = || {
        records
            .iter()
            .cloned()
            .map(|record| AccountJob::new(record, factory.clone(), settings.clone()))
            .collect::<Vec<_>>()
    };
    let on_pass = |summary: &PassSummary<AccountReport>| record_expired(&expired_path, summary);

    if args.once {
        let summary = WorkerRunner::run_pass(make_tasks(), &runner_config, &cancel).await;
        on_pass(&summary);
        if let Some(err) = summary.fatal_error() {
            return Err(err.into());
        }
    } else {
        WorkerRunner::run_forever(&runner_config, &cancel, make_tasks, on_pass).await?;
    }

    Ok(())
}

fn load_accounts(config: &XinkConfig) -> Result<Vec<AccountRecord>, CoreError> {
    let credentials = AccountStore::load_credentials(Path::new(&config.tokens_file))?;
    if !config.use_proxy {
        return Ok(AccountStore::direct(credentials));
    }
    let proxies = ProxyManager::load_proxies(Path::new(&config.proxy_file))?;
    Ok(AccountStore::paired(credentials, proxies)?)
}

/// Assigns a user agent to every decodable credential up front so the cache
/// file is complete before the first batch starts.
async fn prepare_fingerprints(records: &[AccountRecord], fingerprints: &FingerprintService) {
    for record in records {
        match Credential::parse(&record.credential) {
            Ok(credential) => {
                if let Err(e) = fingerprints.resolve(credential.wallet_address()).await {
                    warn!("[Account {}] {:#}", record.index + 1, e);
                }
            }
            Err(e) => warn!(
                "[Account {}] Can't create user agent, try getting a new token: {}",
                record.index + 1,
                e
            ),
        }
    }
}

fn record_expired(path: &str, summary: &PassSummary<AccountReport>) {
    let wallets = ledger::expired_wallets(summary);
    if wallets.is_empty() {
        return;
    }
    match ledger::append_expired(Path::new(path), &wallets)
        .with_context(|| format!("Failed to update {}", path))
    {
        Ok(added) => warn!(
            "{} expired credentials this pass ({} new in {})",
            wallets.len(),
            added,
            path
        ),
        Err(e) => error!("{:#}", e),
    }
}
