//! # Core Logic - Shared Utilities for Account Automation
//!
//! This crate provides the target-independent plumbing used by every bot in
//! the workspace: loading account and proxy lists, decoding bearer
//! credentials, retrying requests, and running accounts in batches.
//!
//! ## Modules
//!
//! - [`config`] - Proxy and account record types
//! - [`error`] - Typed error handling with thiserror
//! - [`security`] - JWT payload decoding
//! - [`traits`] - The per-account task trait
//! - [`utils`] - Loaders, logger, retry and the batch runner

pub mod config;
pub mod error;
pub mod security;
pub mod traits;
pub(crate) mod utils;

pub use config::{AccountRecord, ProxyConfig};
pub use error::{ConfigError, CoreError, CredentialError, TaskError};
pub use security::SecurityUtils;
pub use traits::AccountTask;

pub use utils::{
    setup_logger, AccountOutcome, AccountStore, PassSummary, ProxyManager, RunnerConfig,
    WorkerRunner,
};

pub use utils::retry::{with_retry, with_retry_if, RetryConfig};
