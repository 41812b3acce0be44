//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod account_store;
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;

// Selective exports - only public utilities
pub use account_store::AccountStore;
pub use logger::setup_logger;
pub use proxy_manager::ProxyManager;
pub use runner::{AccountOutcome, PassSummary, RunnerConfig, WorkerRunner};
