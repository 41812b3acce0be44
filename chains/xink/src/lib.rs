//! x.ink rewards bot: credentials, fingerprints, the API client and the
//! per-account task the core runner drives.

pub mod account;
pub mod api;
pub mod config;
pub mod credential;
pub mod fingerprint;
pub mod ledger;
