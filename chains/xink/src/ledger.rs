use anyhow::{Context, Result};
use core_logic::PassSummary;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::account::{AccountReport, AccountStatus};

/// Wallets whose credential was found expired during the pass.
pub fn expired_wallets(summary: &PassSummary<AccountReport>) -> Vec<&str> {
    let mut wallets: Vec<(usize, &str)> = summary
        .reports()
        .filter(|(_, report)| report.status == AccountStatus::Expired)
        .map(|(index, report)| (index, report.wallet.as_str()))
        .collect();
    wallets.sort_by_key(|(index, _)| *index);
    wallets.into_iter().map(|(_, wallet)| wallet).collect()
}

/// Appends wallets not yet listed in `path`, one per line. Returns how many
/// lines were added.
pub fn append_expired(path: &Path, wallets: &[&str]) -> Result<usize> {
    let existing: HashSet<String> = match std::fs::read_to_string(path) {
        Ok(contents) => contents.lines().map(|l| l.trim().to_string()).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let mut seen = HashSet::new();
    let fresh: Vec<&str> = wallets
        .iter()
        .copied()
        .filter(|w| !existing.contains(*w) && seen.insert(*w))
        .collect();
    if fresh.is_empty() {
        return Ok(0);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for wallet in &fresh {
        writeln!(file, "{}", wallet)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(fresh.len())
}
