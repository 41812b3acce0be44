use core_logic::{AccountOutcome, PassSummary};
use std::time::Duration;
use xink_project::account::{AccountReport, AccountStatus};
use xink_project::ledger::{append_expired, expired_wallets};

fn report(index: usize, wallet: &str, status: AccountStatus) -> (usize, AccountOutcome<AccountReport>) {
    (
        index,
        AccountOutcome::Completed(AccountReport {
            index,
            wallet: wallet.to_string(),
            ip: None,
            status,
        }),
    )
}

#[test]
fn test_expired_wallets_are_appended_once_even_after_fatal_stop() {
    let summary = PassSummary {
        outcomes: vec![
            report(2, "0xccc", AccountStatus::Expired),
            report(
                1,
                "0xbbb",
                AccountStatus::Processed {
                    checked_in: true,
                    spins: 0,
                    spins_available: 0,
                },
            ),
            report(0, "0xaaa", AccountStatus::Expired),
            (3, AccountOutcome::Failed("status".into())),
        ],
        elapsed: Duration::from_secs(1),
        interrupted: true,
        fatal: Some((4, "HTTP 400".into())),
    };

    let wallets = expired_wallets(&summary);
    assert_eq!(wallets, vec!["0xaaa", "0xccc"]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expired_wallets.txt");

    assert_eq!(append_expired(&path, &wallets).unwrap(), 2);
    assert_eq!(append_expired(&path, &wallets).unwrap(), 0);
    assert_eq!(append_expired(&path, &["0xddd", "0xaaa"]).unwrap(), 1);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "0xaaa\n0xccc\n0xddd\n");
}
