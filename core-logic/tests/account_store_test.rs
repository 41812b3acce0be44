use core_logic::{AccountStore, ConfigError, ProxyManager};
use std::io::Write;
use tempfile::NamedTempFile;

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_credentials_skip_blank_and_comment_lines() {
    let file = file_with("tok.a.b\n\n# comment\n  tok.c.d  \n");
    let creds = AccountStore::load_credentials(file.path()).unwrap();
    assert_eq!(creds, vec!["tok.a.b".to_string(), "tok.c.d".to_string()]);
}

#[test]
fn test_missing_credentials_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AccountStore::load_credentials(&dir.path().join("tokens.txt")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_direct_records_have_no_proxy() {
    let records = AccountStore::direct(vec!["a".into(), "b".into()]);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].index, 1);
    assert!(records.iter().all(|r| r.proxy.is_none()));
}

#[test]
fn test_paired_records_follow_line_order() {
    let proxies = file_with("http://u:p@10.0.0.1:8000\n10.0.0.2:8001:user:pw\n");
    let proxies = ProxyManager::load_proxies(proxies.path()).unwrap();

    let records = AccountStore::paired(vec!["a".into(), "b".into()], proxies).unwrap();
    assert_eq!(records[0].credential, "a");
    assert_eq!(
        records[0].proxy.as_ref().unwrap().url,
        "http://10.0.0.1:8000"
    );
    assert_eq!(records[1].proxy.as_ref().unwrap().host(), "10.0.0.2:8001");
}

#[test]
fn test_count_mismatch_is_rejected() {
    let proxies = vec![ProxyManager::parse_line("1.1.1.1:80").unwrap()];
    let err = AccountStore::paired(vec!["a".into(), "b".into()], proxies).unwrap_err();
    match err {
        ConfigError::CountMismatch {
            credentials,
            proxies,
        } => {
            assert_eq!(credentials, 2);
            assert_eq!(proxies, 1);
        }
        other => panic!("Expected CountMismatch, got {:?}", other),
    }
}

#[test]
fn test_invalid_proxy_line_is_reported_with_line_number() {
    let file = file_with("1.1.1.1:80\nbogus\n");
    let err = ProxyManager::load_proxies(file.path()).unwrap_err();
    match err {
        ConfigError::InvalidValue { field, .. } => assert!(field.ends_with(":2")),
        other => panic!("Expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_record_debug_redacts_credential() {
    let records = AccountStore::direct(vec!["secret.token.value".into()]);
    let dbg = format!("{:?}", records[0]);
    assert!(!dbg.contains("secret"));
    assert!(dbg.contains("REDACTED"));
}
