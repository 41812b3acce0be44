use std::collections::HashMap;
use xink_project::fingerprint::{platform_for, FingerprintService, FingerprintStore, USER_AGENTS};

#[test]
fn test_assignment_is_stable_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session_user_agents.json");

    let mut store = FingerprintStore::load(&path).unwrap();
    assert!(store.is_empty());
    let (first, created) = store.get_or_assign("0xabc", &mut rand::thread_rng());
    assert!(created);
    assert!(USER_AGENTS.contains(&first.as_str()));
    store.save().unwrap();

    for _ in 0..5 {
        let mut reloaded = FingerprintStore::load(&path).unwrap();
        assert_eq!(reloaded.get("0xabc"), Some(first.as_str()));
        let (again, created) = reloaded.get_or_assign("0xabc", &mut rand::thread_rng());
        assert!(!created);
        assert_eq!(again, first);
        reloaded.save().unwrap();
    }
}

#[test]
fn test_existing_entries_are_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session_user_agents.json");
    std::fs::write(&path, r#"{"0xold": "CustomAgent/1.0"}"#).unwrap();

    let mut store = FingerprintStore::load(&path).unwrap();
    store.get_or_assign("0xnew", &mut rand::thread_rng());
    store.save().unwrap();

    let saved: HashMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["0xold"], "CustomAgent/1.0");
    assert!(saved.contains_key("0xnew"));
    assert_eq!(platform_for(&saved["0xold"]), "Unknown");
}

#[test]
fn test_corrupt_cache_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session_user_agents.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(FingerprintStore::load(&path).is_err());
}

#[tokio::test]
async fn test_service_serialises_concurrent_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session_user_agents.json");
    let service = FingerprintService::spawn(FingerprintStore::load(&path).unwrap());

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("0x{}", i % 4);
            (key.clone(), service.resolve(&key).await.unwrap())
        }));
    }

    let mut seen: HashMap<String, String> = HashMap::new();
    for handle in handles {
        let (key, profile) = handle.await.unwrap();
        let entry = seen.entry(key).or_insert_with(|| profile.user_agent.clone());
        assert_eq!(*entry, profile.user_agent);
    }

    let saved: HashMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved.len(), 4);
    assert_eq!(saved, seen);
}
