use termgpt_context::{RatioCounter, TiktokenCounter, TokenCounter};
use termgpt_history::HistoryStore;
use termgpt_types::{HistoryEntry, HistoryError, Role};

fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
    HistoryStore::new(dir.path().join("history.json"))
}

// --- Round trip ---

#[tokio::test]
async fn append_then_reload_returns_entry_last() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let counter = TiktokenCounter::for_model("gpt-4").unwrap();

    store
        .append(HistoryEntry::user("first"), &counter)
        .await
        .unwrap();
    let stored = store
        .append(HistoryEntry::assistant("hello world"), &counter)
        .await
        .unwrap();

    let entries = store.load().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.last(), Some(&stored));
    assert_eq!(stored.role, Role::Assistant);
    assert_eq!(stored.token_count, counter.count("hello world"));
}

#[tokio::test]
async fn file_is_a_single_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let counter = RatioCounter::new();
    for i in 0..3 {
        store
            .append(HistoryEntry::user(format!("message {i}")), &counter)
            .await
            .unwrap();
    }

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let array = value.as_array().expect("history should be a JSON array");
    assert_eq!(array.len(), 3);
    assert_eq!(array[2]["content"], "message 2");
    assert!(array[2]["tokenCount"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn reads_hand_edited_file_without_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(
        store.path(),
        r#"[{"role": "user", "content": "typed by hand"}]"#,
    )
    .unwrap();

    let entries = store.load().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].token_count, 0);
}

// --- Clear ---

#[tokio::test]
async fn clear_removes_file_and_load_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .append(HistoryEntry::user("to be forgotten"), &RatioCounter::new())
        .await
        .unwrap();

    store.clear().await.unwrap();
    assert!(!store.path().exists());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let err = store.clear().await.unwrap_err();
    assert!(matches!(err, HistoryError::NotFound(path) if path == store.path()));
}
