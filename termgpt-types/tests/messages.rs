use termgpt_types::*;

#[test]
fn history_file_format_roundtrip() {
    let raw = r#"[
        {"role": "user", "content": "What is Rust?", "tokenCount": 4},
        {"role": "assistant", "content": "A systems language.", "tokenCount": 5}
    ]"#;
    let entries: Vec<HistoryEntry> = serde_json::from_str(raw).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[1].token_count, 5);

    let back = serde_json::to_string(&entries).unwrap();
    let again: Vec<HistoryEntry> = serde_json::from_str(&back).unwrap();
    assert_eq!(again, entries);
}

#[test]
fn chat_message_from_history_entry_drops_token_count() {
    let mut entry = HistoryEntry::assistant("done");
    entry.token_count = 1;
    let msg = ChatMessage::from(&entry);
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json, serde_json::json!({"role": "assistant", "content": "done"}));
}

#[test]
fn unknown_role_is_rejected() {
    let result: Result<HistoryEntry, _> =
        serde_json::from_str(r#"{"role": "tool", "content": "x"}"#);
    assert!(result.is_err());
}
