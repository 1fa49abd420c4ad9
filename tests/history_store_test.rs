use serde_json::json;
use synthetix::history::{quoted_title, HistoryKind, HistoryStore};
use tempfile::tempdir;

#[test]
fn test_history_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history");

    let (kept, removed) = {
        let store = HistoryStore::open(&path).unwrap();
        let kept = store
            .record(HistoryKind::Prompt, "From Prompt: \"users\"", json!([{"name": "Ada"}]))
            .unwrap();
        let removed = store
            .record(HistoryKind::Text, "Text: haiku", json!(["An old silent pond"]))
            .unwrap();
        assert!(store.remove(&removed.id).unwrap());
        (kept, removed)
    };

    let store = HistoryStore::open(&path).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&kept.id).unwrap(), Some(kept));
    assert_eq!(store.get(&removed.id).unwrap(), None);
}

#[test]
fn test_clear_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history");

    {
        let store = HistoryStore::open(&path).unwrap();
        store
            .record(HistoryKind::Structured, "Structured: id, city", json!([]))
            .unwrap();
        store.clear().unwrap();
    }

    assert!(HistoryStore::open(&path).unwrap().is_empty());
}

#[test]
fn test_items_serialize_with_type_and_camel_case() {
    let store = HistoryStore::temporary().unwrap();
    let item = store
        .record(HistoryKind::Enhanced, quoted_title("Transformed", "make ages negative"), json!("name,age"))
        .unwrap();

    let wire = serde_json::to_value(&item).unwrap();
    assert_eq!(wire["type"], "enhanced");
    assert_eq!(wire["title"], "Transformed: \"make ages negative\"");
    assert!(wire.get("createdAt").is_some());
}

#[test]
fn test_long_titles_are_cut() {
    let prompt = "a".repeat(60);
    let title = quoted_title("AI Query", &prompt);
    assert_eq!(title, format!("AI Query: \"{}...\"", "a".repeat(40)));
}
