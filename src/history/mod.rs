//! Persistent history of generated artifacts

pub mod routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::{log_history_debug, log_history_warn};

const HISTORY_TREE: &str = "history";
const TITLE_EXCERPT_CHARS: usize = 40;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// What kind of generation produced an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Prompt,
    Structured,
    Text,
    Enhanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub title: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl HistoryItem {
    pub fn new(kind: HistoryKind, title: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            data,
            created_at: Utc::now(),
        }
    }
}

/// `prefix: "excerpt"` with the excerpt cut to 40 characters.
pub fn quoted_title(prefix: &str, text: &str) -> String {
    let excerpt: String = text.chars().take(TITLE_EXCERPT_CHARS).collect();
    let ellipsis = if text.chars().count() > TITLE_EXCERPT_CHARS {
        "..."
    } else {
        ""
    };
    format!("{}: \"{}{}\"", prefix, excerpt, ellipsis)
}

/// sled-backed history keyed by item id
#[derive(Clone)]
pub struct HistoryStore {
    tree: sled::Tree,
}

impl HistoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> HistoryResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    /// In-memory store that is dropped with the process
    pub fn temporary() -> HistoryResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &sled::Db) -> HistoryResult<Self> {
        Ok(Self {
            tree: db.open_tree(HISTORY_TREE)?,
        })
    }

    pub fn add(&self, item: &HistoryItem) -> HistoryResult<()> {
        let bytes = serde_json::to_vec(item)?;
        self.tree.insert(item.id.as_bytes(), bytes)?;
        self.tree.flush()?;
        log_history_debug!("Stored history item {} ({:?})", item.id, item.kind);
        Ok(())
    }

    /// Records a new item and returns it.
    pub fn record(&self, kind: HistoryKind, title: impl Into<String>, data: Value) -> HistoryResult<HistoryItem> {
        let item = HistoryItem::new(kind, title, data);
        self.add(&item)?;
        Ok(item)
    }

    /// All readable items, newest first. Entries that fail to decode are skipped.
    pub fn list(&self) -> HistoryResult<Vec<HistoryItem>> {
        let mut items = Vec::new();
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            match serde_json::from_slice::<HistoryItem>(&value) {
                Ok(item) => items.push(item),
                Err(e) => log_history_warn!("Skipping unreadable history entry {:?}: {}", key, e),
            }
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub fn get(&self, id: &Uuid) -> HistoryResult<Option<HistoryItem>> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns whether an item was removed.
    pub fn remove(&self, id: &Uuid) -> HistoryResult<bool> {
        let removed = self.tree.remove(id.as_bytes())?.is_some();
        self.tree.flush()?;
        Ok(removed)
    }

    pub fn clear(&self) -> HistoryResult<()> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_list_is_newest_first() {
        let store = HistoryStore::temporary().unwrap();
        let mut older = HistoryItem::new(HistoryKind::Text, "older", json!("a"));
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = HistoryItem::new(HistoryKind::Prompt, "newer", json!("b"));
        store.add(&older).unwrap();
        store.add(&newer).unwrap();

        let titles: Vec<String> = store.list().unwrap().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[test]
    fn test_corrupt_entries_are_skipped() {
        let store = HistoryStore::temporary().unwrap();
        store.record(HistoryKind::Enhanced, "ok", json!("x")).unwrap();
        store.tree.insert(b"garbage", b"not json".to_vec()).unwrap();

        let items = store.list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_remove_clear() {
        let store = HistoryStore::temporary().unwrap();
        let item = store.record(HistoryKind::Structured, "s", json!([])).unwrap();

        assert_eq!(store.get(&item.id).unwrap(), Some(item.clone()));
        assert!(store.remove(&item.id).unwrap());
        assert!(!store.remove(&item.id).unwrap());
        assert_eq!(store.get(&item.id).unwrap(), None);

        store.record(HistoryKind::Text, "t", json!("t")).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_wire_form() {
        let item = HistoryItem::new(HistoryKind::Prompt, "p", json!([]));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "prompt");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_quoted_title() {
        assert_eq!(quoted_title("AI Query", "How many?"), "AI Query: \"How many?\"");
        let long = "x".repeat(50);
        assert_eq!(
            quoted_title("From Prompt", &long),
            format!("From Prompt: \"{}...\"", "x".repeat(40))
        );
    }
}
