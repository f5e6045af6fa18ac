//! Persistent key/value store holding the currently selected channel.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use shared::domain::ChannelId;
use tracing::warn;

use crate::error::{BackendError, BackendResult};

pub const CURRENT_CHANNEL_ID_KEY: &str = "currentChannelId";
pub const CURRENT_CHANNEL_SLUG_KEY: &str = "currentChannelSlug";

pub trait SelectionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> BackendResult<()>;
    fn remove(&self, key: &str) -> BackendResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub channel_id: ChannelId,
    pub slug: Option<String>,
}

impl Selection {
    pub fn load(store: &dyn SelectionStore) -> Option<Self> {
        let raw_id = store.get(CURRENT_CHANNEL_ID_KEY)?;
        let Ok(id) = raw_id.trim().parse::<i64>() else {
            warn!(value = %raw_id, "selection: ignoring unparsable channel id");
            return None;
        };
        Some(Self {
            channel_id: ChannelId(id),
            slug: store.get(CURRENT_CHANNEL_SLUG_KEY),
        })
    }

    pub fn save(store: &dyn SelectionStore, channel_id: ChannelId, slug: &str) -> BackendResult<()> {
        store.set(CURRENT_CHANNEL_ID_KEY, &channel_id.to_string())?;
        store.set(CURRENT_CHANNEL_SLUG_KEY, slug)
    }

    /// Removes both keys; the second removal is attempted even if the first
    /// fails.
    pub fn clear(store: &dyn SelectionStore) -> BackendResult<()> {
        let id_result = store.remove(CURRENT_CHANNEL_ID_KEY);
        let slug_result = store.remove(CURRENT_CHANNEL_SLUG_KEY);
        id_result.and(slug_result)
    }
}

#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemorySelectionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        self.values
            .lock()
            .map_err(|_| BackendError::Store("selection lock poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> BackendResult<()> {
        self.values
            .lock()
            .map_err(|_| BackendError::Store("selection lock poisoned".into()))?
            .remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileSelectionStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSelectionStore {
    pub fn open(path: impl Into<PathBuf>) -> BackendResult<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), "selection: discarding unreadable store: {err}");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(BackendError::Store(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> BackendResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                BackendError::Store(format!(
                    "failed to create directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw).map_err(|err| {
            BackendError::Store(format!("failed to write {}: {err}", self.path.display()))
        })
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> BackendResult<()> {
        let mut guard = self
            .values
            .lock()
            .map_err(|_| BackendError::Store("selection lock poisoned".into()))?;
        apply(&mut guard);
        self.persist(&guard)
    }
}

impl SelectionStore for FileSelectionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> BackendResult<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn selection_round_trips_through_store() {
        let store = MemorySelectionStore::new();
        assert_eq!(Selection::load(&store), None);

        Selection::save(&store, ChannelId(3), "general").expect("save");
        assert_eq!(
            Selection::load(&store),
            Some(Selection {
                channel_id: ChannelId(3),
                slug: Some("general".into())
            })
        );

        Selection::clear(&store).expect("clear");
        assert_eq!(store.get(CURRENT_CHANNEL_ID_KEY), None);
        assert_eq!(store.get(CURRENT_CHANNEL_SLUG_KEY), None);
    }

    #[test]
    fn unparsable_id_reads_as_no_selection() {
        let store = MemorySelectionStore::new();
        store.set(CURRENT_CHANNEL_ID_KEY, "abc").expect("set");
        assert_eq!(Selection::load(&store), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let temp_root = env::temp_dir().join(format!("chat_term_selection_test_{suffix}"));
        let path = temp_root.join("nested").join("selection.json");

        {
            let store = FileSelectionStore::open(&path).expect("open");
            Selection::save(&store, ChannelId(9), "random").expect("save");
        }
        let reopened = FileSelectionStore::open(&path).expect("reopen");
        assert_eq!(reopened.get(CURRENT_CHANNEL_SLUG_KEY).as_deref(), Some("random"));

        Selection::clear(&reopened).expect("clear");
        let cleared = FileSelectionStore::open(&path).expect("reopen");
        assert_eq!(Selection::load(&cleared), None);

        fs::remove_dir_all(temp_root).expect("cleanup");
    }
}
