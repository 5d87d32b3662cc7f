use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Map as JsonMap;

pub use serde_json::Value;

/// Reserved key installed by [`GlobalStore::init`].
pub const CONFIG_KEY: &str = "__config";

/// Key/value store holding arbitrary values keyed by name.
///
/// A fresh store is empty; [`GlobalStore::init`] resets it to the reserved
/// config entry alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalStore {
    entries: BTreeMap<String, Value>,
}

impl GlobalStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Drop every entry and install `__config` as an empty object.
    pub fn init(&mut self) {
        self.entries.clear();
        self.entries
            .insert(CONFIG_KEY.to_string(), Value::Object(JsonMap::new()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or overwrite `key`, returning the previous value if present.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Delete `key`. Absent keys are ignored.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// The reserved config object, when the store has been initialised.
    pub fn config(&self) -> Option<&JsonMap<String, Value>> {
        self.entries.get(CONFIG_KEY).and_then(Value::as_object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> GlobalStoreSnapshot {
        GlobalStoreSnapshot {
            entries: self.entries.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: GlobalStoreSnapshot) {
        self.entries = snapshot.entries;
    }
}

/// Immutable copy of a store's entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalStoreSnapshot {
    entries: BTreeMap<String, Value>,
}

impl GlobalStoreSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_vec(self) -> Vec<(String, Value)> {
        self.entries.into_iter().collect()
    }
}

/// Store handle shared between threads.
pub type SharedStore = Arc<RwLock<GlobalStore>>;

/// Create a shared store that has already been through `init`.
pub fn shared() -> SharedStore {
    let mut store = GlobalStore::new();
    store.init();
    Arc::new(RwLock::new(store))
}

/// Reset a shared store to its initial state.
pub fn reset(store: &SharedStore) -> Result<()> {
    let mut guard = store
        .write()
        .map_err(|_| anyhow!("global store poisoned"))?;
    guard.init();
    Ok(())
}

/// Retrieve the current value for a key, if any.
pub fn read(store: &SharedStore, key: &str) -> Result<Option<Value>> {
    let guard = store.read().map_err(|_| anyhow!("global store poisoned"))?;
    Ok(guard.get(key).cloned())
}

/// Insert or update a value, returning the previous value if present.
pub fn write(store: &SharedStore, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
    let mut guard = store
        .write()
        .map_err(|_| anyhow!("global store poisoned"))?;
    Ok(guard.set(key, value))
}

/// Delete a key, returning the removed value if it was present.
pub fn delete(store: &SharedStore, key: &str) -> Result<Option<Value>> {
    let mut guard = store
        .write()
        .map_err(|_| anyhow!("global store poisoned"))?;
    Ok(guard.remove(key))
}

pub fn snapshot(store: &SharedStore) -> Result<GlobalStoreSnapshot> {
    let guard = store.read().map_err(|_| anyhow!("global store poisoned"))?;
    Ok(guard.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn init_installs_empty_config() {
        let mut store = GlobalStore::new();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.get(CONFIG_KEY), None);

        store.init();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(CONFIG_KEY), Some(&json!({})));
        assert!(store.config().is_some_and(|config| config.is_empty()));
    }

    #[test]
    fn set_get_remove() {
        let mut store = GlobalStore::new();
        store.init();
        assert_eq!(store.set("a", json!(1)), None);
        assert_eq!(store.get("a"), Some(&json!(1)));
        assert_eq!(store.set("a", json!("two")), Some(json!(1)));
        assert_eq!(store.remove("a"), Some(json!("two")));
        assert_eq!(store.get("a"), None);
        assert_eq!(store.remove("a"), None);
        assert_eq!(store.remove("never"), None);
    }

    #[test]
    fn init_discards_previous_entries() {
        let mut store = GlobalStore::new();
        store.init();
        store.set("a", json!([1, 2, 3]));
        store.set(CONFIG_KEY, json!({ "theme": "dark" }));

        store.init();
        let first = store.snapshot();
        store.init();
        assert_eq!(store.snapshot(), first);
        assert_eq!(store.get("a"), None);
        assert_eq!(first.into_vec(), vec![(CONFIG_KEY.to_string(), json!({}))]);
    }

    #[test]
    fn snapshot_restore_and_json() -> Result<()> {
        let mut store = GlobalStore::new();
        store.init();
        store.set("user", json!({ "name": "ada", "id": 7 }));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);

        let encoded = serde_json::to_string(&snapshot)?;
        assert_eq!(encoded, r#"{"__config":{},"user":{"id":7,"name":"ada"}}"#);
        let decoded: GlobalStoreSnapshot = serde_json::from_str(&encoded)?;
        assert_eq!(decoded, snapshot);

        store.init();
        store.restore(decoded);
        assert_eq!(store.get("user"), Some(&json!({ "name": "ada", "id": 7 })));
        Ok(())
    }

    #[test]
    fn shared_store_helpers() -> Result<()> {
        let store = shared();
        assert_eq!(read(&store, CONFIG_KEY)?, Some(json!({})));
        assert_eq!(write(&store, "hits", json!(1))?, None);
        assert_eq!(write(&store, "hits", json!(2))?, Some(json!(1)));
        assert_eq!(snapshot(&store)?.len(), 2);
        assert_eq!(delete(&store, "hits")?, Some(json!(2)));
        assert_eq!(read(&store, "hits")?, None);

        write(&store, "temp", json!(null))?;
        reset(&store)?;
        assert_eq!(snapshot(&store)?.len(), 1);
        Ok(())
    }
}
