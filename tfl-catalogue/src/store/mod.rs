//! Durable id-keyed entity stores.
//!
//! One generic store covers both the stop-point index and the per-mode
//! line catalogue; the two differ only in entity type and snapshot
//! path. Snapshots are JSON and replaced atomically (written to a
//! sibling temp file, then renamed over the target), so a crash
//! mid-save can never leave a half-written file where the previous
//! snapshot used to be.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Store persistence errors, with the offending path attached.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything with a stable string primary key.
pub trait Entity {
    fn id(&self) -> &str;
}

/// An id-keyed mapping of entities backed by a JSON snapshot file.
///
/// Inserts through [`add_if_absent`](Self::add_if_absent) are
/// first-writer-wins and write through to disk whenever anything
/// actually changed.
pub struct EntityStore<E> {
    path: PathBuf,
    data: HashMap<String, E>,
}

impl<E> EntityStore<E>
where
    E: Entity + Serialize + DeserializeOwned + Clone,
{
    /// Create an empty store backed by `path`. Nothing is read from
    /// disk until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: HashMap::new(),
        }
    }

    /// Load the snapshot if one exists, replacing the in-memory mapping.
    /// Returns whether a snapshot existed.
    pub fn load(&mut self) -> Result<bool, StoreError> {
        if !self.path.is_file() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        self.data = serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), entries = self.data.len(), "loaded snapshot");
        Ok(true)
    }

    /// Load the snapshot, or populate the store from `fetch` and persist
    /// the result if there is none. Returns whether a snapshot existed.
    pub async fn load_or_fetch<F, Fut, Err>(&mut self, fetch: F) -> Result<bool, Err>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashMap<String, E>, Err>>,
        Err: From<StoreError>,
    {
        if self.load()? {
            return Ok(true);
        }

        self.data = fetch().await?;
        self.save()?;
        Ok(false)
    }

    /// Persist the whole mapping, atomically replacing any previous
    /// snapshot.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        let json = serde_json::to_string(&self.data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), entries = self.data.len(), "saved snapshot");
        Ok(())
    }

    /// Get an entity by id.
    pub fn get(&self, id: &str) -> Option<&E> {
        self.data.get(id)
    }

    /// Get several entities by id; missing ids yield `None` in place.
    pub fn get_many<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<Option<&E>> {
        ids.into_iter().map(|id| self.data.get(id)).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Insert the entities whose ids are not already present; existing
    /// entries are left untouched (first writer wins). Persists
    /// immediately if anything was inserted. Returns how many entities
    /// were actually inserted.
    pub fn add_if_absent(&mut self, entities: impl IntoIterator<Item = E>) -> Result<usize, StoreError> {
        let mut inserted = 0;

        for entity in entities {
            if !self.data.contains_key(entity.id()) {
                self.data.insert(entity.id().to_string(), entity);
                inserted += 1;
            }
        }

        if inserted > 0 {
            self.save()?;
        }

        Ok(inserted)
    }

    /// Replace the whole in-memory mapping without persisting.
    pub fn replace(&mut self, data: HashMap<String, E>) {
        self.data = data;
    }

    /// The in-memory mapping.
    pub fn data(&self) -> &HashMap<String, E> {
        &self.data
    }

    /// The snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a human-readable JSON export of the values. Read-only with
    /// respect to store state; the snapshot is untouched.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let values: Vec<&E> = self.data.values().collect();

        let json = serde_json::to_string_pretty(&values).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        std::fs::write(path, json).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tempfile::tempdir;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Thing {
        id: String,
        value: u32,
    }

    impl Entity for Thing {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn thing(id: &str, value: u32) -> Thing {
        Thing {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn load_without_snapshot_reports_missing() {
        let dir = tempdir().unwrap();
        let mut store: EntityStore<Thing> = EntityStore::new(dir.path().join("things.json"));
        assert!(!store.load().unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.json");

        let mut store = EntityStore::new(&path);
        store
            .add_if_absent([thing("a", 1), thing("b", 2)])
            .unwrap();

        let mut reloaded: EntityStore<Thing> = EntityStore::new(&path);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.data(), store.data());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.json");

        let mut store = EntityStore::new(&path);
        store.add_if_absent([thing("a", 1)]).unwrap();

        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("things.json");

        let mut store = EntityStore::new(&path);
        store.add_if_absent([thing("a", 1)]).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn add_if_absent_is_first_writer_wins() {
        let dir = tempdir().unwrap();
        let mut store = EntityStore::new(dir.path().join("things.json"));

        let inserted = store.add_if_absent([thing("490010877H", 1)]).unwrap();
        assert_eq!(inserted, 1);

        // A different payload under the same id is ignored.
        let inserted = store.add_if_absent([thing("490010877H", 99)]).unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("490010877H"), Some(&thing("490010877H", 1)));
    }

    #[test]
    fn add_if_absent_counts_only_new_entities() {
        let dir = tempdir().unwrap();
        let mut store = EntityStore::new(dir.path().join("things.json"));

        store.add_if_absent([thing("a", 1)]).unwrap();
        let inserted = store
            .add_if_absent([thing("a", 5), thing("b", 2), thing("c", 3)])
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn add_if_absent_writes_through_when_dirty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.json");

        let mut store = EntityStore::new(&path);
        store.add_if_absent([thing("a", 1)]).unwrap();

        // Fresh load observes the insert without an explicit save().
        let mut reloaded: EntityStore<Thing> = EntityStore::new(&path);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get("a"), Some(&thing("a", 1)));
    }

    #[test]
    fn get_many_preserves_order_with_gaps() {
        let dir = tempdir().unwrap();
        let mut store = EntityStore::new(dir.path().join("things.json"));
        store
            .add_if_absent([thing("a", 1), thing("c", 3)])
            .unwrap();

        let found = store.get_many(["a", "b", "c"]);
        assert_eq!(found[0], Some(&thing("a", 1)));
        assert_eq!(found[1], None);
        assert_eq!(found[2], Some(&thing("c", 3)));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut store: EntityStore<Thing> = EntityStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn load_or_fetch_uses_hook_when_snapshot_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.json");

        let mut store: EntityStore<Thing> = EntityStore::new(&path);
        let existed = store
            .load_or_fetch(|| async {
                let mut data = HashMap::new();
                data.insert("a".to_string(), thing("a", 1));
                Ok::<_, StoreError>(data)
            })
            .await
            .unwrap();

        assert!(!existed);
        assert_eq!(store.len(), 1);
        // The fetched mapping was persisted.
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn load_or_fetch_skips_hook_when_snapshot_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.json");

        let mut store = EntityStore::new(&path);
        store.add_if_absent([thing("a", 1)]).unwrap();

        let mut called = false;
        let mut reloaded: EntityStore<Thing> = EntityStore::new(&path);
        let existed = reloaded
            .load_or_fetch(|| {
                called = true;
                async { Ok::<_, StoreError>(HashMap::new()) }
            })
            .await
            .unwrap();

        assert!(existed);
        assert!(!called, "fetch hook must not run when a snapshot exists");
        assert_eq!(reloaded.get("a"), Some(&thing("a", 1)));
    }

    #[test]
    fn write_json_exports_values() {
        let dir = tempdir().unwrap();
        let mut store = EntityStore::new(dir.path().join("things.json"));
        store
            .add_if_absent([thing("a", 1), thing("b", 2)])
            .unwrap();

        let export = dir.path().join("things-export.json");
        store.write_json(&export).unwrap();

        let contents = std::fs::read_to_string(&export).unwrap();
        let mut values: Vec<Thing> = serde_json::from_str(&contents).unwrap();
        values.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(values, vec![thing("a", 1), thing("b", 2)]);
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Any mapping survives a save/load cycle unchanged.
            #[test]
            fn snapshot_roundtrip(entries in proptest::collection::hash_map(
                "[a-zA-Z0-9]{1,12}",
                0u32..1000,
                0..20,
            )) {
                let dir = tempdir().unwrap();
                let path = dir.path().join("things.json");

                let mut store = EntityStore::new(&path);
                store.replace(
                    entries
                        .iter()
                        .map(|(id, &value)| (id.clone(), thing(id, value)))
                        .collect(),
                );
                store.save().unwrap();

                let mut reloaded: EntityStore<Thing> = EntityStore::new(&path);
                prop_assert!(reloaded.load().unwrap());
                prop_assert_eq!(reloaded.data(), store.data());
            }

            /// add_if_absent is idempotent: a second insert of the same
            /// entities changes nothing and reports zero insertions.
            #[test]
            fn add_if_absent_idempotent(values in proptest::collection::vec(
                ("[a-z]{1,6}", 0u32..100),
                1..15,
            )) {
                let dir = tempdir().unwrap();
                let mut store = EntityStore::new(dir.path().join("things.json"));

                let entities: Vec<Thing> =
                    values.iter().map(|(id, v)| thing(id, *v)).collect();

                store.add_if_absent(entities.iter().cloned()).unwrap();
                let before: HashMap<String, Thing> = store.data().clone();

                let inserted = store.add_if_absent(entities).unwrap();
                prop_assert_eq!(inserted, 0);
                prop_assert_eq!(store.data(), &before);
            }
        }
    }
}
