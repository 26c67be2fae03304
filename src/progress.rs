//! Solved-set tracking behind an injected key-value store.
//!
//! Layout: one key per class code (`<class_code>_solved`) holding a JSON
//! list of solved challenge ids. A single flat list, so there is no schema
//! versioning or migration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{error, info, instrument};

/// Minimal string key-value store so the tracker is testable without real
/// storage. Implementations must tolerate concurrent calls.
pub trait KvStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: String) -> Result<(), String>;
  fn delete(&self, key: &str) -> Result<(), String>;
}

/// Ephemeral in-memory store; used in tests and when no storage path is
/// configured.
#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStore for MemoryStore {
  fn get(&self, key: &str) -> Option<String> {
    self.inner.lock().ok()?.get(key).cloned()
  }

  fn set(&self, key: &str, value: String) -> Result<(), String> {
    let mut map = self.inner.lock().map_err(|_| "store lock poisoned".to_string())?;
    map.insert(key.to_string(), value);
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), String> {
    let mut map = self.inner.lock().map_err(|_| "store lock poisoned".to_string())?;
    map.remove(key);
    Ok(())
  }
}

/// File-backed store: a single JSON object on disk, loaded eagerly at open
/// and written through on every mutation. Survives restarts, which is all
/// the persistence this service needs.
pub struct JsonFileStore {
  path: PathBuf,
  cache: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
  /// Open (or create) the store at `path`. A missing file is an empty store;
  /// a malformed file is an error.
  #[instrument(level = "info", fields(path = %path.display()))]
  pub fn open(path: PathBuf) -> Result<Self, String> {
    let cache = match std::fs::read_to_string(&path) {
      Ok(text) => serde_json::from_str::<HashMap<String, String>>(&text)
        .map_err(|e| format!("malformed progress file {}: {}", path.display(), e))?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
      Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
    };
    info!(target: "flagdeck_backend", path = %path.display(), entries = cache.len(), "Progress store opened");
    Ok(Self { path, cache: Mutex::new(cache) })
  }

  fn flush(&self, map: &HashMap<String, String>) -> Result<(), String> {
    let text = serde_json::to_string_pretty(map)
      .map_err(|e| format!("failed to encode progress store: {}", e))?;
    std::fs::write(&self.path, text)
      .map_err(|e| format!("failed to write {}: {}", self.path.display(), e))
  }
}

impl KvStore for JsonFileStore {
  fn get(&self, key: &str) -> Option<String> {
    self.cache.lock().ok()?.get(key).cloned()
  }

  fn set(&self, key: &str, value: String) -> Result<(), String> {
    let mut map = self.cache.lock().map_err(|_| "store lock poisoned".to_string())?;
    map.insert(key.to_string(), value);
    self.flush(&map)
  }

  fn delete(&self, key: &str) -> Result<(), String> {
    let mut map = self.cache.lock().map_err(|_| "store lock poisoned".to_string())?;
    map.remove(key);
    self.flush(&map)
  }
}

/// Records which challenge ids each class has solved. Entries are added one
/// at a time and only removed by the bulk clear on logout.
#[derive(Clone)]
pub struct ProgressTracker {
  store: Arc<dyn KvStore>,
}

impl ProgressTracker {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self { store }
  }

  fn key(class_code: &str) -> String {
    format!("{}_solved", class_code)
  }

  /// Solved ids for a class, in insertion order.
  pub fn solved_ids(&self, class_code: &str) -> Vec<u32> {
    let Some(raw) = self.store.get(&Self::key(class_code)) else {
      return Vec::new();
    };
    match serde_json::from_str::<Vec<u32>>(&raw) {
      Ok(ids) => ids,
      Err(e) => {
        error!(target: "flagdeck_backend", %class_code, error = %e, "Malformed solved list; treating as empty");
        Vec::new()
      }
    }
  }

  pub fn is_solved(&self, class_code: &str, challenge_id: u32) -> bool {
    self.solved_ids(class_code).contains(&challenge_id)
  }

  /// Idempotent insert into the class's solved set.
  #[instrument(level = "debug", skip(self))]
  pub fn mark_solved(&self, class_code: &str, challenge_id: u32) -> Result<(), String> {
    let mut ids = self.solved_ids(class_code);
    if ids.contains(&challenge_id) {
      return Ok(());
    }
    ids.push(challenge_id);
    let raw = serde_json::to_string(&ids).map_err(|e| format!("failed to encode solved list: {}", e))?;
    self.store.set(&Self::key(class_code), raw)
  }

  /// Empty the solved set for this class only (logout path).
  #[instrument(level = "info", skip(self))]
  pub fn clear_all(&self, class_code: &str) -> Result<(), String> {
    self.store.delete(&Self::key(class_code))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tracker() -> ProgressTracker {
    ProgressTracker::new(Arc::new(MemoryStore::new()))
  }

  #[test]
  fn mark_solved_is_idempotent() {
    let t = tracker();
    t.mark_solved("CMN322", 5).expect("first insert");
    t.mark_solved("CMN322", 5).expect("second insert");
    assert_eq!(t.solved_ids("CMN322"), vec![5]);
    assert!(t.is_solved("CMN322", 5));
    assert!(!t.is_solved("CMN322", 6));
  }

  #[test]
  fn clear_all_is_scoped_to_one_class() {
    let t = tracker();
    t.mark_solved("CMN322", 1).unwrap();
    t.mark_solved("CMN322", 2).unwrap();
    t.mark_solved("NET201", 1).unwrap();

    t.clear_all("CMN322").unwrap();
    assert!(t.solved_ids("CMN322").is_empty());
    assert_eq!(t.solved_ids("NET201"), vec![1]);
  }

  #[test]
  fn file_store_round_trips_across_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");

    let t = ProgressTracker::new(Arc::new(JsonFileStore::open(path.clone()).expect("open")));
    t.mark_solved("CMN322", 9).unwrap();
    t.mark_solved("CMN322", 12).unwrap();

    let reopened = ProgressTracker::new(Arc::new(JsonFileStore::open(path).expect("reopen")));
    assert_eq!(reopened.solved_ids("CMN322"), vec![9, 12]);
  }

  #[test]
  fn malformed_solved_list_reads_as_empty() {
    let store = Arc::new(MemoryStore::new());
    store.set("CMN322_solved", "not json".into()).unwrap();
    let t = ProgressTracker::new(store);
    assert!(t.solved_ids("CMN322").is_empty());
  }
}
