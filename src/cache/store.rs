use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BlacklistError, Result, StoreErrorKind};
use crate::types::AnalysisRecord;

/// Load/save hooks for the analysis cache
pub trait RecordStore: Send + Sync {
    /// Load all persisted records
    fn load(&self) -> Result<Vec<AnalysisRecord>>;

    /// Persist the full record sequence
    fn save(&self, records: &[Arc<AnalysisRecord>]) -> Result<()>;
}

/// Store that persists nothing and loads nothing
pub struct NilStore;

impl RecordStore for NilStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        Ok(Vec::new())
    }

    fn save(&self, _records: &[Arc<AnalysisRecord>]) -> Result<()> {
        Ok(())
    }
}

/// In-memory store that counts hook invocations
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AnalysisRecord>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with records returned by the next load
    pub fn with_records(records: Vec<AnalysisRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Records saved most recently
    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.records.lock().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().clone())
    }

    fn save(&self, records: &[Arc<AnalysisRecord>]) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.records.lock() = records.iter().map(|r| (**r).clone()).collect();
        Ok(())
    }
}

type LoadFn = Box<dyn Fn() -> Result<Vec<AnalysisRecord>> + Send + Sync>;
type SaveFn = Box<dyn Fn(&[Arc<AnalysisRecord>]) -> Result<()> + Send + Sync>;

/// Store backed by caller-supplied closures
pub struct FnStore {
    load: LoadFn,
    save: SaveFn,
}

impl FnStore {
    pub fn new<L, S>(load: L, save: S) -> Self
    where
        L: Fn() -> Result<Vec<AnalysisRecord>> + Send + Sync + 'static,
        S: Fn(&[Arc<AnalysisRecord>]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            load: Box::new(load),
            save: Box::new(save),
        }
    }
}

impl RecordStore for FnStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        (self.load)()
    }

    fn save(&self, records: &[Arc<AnalysisRecord>]) -> Result<()> {
        (self.save)(records)
    }
}

/// JSON file store.
///
/// A missing file loads as an empty cache. Saves go to a temporary file
/// that is renamed over the target.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> Result<Vec<AnalysisRecord>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BlacklistError::StoreError {
                    kind: StoreErrorKind::LoadFailed,
                    message: format!("Failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        serde_json::from_slice(&data).map_err(|e| BlacklistError::StoreError {
            kind: StoreErrorKind::InvalidData,
            message: format!("Failed to decode {}: {}", self.path.display(), e),
        })
    }

    fn save(&self, records: &[Arc<AnalysisRecord>]) -> Result<()> {
        let save_failed = |e: std::io::Error| BlacklistError::StoreError {
            kind: StoreErrorKind::SaveFailed,
            message: format!("Failed to write {}: {}", self.path.display(), e),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(save_failed)?;
            }
        }

        let view: Vec<&AnalysisRecord> = records.iter().map(|r| r.as_ref()).collect();
        let json = serde_json::to_vec_pretty(&view)?;

        let tmp_path = self.path.with_extension("tmp");
        let written = write_and_rename(&tmp_path, &self.path, &json);
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written.map_err(save_failed)
    }
}

fn write_and_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path)?;
    file.write_all(data)?;
    file.flush()?;
    drop(file);
    fs::rename(tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let records = vec![Arc::new(
            AnalysisRecord::new()
                .with_cidr("10.0.0.0/8")
                .with_owner_name("Example"),
        )];
        store.save(&records).unwrap();
        assert_eq!(store.save_count(), 1);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].owner_name.as_deref(), Some("Example"));
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn test_fn_store_delegates() {
        let saved = Arc::new(AtomicUsize::new(0));
        let counter = saved.clone();
        let store = FnStore::new(
            || Ok(vec![AnalysisRecord::new().with_cidr("1.0.0.0/8")]),
            move |records| {
                counter.fetch_add(records.len(), Ordering::SeqCst);
                Ok(())
            },
        );

        assert_eq!(store.load().unwrap().len(), 1);
        store
            .save(&[Arc::new(AnalysisRecord::new()), Arc::new(AnalysisRecord::new())])
            .unwrap();
        assert_eq!(saved.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_json_file_store_missing_file_is_empty() {
        let store = JsonFileStore::new("/nonexistent/dir/ip_cache.json");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = std::env::temp_dir().join("ip_blacklist_test_json_store");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("cache.json");
        let store = JsonFileStore::new(&path);

        let records = vec![Arc::new(
            AnalysisRecord::new()
                .with_cidr("203.0.113.0/24")
                .with_range("198.51.100.0", "198.51.100.255")
                .with_country("NL"),
        )];
        store.save(&records).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].matches("198.51.100.42").unwrap());
        assert_eq!(loaded[0].country.as_deref(), Some("NL"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_file_store_failed_save_removes_tmp() {
        let dir = std::env::temp_dir().join("ip_blacklist_test_json_failed_save");
        let _ = fs::remove_dir_all(&dir);
        // A directory at the target path makes the rename fail
        let path = dir.join("cache.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let store = JsonFileStore::new(&path);
        let err = store
            .save(&[Arc::new(AnalysisRecord::new().with_cidr("10.0.0.0/8"))])
            .unwrap_err();
        assert!(matches!(
            err,
            BlacklistError::StoreError {
                kind: StoreErrorKind::SaveFailed,
                ..
            }
        ));
        assert!(!path.with_extension("tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_file_store_invalid_data() {
        let dir = std::env::temp_dir().join("ip_blacklist_test_json_invalid");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("cache.json");
        fs::write(&path, b"not json").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(
            err,
            BlacklistError::StoreError {
                kind: StoreErrorKind::InvalidData,
                ..
            }
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
