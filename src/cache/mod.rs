//! Analysis cache module.
//!
//! Keeps previously resolved ownership records in insertion order and
//! persists them through a [`RecordStore`], at most once per persist delay.

mod store;

pub use store::{FnStore, JsonFileStore, MemoryStore, NilStore, RecordStore};

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use crate::error::{BlacklistError, Result, StoreErrorKind};
use crate::types::AnalysisRecord;

#[derive(Default)]
struct CacheState {
    records: Vec<Arc<AnalysisRecord>>,
    loaded: bool,
    last_persist: Option<Instant>,
    last_query: Option<Instant>,
}

/// Append-only cache of analysis records.
///
/// All state sits behind one mutex. [`AnalysisCache::lock`] hands out a
/// [`CacheGuard`] so a whole lookup → query → insert → persist sequence can
/// run under a single acquisition.
pub struct AnalysisCache {
    state: Mutex<CacheState>,
    store: Arc<dyn RecordStore>,
    persist_delay: Duration,
}

impl AnalysisCache {
    /// Create an unloaded cache. Records are loaded on first use.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            store,
            persist_delay: Duration::ZERO,
        }
    }

    /// Set the minimum interval between two saves
    pub fn with_persist_delay(mut self, delay: Duration) -> Self {
        self.persist_delay = delay;
        self
    }

    pub fn persist_delay(&self) -> Duration {
        self.persist_delay
    }

    /// Acquire the cache lock
    pub fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            state: self.state.lock(),
            cache: self,
        }
    }

    /// Load records from the store unless already loaded
    pub fn ensure_loaded(&self) -> Result<()> {
        self.lock().ensure_loaded()
    }

    /// Load records from the store, replacing the in-memory sequence
    pub fn reload(&self) -> Result<()> {
        self.lock().reload()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    /// First record whose ranges contain the address
    pub fn lookup(&self, address: &str) -> Result<Option<Arc<AnalysisRecord>>> {
        let mut guard = self.lock();
        guard.ensure_loaded()?;
        guard.lookup(address)
    }

    /// Append a record
    pub fn insert(&self, record: AnalysisRecord) -> Arc<AnalysisRecord> {
        self.lock().insert(record)
    }

    /// Save if the persist delay has elapsed. Returns whether a save happened.
    pub fn persist(&self) -> Result<bool> {
        self.lock().persist()
    }

    /// Snapshot of all records
    pub fn records(&self) -> Vec<Arc<AnalysisRecord>> {
        self.state.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Time of the last successful save
    pub fn last_persist(&self) -> Option<Instant> {
        self.state.lock().last_persist
    }
}

/// A save is due once the delay has been exceeded. Zero disables the debounce.
fn persist_due(elapsed: Duration, delay: Duration) -> bool {
    delay.is_zero() || elapsed > delay
}

/// Exclusive access to the cache state
pub struct CacheGuard<'a> {
    state: MutexGuard<'a, CacheState>,
    cache: &'a AnalysisCache,
}

impl CacheGuard<'_> {
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.state.loaded {
            return Ok(());
        }
        self.reload()
    }

    pub fn reload(&mut self) -> Result<()> {
        let loaded = self.cache.store.load()?;
        let count = loaded.len();

        // Cached records must always derive their ranges
        for (i, record) in loaded.iter().enumerate() {
            record.ranges().map_err(|e| BlacklistError::StoreError {
                kind: StoreErrorKind::InvalidData,
                message: format!("record {}: {}", i, e),
            })?;
        }

        let mut records: Vec<Arc<AnalysisRecord>> = loaded.into_iter().map(Arc::new).collect();
        if !self.state.loaded {
            // Keep anything inserted before the first load
            records.append(&mut self.state.records);
        }

        self.state.records = records;
        self.state.loaded = true;
        tracing::debug!(loaded = count, total = self.state.records.len(), "loaded analysis cache");
        Ok(())
    }

    pub fn lookup(&self, address: &str) -> Result<Option<Arc<AnalysisRecord>>> {
        for record in &self.state.records {
            if record.matches(address)? {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    pub fn insert(&mut self, record: AnalysisRecord) -> Arc<AnalysisRecord> {
        let record = Arc::new(record);
        self.state.records.push(record.clone());
        record
    }

    pub fn persist(&mut self) -> Result<bool> {
        if let Some(last) = self.state.last_persist {
            if !persist_due(last.elapsed(), self.cache.persist_delay) {
                tracing::debug!("persist skipped, delay not elapsed");
                return Ok(false);
            }
        }

        self.cache.store.save(&self.state.records)?;
        self.state.last_persist = Some(Instant::now());
        tracing::debug!(records = self.state.records.len(), "persisted analysis cache");
        Ok(true)
    }

    /// Sleep until `interval` has passed since the last external query.
    pub fn throttle(&self, interval: Duration) {
        if let Some(last) = self.state.last_query {
            let elapsed = last.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "throttling whois query");
                thread::sleep(wait);
            }
        }
    }

    /// Record that an external query just finished
    pub fn mark_query(&mut self) {
        self.state.last_query = Some(Instant::now());
    }

    pub fn records(&self) -> &[Arc<AnalysisRecord>] {
        &self.state.records
    }
}
