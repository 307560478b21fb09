use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TrendConfig;
use crate::error::StoreError;
use crate::models::{MissionDay, Observation, TrendRecord};
use crate::trend;

/// Durable key-value backing for the trend cache.
///
/// `put_if_absent` must be atomic per key: once it reports a write, every
/// later `get` for that key observes the stored bytes, and no later call
/// replaces them.
pub trait CacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Returns `true` when this call stored the value, `false` when the key
    /// already held one.
    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<bool, StoreError>;

    /// Every stored key with the time elapsed since it was written.
    fn list_keys_with_age(&self) -> Result<Vec<(String, Duration)>, StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Clear leftovers of interrupted writes older than `older_than`.
    /// Returns how many were removed.
    fn sweep_staging(&self, _older_than: Duration) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Staging files younger than this may belong to a write in progress.
pub const STAGING_GRACE_MINUTES: i64 = 60;

/// One JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn age_of(now: SystemTime, modified: SystemTime) -> Duration {
        now.duration_since(modified)
            .ok()
            .and_then(|elapsed| Duration::from_std(elapsed).ok())
            .unwrap_or_else(Duration::zero)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(key, err)),
        }
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|err| StoreError::io(key, err))?;

        // Readers must never see a half-written record, so the payload is
        // written aside and linked into place. The link fails if the key exists.
        let staging = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        fs::write(&staging, value).map_err(|err| StoreError::io(key, err))?;
        let linked = fs::hard_link(&staging, &path);
        let _ = fs::remove_file(&staging);

        match linked {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(StoreError::io(key, err)),
        }
    }

    fn list_keys_with_age(&self) -> Result<Vec<(String, Duration)>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(self.dir.display().to_string(), err)),
        };

        let now = SystemTime::now();
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(self.dir.display().to_string(), err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if key.starts_with('.') {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .map_err(|err| StoreError::io(key, err))?;
            keys.push((key.to_string(), Self::age_of(now, modified)));
        }
        Ok(keys)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io(key, err)),
        }
    }

    fn sweep_staging(&self, older_than: Duration) -> Result<usize, StoreError> {
        let dir_key = self.dir.display().to_string();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(StoreError::io(dir_key, err)),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(dir_key.as_str(), err))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !(name.starts_with('.') && name.ends_with(".tmp")) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .map_err(|err| StoreError::io(name, err))?;
            if Self::age_of(now, modified) <= older_than {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::io(name, err)),
            }
        }
        Ok(removed)
    }
}

/// Process-local store; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or overwrite) with an explicit storage timestamp.
    pub fn insert_stored_at(&self, key: &str, value: &[u8], stored_at: DateTime<Utc>) {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_vec(), stored_at));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().get(key).map(|(bytes, _)| bytes.clone()))
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_vec(), Utc::now()));
        Ok(true)
    }

    fn list_keys_with_age(&self) -> Result<Vec<(String, Duration)>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .iter()
            .map(|(key, (_, stored_at))| (key.clone(), now - *stored_at))
            .collect())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Write-once-per-mission-day trend cache.
///
/// The first successful computation for a day is frozen: later calls for the
/// same day return the stored record even if the health log has changed since.
/// Store failures never surface to callers; reads degrade to a recompute and
/// writes to a no-op.
#[derive(Debug)]
pub struct TrendCache<S> {
    store: S,
    config: TrendConfig,
}

impl<S: CacheStore> TrendCache<S> {
    pub fn new(store: S, config: TrendConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lookup(&self, day: MissionDay) -> Option<TrendRecord> {
        match self.load(day) {
            Stored::Record(record) => Some(record),
            Stored::Missing | Stored::Unreadable => None,
        }
    }

    fn load(&self, day: MissionDay) -> Stored {
        let key = day.key();
        let bytes = match self.store.get(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Stored::Missing,
            Err(err) => {
                warn!(key = %key, error = %err, "trend cache read failed, treating as miss");
                return Stored::Missing;
            }
        };

        match serde_json::from_slice::<TrendRecord>(&bytes) {
            Ok(record) => Stored::Record(record),
            Err(err) => {
                warn!(key = %key, error = %err, "stored trend record is unreadable, treating as miss");
                Stored::Unreadable
            }
        }
    }

    pub fn get_or_compute<F>(&self, day: MissionDay, provider: F) -> Option<TrendRecord>
    where
        F: FnOnce() -> Vec<Observation>,
    {
        match self.load(day) {
            Stored::Record(record) => {
                debug!(mission_day = %day, trend_weight = record.trend_weight, "trend cache hit");
                return Some(record);
            }
            // A corrupt entry would block every future write for this day.
            Stored::Unreadable => {
                if let Err(err) = self.store.remove(&day.key()) {
                    warn!(mission_day = %day, error = %err, "failed to discard unreadable trend record");
                }
            }
            Stored::Missing => {}
        }

        debug!(mission_day = %day, "trend cache miss");
        let observations = provider();
        let Some(record) = self.compute(day, &observations) else {
            debug!(mission_day = %day, "not enough weight data to compute a trend");
            return None;
        };

        Some(self.persist(record))
    }

    /// Compute a fresh record without touching the store.
    pub fn compute(&self, day: MissionDay, observations: &[Observation]) -> Option<TrendRecord> {
        let series = trend::reduce(observations, day, self.config.lookback_days);
        let trend_weight = trend::ewma(&trend::series_weights(&series), self.config.alpha)?;

        Some(TrendRecord {
            mission_day: day,
            trend_weight,
            alpha: self.config.alpha,
            lookback_days: self.config.lookback_days,
            sample_count: series.len(),
            window_start: trend::window_start(day, self.config.lookback_days),
            window_end: day.date(),
            computed_at: Utc::now(),
        })
    }

    fn persist(&self, record: TrendRecord) -> TrendRecord {
        let key = record.mission_day.key();
        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to encode trend record, not caching");
                return record;
            }
        };

        match self.store.put_if_absent(&key, &payload) {
            Ok(true) => {
                info!(
                    mission_day = %record.mission_day,
                    trend_weight = record.trend_weight,
                    samples = record.sample_count,
                    "froze trend weight for mission day"
                );
                self.prune();
                record
            }
            Ok(false) => {
                debug!(key = %key, "another writer stored this day first");
                self.lookup(record.mission_day).unwrap_or(record)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "trend cache write failed, serving uncached value");
                record
            }
        }
    }

    /// Drop records stored longer ago than the retention window. Returns how
    /// many were removed.
    pub fn prune(&self) -> usize {
        let retention = Duration::days(self.config.retention_days);
        let keys = match self.store.list_keys_with_age() {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "could not list trend cache keys for pruning");
                return 0;
            }
        };

        let mut removed = 0;
        for (key, age) in keys {
            if age <= retention {
                continue;
            }
            match self.store.remove(&key) {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "failed to prune trend record"),
            }
        }

        if removed > 0 {
            info!(removed, "pruned expired trend records");
        }

        match self
            .store
            .sweep_staging(Duration::minutes(STAGING_GRACE_MINUTES))
        {
            Ok(0) => {}
            Ok(swept) => info!(swept, "removed leftover staging files"),
            Err(err) => warn!(error = %err, "could not sweep staging files"),
        }
        removed
    }
}

enum Stored {
    Record(TrendRecord),
    Missing,
    Unreadable,
}
