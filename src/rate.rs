//! Counter-to-rate conversion over a persisted value store.
//!
//! The store survives between check invocations and holds one
//! `(timestamp, value)` pair per key. It is passed explicitly into every
//! computation; the library never touches ambient global state. Entries
//! are created on first observation and overwritten on every invocation,
//! retention is the store owner's concern.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Persisted per-key state: the `(timestamp, value)` sample of the
/// previous check invocation.
pub trait ValueStore {
    fn get(&self, key: &str) -> Option<(f64, f64)>;
    fn set(&mut self, key: &str, time: f64, value: f64);
}

/// The reasons a rate can be unavailable for one check cycle. Callers
/// must treat this as a non-error and produce a neutral result for the
/// affected metric.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("counter {0:?} initialized, rate available on next check cycle")]
    Uninitialized(String),
    #[error("no time difference for counter {0:?}")]
    NoTimeDifference(String),
    #[error("counter {0:?} went backwards (reset or overflow)")]
    CounterReset(String),
}

/// Converts a monotonically increasing counter into a per-second rate.
///
/// The current sample is stored unconditionally, so a failed computation
/// still initializes the key for the next cycle. The first call for a
/// key, a non-advancing timestamp and a decreasing counter all yield a
/// [RateError] instead of a bogus (negative) rate.
pub fn get_rate(
    store: &mut dyn ValueStore,
    key: &str,
    time: f64,
    value: f64,
) -> Result<f64, RateError> {
    let last = store.get(key);
    store.set(key, time, value);

    let (last_time, last_value) = match last {
        Some(sample) => sample,
        None => return Err(RateError::Uninitialized(key.to_owned())),
    };
    if time <= last_time {
        return Err(RateError::NoTimeDifference(key.to_owned()));
    }
    let rate = (value - last_value) / (time - last_time);
    if rate < 0.0 {
        return Err(RateError::CounterReset(key.to_owned()));
    }
    Ok(rate)
}

/// Exponentially weighted moving average with a half-life of
/// `backlog_minutes`. The first observation seeds the average with the
/// value itself.
pub fn get_average(
    store: &mut dyn ValueStore,
    key: &str,
    time: f64,
    value: f64,
    backlog_minutes: f64,
) -> f64 {
    match store.get(key) {
        None => {
            store.set(key, time, value);
            value
        }
        Some((last_time, last_average)) => {
            let timedif = (time - last_time).max(0.0);
            let weight = 0.5_f64.powf(timedif / (backlog_minutes * 60.0));
            let average = last_average * weight + value * (1.0 - weight);
            store.set(key, time, average);
            average
        }
    }
}

/// In-memory store, useful for tests and single-invocation tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, (f64, f64)>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<(f64, f64)> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, time: f64, value: f64) {
        self.entries.insert(key.to_owned(), (time, value));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot access value store file: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt value store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A value store persisted as a JSON file, for check binaries that are
/// re-executed on every invocation and have no host-managed store.
///
/// Opening a missing file yields an empty store; [FileStore::persist]
/// must be called after the check ran to write the samples back.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, (f64, f64)>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<FileStore, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(FileStore { path, entries })
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl ValueStore for FileStore {
    fn get(&self, key: &str) -> Option<(f64, f64)> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, time: f64, value: f64) {
        self.entries.insert(key.to_owned(), (time, value));
    }
}

/// Wraps another store and prefixes every key, so entries of different
/// checks and items cannot collide in a shared store.
pub struct ScopedStore<'a> {
    inner: &'a mut dyn ValueStore,
    prefix: String,
}

impl<'a> ScopedStore<'a> {
    pub fn new(inner: &'a mut dyn ValueStore, prefix: impl Into<String>) -> ScopedStore<'a> {
        ScopedStore {
            inner,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}.{}", self.prefix, key)
    }
}

impl ValueStore for ScopedStore<'_> {
    fn get(&self, key: &str) -> Option<(f64, f64)> {
        self.inner.get(&self.full_key(key))
    }

    fn set(&mut self, key: &str, time: f64, value: f64) {
        let key = self.full_key(key);
        self.inner.set(&key, time, value);
    }
}
