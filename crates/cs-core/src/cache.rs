//! TTL cache for submission payloads, keyed by problem slug.
//!
//! Expiry is enforced twice: `get` deletes an entry it finds expired, and a
//! background sweep removes every expired entry on a fixed interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Shorter sweep intervals, zero included, are raised to this.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    /// Unix millis at insertion.
    timestamp: u64,
    expires_at: Instant,
}

type Entries<T> = Mutex<HashMap<String, CacheEntry<T>>>;

pub struct SubmissionCache<T> {
    entries: Arc<Entries<T>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> SubmissionCache<T> {
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    /// Outside a tokio runtime no sweep runs; `get` still never returns an
    /// expired entry.
    pub fn with_sweep_interval(interval: Duration) -> Self {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let entries: Arc<Entries<T>> = Arc::new(Mutex::new(HashMap::new()));
        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(sweep_loop(Arc::downgrade(&entries), interval))),
            Err(_) => {
                log::warn!("No async runtime; submission cache runs without a sweeper");
                None
            }
        };
        Self {
            entries,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Insert or overwrite with the default TTL.
    pub fn set(&self, key: impl Into<String>, data: T) {
        self.set_with_ttl(key, data, DEFAULT_TTL);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, data: T, ttl: Duration) {
        let entry = CacheEntry {
            data,
            timestamp: crate::unix_millis(),
            expires_at: Instant::now() + ttl,
        };
        lock(&self.entries).insert(key.into(), entry);
    }

    /// Insert only when `key` is missing or expired. Returns whether it
    /// inserted; check and insert happen under one lock.
    pub fn set_if_absent(&self, key: impl Into<String>, data: T, ttl: Duration) -> bool {
        let key = key.into();
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        if entries.get(&key).is_some_and(|entry| now <= entry.expires_at) {
            return false;
        }
        entries.insert(
            key,
            CacheEntry {
                data,
                timestamp: crate::unix_millis(),
                expires_at: now + ttl,
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.get_with_timestamp(key).map(|(data, _)| data)
    }

    /// Data plus the insertion time in unix millis.
    pub fn get_with_timestamp(&self, key: &str) -> Option<(T, u64)> {
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            None => return None,
            Some(entry) if Instant::now() <= entry.expires_at => {
                return Some((entry.data.clone(), entry.timestamp));
            }
            Some(_) => {}
        }
        entries.remove(key);
        None
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        lock(&self.entries).remove(key).map(|entry| entry.data)
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        sweep_entries(&self.entries)
    }

    /// Stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the sweep and drop every entry.
    pub fn destroy(&self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
        lock(&self.entries).clear();
    }
}

impl<T: Clone + Send + 'static> Default for SubmissionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SubmissionCache<T> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
    }
}

async fn sweep_loop<T>(entries: Weak<Entries<T>>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    loop {
        ticker.tick().await;
        let Some(entries) = entries.upgrade() else {
            break;
        };
        let removed = sweep_entries(&entries);
        if removed > 0 {
            log::debug!("Swept {} expired submission(s)", removed);
        }
    }
}

fn sweep_entries<T>(entries: &Entries<T>) -> usize {
    let now = Instant::now();
    let mut entries = lock(entries);
    let before = entries.len();
    entries.retain(|_, entry| now <= entry.expires_at);
    before - entries.len()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
