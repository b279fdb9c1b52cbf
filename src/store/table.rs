//! Store implementation
//!
//! `Store` owns every piece of shared mutable state: the value and TTL maps,
//! the LRU list, and the memory estimate behind one RwLock, plus the three
//! atomics that are readable without it (dirty counter, debug flag, batch
//! size). Uses `parking_lot::RwLock`, which never poisons on panic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::config::Config;
use crate::persistence::{self, Snapshot};

/// Milliseconds since the Unix epoch (TTL deadlines are stored in this form)
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Result of a TTL query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key absent or already past its deadline
    Missing,
    /// Key present with no deadline
    NoExpiry,
    /// Remaining whole seconds
    Seconds(i64),
}

/// Why INCR/DECR refused to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrError {
    /// The stored value does not parse as a signed 64-bit integer
    NotInteger,
}

/// What a JSON mutation closure decided to do with the stored document
pub enum MutateOutcome<T> {
    /// Store this new serialized value and report `T`
    Replace(String, T),
    /// Leave the value untouched (no dirty op) and report `T`
    Keep(T),
}

/// Result of [`Store::mutate_value`]
pub enum MutateResult<T> {
    /// Key absent or expired
    Missing,
    /// The closure ran; its report
    Done(T),
}

/// One background-manager tick's work
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    /// Keys removed because their deadline passed
    pub expired: usize,
    /// Whether a batched snapshot was written this tick
    pub saved: bool,
}

/// Everything guarded by the single reader-writer lock
#[derive(Default)]
struct StoreInner {
    map: HashMap<String, String>,
    ttl: HashMap<String, i64>,
    lru: super::LruList,
    memory: u64,
}

/// The concurrent in-memory store
pub struct Store {
    inner: RwLock<StoreInner>,

    /// Mutating ops since the last successful snapshot
    dirty_ops: AtomicU64,

    /// Runtime-mutable: reply timing suffix on/off
    debug_mode: AtomicBool,

    /// Runtime-mutable: snapshot batch threshold (0 = write-through)
    batch_size: AtomicU64,

    // Immutable after construction
    caching_enabled: bool,
    max_memory_bytes: u64,
    persistence_enabled: bool,
    database_path: PathBuf,
    worker_threads: usize,
}

impl Store {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            dirty_ops: AtomicU64::new(0),
            debug_mode: AtomicBool::new(config.debug_mode),
            batch_size: AtomicU64::new(config.batch_processing_size),
            caching_enabled: config.caching_enabled,
            max_memory_bytes: config.max_memory_bytes,
            persistence_enabled: config.persistence_enabled,
            database_path: config.database_path.clone(),
            worker_threads: config.effective_workers(),
        }
    }

    // =========================================================================
    // Key-value operations
    // =========================================================================

    /// Insert or overwrite a pair. `ttl_seconds` of `Some` arms a deadline;
    /// `None` clears any existing one.
    pub fn put(&self, key: &str, value: String, ttl_seconds: Option<i64>) {
        let mut inner = self.inner.write();

        let old_size = inner.map.get(key).map_or(0, |v| pair_size(key, v));
        let new_size = pair_size(key, &value);
        inner.map.insert(key.to_string(), value);
        inner.memory = inner.memory.saturating_sub(old_size) + new_size;

        match ttl_seconds {
            Some(secs) => {
                inner
                    .ttl
                    .insert(key.to_string(), now_ms() + secs.saturating_mul(1000));
            }
            None => {
                inner.ttl.remove(key);
            }
        }

        self.touch_lru(&mut inner, key);
        self.enforce_memory_limit(&mut inner);
        self.mark_dirty(&mut inner, 1);
    }

    /// Overwrite an existing pair without touching its TTL. False if the
    /// key is absent (or expired).
    pub fn update(&self, key: &str, value: String) -> bool {
        let mut inner = self.inner.write();
        if self.expire_if_due(&mut inner, key) {
            return false;
        }
        let old_size = match inner.map.get(key) {
            Some(old) => pair_size(key, old),
            None => return false,
        };

        let new_size = pair_size(key, &value);
        inner.map.insert(key.to_string(), value);
        inner.memory = inner.memory.saturating_sub(old_size) + new_size;

        self.touch_lru(&mut inner, key);
        self.enforce_memory_limit(&mut inner);
        self.mark_dirty(&mut inner, 1);
        true
    }

    /// Look a key up and promote it. The lookup runs under the shared lock;
    /// promotion re-acquires the exclusive lock afterwards, so the returned
    /// value is the one that was current at read time even if the key is
    /// evicted in between.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = {
            let inner = self.inner.read();
            match inner.map.get(key) {
                None => return None,
                Some(value) => {
                    if is_due(&inner, key, now_ms()) {
                        None
                    } else {
                        Some(value.clone())
                    }
                }
            }
        };

        match value {
            Some(value) => {
                let mut inner = self.inner.write();
                if inner.map.contains_key(key) {
                    self.touch_lru(&mut inner, key);
                }
                Some(value)
            }
            None => {
                // Deadline passed: first toucher removes the key.
                let mut inner = self.inner.write();
                self.expire_if_due(&mut inner, key);
                None
            }
        }
    }

    /// Delete keys; returns how many live keys were removed. Expired
    /// leftovers are cleaned up but not counted.
    pub fn del(&self, keys: &[String]) -> usize {
        let mut inner = self.inner.write();
        let now = now_ms();
        let mut removed = 0usize;
        let mut mutations = 0u64;
        for key in keys {
            let was_due = is_due(&inner, key, now);
            if remove_entry(&mut inner, key) {
                mutations += 1;
                if !was_due {
                    removed += 1;
                }
            }
        }
        if mutations > 0 {
            self.mark_dirty(&mut inner, mutations);
        }
        removed
    }

    /// Increment/decrement a key interpreted as a signed 64-bit decimal.
    /// An absent key counts as 0.
    pub fn incr_decr(&self, key: &str, amount: i64, is_incr: bool) -> Result<i64, IncrError> {
        let mut inner = self.inner.write();
        self.expire_if_due(&mut inner, key);

        let (current, old_size) = match inner.map.get(key) {
            Some(value) => match value.parse::<i64>() {
                Ok(n) => (n, pair_size(key, value)),
                Err(_) => return Err(IncrError::NotInteger),
            },
            None => (0, 0),
        };

        let delta = if is_incr { amount } else { -amount };
        let next = current.wrapping_add(delta);
        let text = next.to_string();

        let new_size = pair_size(key, &text);
        inner.map.insert(key.to_string(), text);
        inner.memory = inner.memory.saturating_sub(old_size) + new_size;

        self.touch_lru(&mut inner, key);
        self.enforce_memory_limit(&mut inner);
        self.mark_dirty(&mut inner, 1);
        Ok(next)
    }

    /// Remaining lifetime of a key
    pub fn ttl(&self, key: &str) -> TtlStatus {
        let now = now_ms();
        {
            let inner = self.inner.read();
            if !inner.map.contains_key(key) {
                return TtlStatus::Missing;
            }
            match inner.ttl.get(key) {
                None => return TtlStatus::NoExpiry,
                Some(&deadline) if now <= deadline => {
                    return TtlStatus::Seconds((deadline - now) / 1000);
                }
                Some(_) => {}
            }
        }

        let mut inner = self.inner.write();
        self.expire_if_due(&mut inner, key);
        TtlStatus::Missing
    }

    /// Arm or clear a deadline. `seconds <= 0` clears. False if the key is
    /// absent (or expired).
    pub fn expire(&self, key: &str, seconds: i64) -> bool {
        let mut inner = self.inner.write();
        if self.expire_if_due(&mut inner, key) || !inner.map.contains_key(key) {
            return false;
        }

        if seconds <= 0 {
            inner.ttl.remove(key);
        } else {
            inner
                .ttl
                .insert(key.to_string(), now_ms() + seconds.saturating_mul(1000));
        }
        self.mark_dirty(&mut inner, 1);
        true
    }

    /// Drop everything; returns how many keys were cleared
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let cleared = inner.map.len();
        inner.map.clear();
        inner.ttl.clear();
        inner.lru.clear();
        inner.memory = 0;
        self.mark_dirty(&mut inner, 1);
        cleared
    }

    /// Count live keys beginning with `prefix` (byte comparison)
    pub fn prefix_count(&self, prefix: &str) -> usize {
        let inner = self.inner.read();
        let now = now_ms();
        inner
            .map
            .keys()
            .filter(|k| k.starts_with(prefix) && !is_due(&inner, k, now))
            .count()
    }

    // =========================================================================
    // JSON handler support
    // =========================================================================

    /// Read a value under the shared lock without promoting it. The JSON
    /// read commands promote separately after serializing their result.
    pub fn read_value(&self, key: &str) -> Option<String> {
        {
            let inner = self.inner.read();
            match inner.map.get(key) {
                None => return None,
                Some(value) if !is_due(&inner, key, now_ms()) => return Some(value.clone()),
                Some(_) => {}
            }
        }
        let mut inner = self.inner.write();
        self.expire_if_due(&mut inner, key);
        None
    }

    /// Promote a key after a read; false if it disappeared in the interim
    pub fn promote(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.map.contains_key(key) {
            return false;
        }
        self.touch_lru(&mut inner, key);
        true
    }

    /// Read-modify-write a value atomically. The closure sees the current
    /// value and decides whether to replace it; replacement updates memory,
    /// promotes, marks dirty, and enforces the limit before the lock drops.
    pub fn mutate_value<T>(
        &self,
        key: &str,
        f: impl FnOnce(&str) -> MutateOutcome<T>,
    ) -> MutateResult<T> {
        let mut inner = self.inner.write();
        if self.expire_if_due(&mut inner, key) {
            return MutateResult::Missing;
        }

        let outcome = match inner.map.get(key) {
            Some(value) => f(value),
            None => return MutateResult::Missing,
        };

        match outcome {
            MutateOutcome::Keep(report) => MutateResult::Done(report),
            MutateOutcome::Replace(new_value, report) => {
                let old_size = inner.map.get(key).map_or(0, |v| pair_size(key, v));
                let new_size = pair_size(key, &new_value);
                inner.map.insert(key.to_string(), new_value);
                inner.memory = inner.memory.saturating_sub(old_size) + new_size;

                self.touch_lru(&mut inner, key);
                self.enforce_memory_limit(&mut inner);
                self.mark_dirty(&mut inner, 1);
                MutateResult::Done(report)
            }
        }
    }

    // =========================================================================
    // Background manager support
    // =========================================================================

    /// One sweeper tick: expire due keys and take a batched snapshot when
    /// the dirty counter crosses the threshold. Uses `try_write`; returns
    /// `None` without doing anything when the lock is contended.
    pub fn sweep_and_save(&self) -> Option<SweepStats> {
        let mut inner = self.inner.try_write()?;
        let mut stats = SweepStats::default();

        let now = now_ms();
        let due: Vec<String> = inner
            .ttl
            .iter()
            .filter(|(_, &deadline)| now > deadline)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &due {
            if remove_entry(&mut inner, key) {
                stats.expired += 1;
            }
        }
        if stats.expired > 0 {
            self.dirty_ops.fetch_add(stats.expired as u64, Ordering::Relaxed);
        }

        let batch = self.batch_size.load(Ordering::Relaxed);
        if batch > 0 && self.dirty_ops.load(Ordering::Relaxed) >= batch {
            stats.saved = self.save_unlocked(&inner);
        }

        Some(stats)
    }

    /// Shutdown save: write a snapshot if anything is unsaved
    pub fn final_save(&self) -> bool {
        if self.dirty_ops.load(Ordering::Relaxed) == 0 {
            return false;
        }
        let inner = self.inner.write();
        self.save_unlocked(&inner)
    }

    /// Populate from a snapshot at startup, rebuilding the memory estimate
    /// and the LRU order, then enforcing the limit. Returns the loaded key
    /// count.
    pub fn load_snapshot(&self, snapshot: Snapshot) -> usize {
        let mut inner = self.inner.write();
        inner.map = snapshot.store;
        inner.ttl = snapshot.ttl;

        // A TTL entry whose key the snapshot no longer carries is dropped.
        let orphans: Vec<String> = inner
            .ttl
            .keys()
            .filter(|k| !inner.map.contains_key(*k))
            .cloned()
            .collect();
        for key in orphans {
            inner.ttl.remove(&key);
        }

        inner.memory = 0;
        inner.lru.clear();
        let keys: Vec<String> = inner.map.keys().cloned().collect();
        for key in &keys {
            let size = pair_size(key, &inner.map[key]);
            inner.memory += size;
            self.touch_lru(&mut inner, key);
        }

        self.enforce_memory_limit(&mut inner);
        inner.map.len()
    }

    // =========================================================================
    // Stats / tunables
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl_count(&self) -> usize {
        self.inner.read().ttl.len()
    }

    pub fn memory_used(&self) -> u64 {
        self.inner.read().memory
    }

    pub fn dirty_ops(&self) -> u64 {
        self.dirty_ops.load(Ordering::Relaxed)
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode.load(Ordering::Relaxed)
    }

    pub fn set_debug_mode(&self, on: bool) {
        self.debug_mode.store(on, Ordering::Relaxed);
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size.load(Ordering::Relaxed)
    }

    pub fn set_batch_size(&self, size: u64) {
        self.batch_size.store(size, Ordering::Relaxed);
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }

    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_bytes
    }

    pub fn persistence_enabled(&self) -> bool {
        self.persistence_enabled
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    // =========================================================================
    // Internals (write lock held)
    // =========================================================================

    fn touch_lru(&self, inner: &mut StoreInner, key: &str) {
        if self.caching_enabled {
            inner.lru.touch(key);
        }
    }

    /// Evict from the LRU tail until the estimate fits the budget. Runs
    /// only at the end of writes that grew the estimate.
    fn enforce_memory_limit(&self, inner: &mut StoreInner) {
        if !self.caching_enabled || self.max_memory_bytes == 0 {
            return;
        }
        while inner.memory > self.max_memory_bytes {
            let victim = match inner.lru.pop_back() {
                Some(key) => key,
                None => break,
            };
            if let Some(value) = inner.map.remove(&victim) {
                inner.memory = inner.memory.saturating_sub(pair_size(&victim, &value));
                inner.ttl.remove(&victim);
                tracing::debug!(key = %victim, "evicted to stay within memory limit");
            }
        }
    }

    /// Lazy expiry: remove the key if its deadline has passed, counting the
    /// removal as a mutation. True if it was removed here.
    fn expire_if_due(&self, inner: &mut StoreInner, key: &str) -> bool {
        if is_due(inner, key, now_ms()) && remove_entry(inner, key) {
            self.mark_dirty(inner, 1);
            true
        } else {
            false
        }
    }

    /// Count mutations and write through when batching is off
    fn mark_dirty(&self, inner: &mut StoreInner, ops: u64) {
        self.dirty_ops.fetch_add(ops, Ordering::Relaxed);
        if self.batch_size.load(Ordering::Relaxed) == 0 {
            self.save_unlocked(inner);
        }
    }

    /// Snapshot under the held lock. On success the dirty counter resets;
    /// a failed save leaves it untouched and only logs.
    fn save_unlocked(&self, inner: &StoreInner) -> bool {
        if !self.persistence_enabled {
            return false;
        }
        match persistence::save(&self.database_path, &inner.map, &inner.ttl) {
            Ok(()) => {
                self.dirty_ops.store(0, Ordering::Relaxed);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, path = %self.database_path.display(), "snapshot save failed");
                false
            }
        }
    }
}

/// The memory estimate charges each pair `len(key) + len(value)`
fn pair_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

fn is_due(inner: &StoreInner, key: &str, now: i64) -> bool {
    inner.ttl.get(key).is_some_and(|&deadline| now > deadline)
}

/// Full cleanup for one key: value map, TTL map, LRU node, memory estimate
fn remove_entry(inner: &mut StoreInner, key: &str) -> bool {
    match inner.map.remove(key) {
        Some(value) => {
            inner.memory = inner.memory.saturating_sub(pair_size(key, &value));
            inner.ttl.remove(key);
            inner.lru.remove(key);
            true
        }
        None => false,
    }
}
