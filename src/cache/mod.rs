//! TTL cache for catalog result pages.
//!
//! Entries are keyed by [`CacheKey`] and stored whole, so writes are
//! last-write-wins and never patched. Reads never delete: an expired entry is
//! simply reported absent until the periodic sweep removes it.
//!
//! Time is measured with [`tokio::time::Instant`] so tests can drive expiry
//! with a paused clock.

use crate::catalog::Item;
use crate::filters::CacheKey;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One cached page.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub items: Vec<Item>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub stored_at: Instant,
}

impl CacheEntry {
    /// Entry stamped with the current time.
    pub fn new(items: Vec<Item>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self {
            items,
            next_cursor,
            has_more,
            stored_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

#[derive(Clone)]
pub struct ResultCache {
    entries: Arc<DashMap<CacheKey, Arc<CacheEntry>>>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the entry for `key` if present and younger than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(self.ttl) {
            trace!(key = %key, "cache hit");
            Some(Arc::clone(entry.value()))
        } else {
            trace!(key = %key, "cache entry expired");
            None
        }
    }

    /// Store `entry` under `key`, replacing whatever was there.
    pub fn set(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, Arc::new(entry));
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Drop every entry regardless of age.
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        debug!(dropped, "result cache cleared");
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Start a background task that sweeps every `every` until the returned
    /// handle is stopped or dropped. Must be called within a tokio runtime.
    pub fn spawn_sweeper(&self, every: Duration) -> Sweeper {
        let cache = self.clone();
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // skip the immediate first tick
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "swept expired cache entries");
                        }
                    }
                }
            }
            trace!("cache sweeper stopped");
        });

        Sweeper { token, handle }
    }
}

/// Handle to a running sweep task. Dropping it stops the task.
pub struct Sweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sweeper {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
