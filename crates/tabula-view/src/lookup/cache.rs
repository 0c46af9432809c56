//! Session cache of resolved foreign records
//!
//! Entries are keyed by `(fk column, value)`. A fetch that is still in flight
//! is stored as a shared future so concurrent requests for the same key await
//! the same fetch instead of issuing another one.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tabula_core::{Record, Value};

/// Cache key for one foreign-key value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub fk_column: String,
    pub value: String,
}

impl LookupKey {
    pub fn new(fk_column: impl Into<String>, value: &Value) -> Self {
        Self {
            fk_column: fk_column.into(),
            value: value.cache_key(),
        }
    }
}

/// Result of resolving one foreign-key value
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Arc<Record>),
    /// No referenced row matched
    NotFound,
    /// The fetch failed; the message is shown inline for the cell
    Failed(String),
}

impl LookupOutcome {
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Found(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

type SharedFetch = Shared<BoxFuture<'static, LookupOutcome>>;

enum CacheEntry {
    /// Fetch in flight, awaited by every requester of the key
    Loading(SharedFetch),
    Loaded(LookupOutcome),
}

/// Foreign-record cache scoped to one view session.
///
/// Invalidation clears everything and bumps a generation counter; fetches
/// started before the bump complete normally for their callers but are not
/// written back.
#[derive(Default)]
pub struct LookupCache {
    entries: RwLock<HashMap<LookupKey, CacheEntry>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("entries", &self.entries.read().len())
            .field("generation", &self.generation())
            .finish()
    }
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Completed outcome for `key`, if any
    pub fn get(&self, key: &LookupKey) -> Option<LookupOutcome> {
        match self.entries.read().get(key) {
            Some(CacheEntry::Loaded(outcome)) => Some(outcome.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self, key: &LookupKey) -> bool {
        matches!(self.entries.read().get(key), Some(CacheEntry::Loading(_)))
    }

    /// Number of completed entries
    pub fn loaded_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| matches!(e, CacheEntry::Loaded(_)))
            .count()
    }

    /// Return the cached outcome for `key`, joining an in-flight fetch or
    /// starting a new one with `fetch`.
    pub async fn get_or_fetch<F>(&self, key: LookupKey, fetch: F) -> LookupOutcome
    where
        F: FnOnce() -> BoxFuture<'static, LookupOutcome>,
    {
        let joined = {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(CacheEntry::Loaded(outcome)) => {
                    tracing::debug!(column = %key.fk_column, value = %key.value, "lookup cache hit");
                    return outcome.clone();
                }
                Some(CacheEntry::Loading(pending)) => {
                    tracing::debug!(
                        column = %key.fk_column,
                        value = %key.value,
                        "joining in-flight lookup"
                    );
                    Some((pending.clone(), self.generation()))
                }
                None => None,
            }
        };
        let (pending, generation) = match joined {
            Some(joined) => joined,
            None => self.start(&key, fetch),
        };

        let outcome = pending.await;
        self.complete(&key, generation, &outcome);
        outcome
    }

    fn start<F>(&self, key: &LookupKey, fetch: F) -> (SharedFetch, u64)
    where
        F: FnOnce() -> BoxFuture<'static, LookupOutcome>,
    {
        let mut entries = self.entries.write();
        let generation = self.generation();
        // another caller may have started the fetch between the two locks
        match entries.get(key) {
            Some(CacheEntry::Loading(pending)) => (pending.clone(), generation),
            Some(CacheEntry::Loaded(outcome)) => (
                futures::future::ready(outcome.clone()).boxed().shared(),
                generation,
            ),
            None => {
                tracing::debug!(column = %key.fk_column, value = %key.value, "lookup cache miss");
                let pending = fetch().shared();
                entries.insert(key.clone(), CacheEntry::Loading(pending.clone()));
                (pending, generation)
            }
        }
    }

    fn complete(&self, key: &LookupKey, generation: u64, outcome: &LookupOutcome) {
        let mut entries = self.entries.write();
        if generation != self.generation() {
            tracing::debug!(
                column = %key.fk_column,
                value = %key.value,
                "dropping lookup result from an invalidated generation"
            );
            return;
        }
        if let Some(entry) = entries.get_mut(key)
            && matches!(entry, CacheEntry::Loading(_))
        {
            *entry = CacheEntry::Loaded(outcome.clone());
        }
    }

    /// Forget failed outcomes so the next request retries them
    pub fn clear_failed(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !matches!(entry, CacheEntry::Loaded(LookupOutcome::Failed(_))));
        before - entries.len()
    }

    /// Drop every entry and start a new generation
    pub fn invalidate(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if !entries.is_empty() {
            tracing::debug!(entries = entries.len(), "invalidating lookup cache");
        }
        entries.clear();
    }
}
