//! Record loading for a view session.
//!
//! Aggregation is pure; the only hazard is rendering a result from a fetch
//! that has since been superseded. Each fetch takes a [`FetchTicket`] and its
//! result is installed only if no newer fetch has started. Fetched
//! snapshots are shared read-only between views through [`SnapshotCache`].

use adboard_core::normalize::normalize_all;
use adboard_core::source::{FetchQuery, RecordSource};
use adboard_core::{AdRecord, LeadDefinition};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared, immutable record set.
pub type Snapshot = Arc<[AdRecord]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tracks the newest fetch of one view and the snapshot it produced.
pub struct ViewSession {
    generation: AtomicU64,
    current: RwLock<Option<(u64, Snapshot)>>,
}

impl ViewSession {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }

    /// Start a fetch. Any ticket issued earlier becomes stale.
    pub fn begin(&self) -> FetchTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        FetchTicket { generation }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Install the result of a fetch. Returns `false` and drops the records
    /// when a newer fetch has been started since `ticket` was issued.
    pub fn complete(&self, ticket: FetchTicket, records: Snapshot) -> bool {
        let mut current = self.current.write();
        if !self.is_current(ticket) {
            debug!(
                generation = ticket.generation,
                latest = self.generation.load(Ordering::SeqCst),
                "Discarding superseded fetch"
            );
            return false;
        }
        *current = Some((ticket.generation, records));
        true
    }

    /// Records of the most recent completed fetch.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.current.read().as_ref().map(|(_, records)| records.clone())
    }
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new()
    }
}

struct CacheEntry {
    records: Snapshot,
    inserted: u64,
}

/// Bounded concurrent cache of fetched snapshots keyed by backend query.
pub struct SnapshotCache {
    entries: DashMap<FetchQuery, CacheEntry>,
    capacity: usize,
    clock: AtomicU64,
}

impl SnapshotCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    pub fn get(&self, query: &FetchQuery) -> Option<Snapshot> {
        self.entries.get(query).map(|e| e.records.clone())
    }

    /// Insert a snapshot, evicting the oldest entry when full.
    pub fn insert(&self, query: FetchQuery, records: Snapshot) {
        if !self.entries.contains_key(&query) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().inserted)
                .map(|e| e.key().clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        let inserted = self.clock.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(query, CacheEntry { records, inserted });
    }

    pub fn invalidate(&self, query: &FetchQuery) -> bool {
        self.entries.remove(query).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches raw rows, normalizes them once and shares the result.
pub struct RecordLoader<S: RecordSource> {
    source: S,
    cache: SnapshotCache,
    lead_definition: LeadDefinition,
}

impl<S: RecordSource> RecordLoader<S> {
    pub fn new(source: S, cache_capacity: usize, lead_definition: LeadDefinition) -> Self {
        info!(
            cache_capacity,
            leads = %lead_definition,
            "Record loader initialized"
        );
        Self {
            source,
            cache: SnapshotCache::new(cache_capacity),
            lead_definition,
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Load records for `query` on behalf of `session`.
    ///
    /// A failed fetch yields an empty record set instead of an error. The
    /// returned snapshot is `None` when the session started a newer fetch
    /// while this one was in flight.
    pub async fn load(&self, session: &ViewSession, query: FetchQuery) -> Option<Snapshot> {
        let ticket = session.begin();

        let records = match self.cache.get(&query) {
            Some(records) => {
                debug!(generation = ticket.generation(), "Serving cached snapshot");
                records
            }
            None => match self.source.fetch(&query).await {
                Ok(rows) => {
                    let records: Snapshot = normalize_all(&rows, self.lead_definition).into();
                    self.cache.insert(query, records.clone());
                    records
                }
                Err(e) => {
                    warn!(error = %e, "Record fetch failed, showing an empty set");
                    Vec::new().into()
                }
            },
        };

        if session.complete(ticket, records.clone()) {
            Some(records)
        } else {
            None
        }
    }
}
