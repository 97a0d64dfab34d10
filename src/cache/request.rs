//! The request cache
//!
//! Single source of truth for in-flight and completed query results. At most
//! one fetch per fingerprint is awaited by consumers at any time; concurrent
//! readers share it through [`futures::future::Shared`].
//!
//! Every issued fetch takes a cache-wide generation number. A result is only
//! applied if no newer fetch for the same fingerprint has settled before it,
//! so a slow early request cannot overwrite data or tags from a later one.
//!
//! All state lives behind `Rc<RefCell<_>>` and background fetches run via
//! [`tokio::task::spawn_local`]: use the cache from inside a
//! [`tokio::task::LocalSet`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{self, Either, LocalBoxFuture, Ready, Shared};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::entry::{EntryStatus, FetchResult, QueryState};
use super::fingerprint::Fingerprint;
use super::tags::{Tag, TagIndex};
use super::CacheConfig;

/// Produces one network round-trip each time it is called
pub type FetchFn = Rc<dyn Fn() -> LocalBoxFuture<'static, FetchResult>>;

type SharedFetch = Shared<LocalBoxFuture<'static, QueryState>>;

/// Resolves to the entry state once the fetch (if any) has settled
pub type FetchHandle = Either<Ready<QueryState>, SharedFetch>;

struct CacheEntry {
    status: EntryStatus,
    data: Option<serde_json::Value>,
    error: Option<super::QueryError>,
    fulfilled_at: Option<DateTime<Utc>>,
    subscribers: usize,
    fetch_fn: FetchFn,
    /// Generation of the most recently issued fetch
    issued: u64,
    /// Newest generation whose result has been applied
    settled: u64,
    /// Generation that produced `data`
    data_gen: u64,
    /// Data from fetches issued before this generation is stale
    stale_before: u64,
    in_flight: Option<SharedFetch>,
    /// Invalidated with no subscribers while a fetch was running
    evict_on_settle: bool,
    notify: watch::Sender<QueryState>,
}

impl CacheEntry {
    fn new(fetch_fn: FetchFn) -> Self {
        let (notify, _) = watch::channel(QueryState::default());
        Self {
            status: EntryStatus::Uninitialized,
            data: None,
            error: None,
            fulfilled_at: None,
            subscribers: 0,
            fetch_fn,
            issued: 0,
            settled: 0,
            data_gen: 0,
            stale_before: 0,
            in_flight: None,
            evict_on_settle: false,
            notify,
        }
    }

    fn is_stale(&self, now: DateTime<Utc>, max_age: Option<Duration>) -> bool {
        self.data.is_some()
            && (self.data_gen < self.stale_before || is_expired(self.fulfilled_at, now, max_age))
    }

    fn snapshot(&self, now: DateTime<Utc>, max_age: Option<Duration>) -> QueryState {
        QueryState {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fulfilled_at: self.fulfilled_at,
            is_stale: self.is_stale(now, max_age),
        }
    }

    fn publish(&self, now: DateTime<Utc>, max_age: Option<Duration>) {
        self.notify.send_replace(self.snapshot(now, max_age));
    }
}

fn is_expired(
    fulfilled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_age: Option<Duration>,
) -> bool {
    match (fulfilled_at, max_age) {
        (Some(at), Some(max_age)) => chrono::Duration::from_std(max_age)
            .map(|max_age| now - at >= max_age)
            .unwrap_or(false),
        _ => false,
    }
}

/// State for a fetch whose entry was evicted while it was in flight
fn detached_state(result: FetchResult, now: DateTime<Utc>) -> QueryState {
    match result {
        Ok(fetched) => QueryState {
            status: EntryStatus::Fulfilled,
            data: Some(fetched.data),
            error: None,
            fulfilled_at: Some(now),
            is_stale: false,
        },
        Err(error) => QueryState {
            status: EntryStatus::Rejected,
            error: Some(error),
            ..Default::default()
        },
    }
}

enum Settled {
    Done(QueryState),
    /// A newer fetch is in flight; waiters follow it
    Superseded(SharedFetch),
}

struct CacheInner {
    config: CacheConfig,
    entries: HashMap<Fingerprint, CacheEntry>,
    tags: TagIndex,
    next_generation: u64,
}

/// Keyed store of query results with tag-based invalidation.
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct RequestCache {
    inner: Rc<RefCell<CacheInner>>,
}

impl RequestCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CacheInner {
                config,
                entries: HashMap::new(),
                tags: TagIndex::new(),
                next_generation: 1,
            })),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.borrow().config.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Return the cached state, join the in-flight fetch, or start one.
    ///
    /// A fresh fulfilled entry resolves immediately. A pending entry hands out
    /// the existing fetch unless that fetch was issued before the entry was
    /// last invalidated. Anything else (missing, rejected, stale) issues
    /// exactly one call to `fetch_fn`, or to the function the entry was
    /// created with if it already exists.
    pub fn get_or_fetch(&self, fingerprint: &Fingerprint, fetch_fn: FetchFn) -> FetchHandle {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let now = Utc::now();
        let max_age = inner.config.refetch_after;

        let entry = inner
            .entries
            .entry(fingerprint.clone())
            .or_insert_with(|| CacheEntry::new(fetch_fn));

        match entry.status {
            EntryStatus::Fulfilled if !entry.is_stale(now, max_age) => {
                trace!(fingerprint = %fingerprint, "cache hit");
                return Either::Left(future::ready(entry.snapshot(now, max_age)));
            }
            EntryStatus::Pending if entry.issued >= entry.stale_before => {
                if let Some(in_flight) = &entry.in_flight {
                    debug!(fingerprint = %fingerprint, "joining in-flight fetch");
                    return Either::Right(in_flight.clone());
                }
            }
            _ => {}
        }

        match self.issue(inner, fingerprint) {
            Some(fetch) => Either::Right(fetch),
            None => Either::Left(future::ready(QueryState::default())),
        }
    }

    /// Current state of an entry, if present
    pub fn state(&self, fingerprint: &Fingerprint) -> Option<QueryState> {
        let inner = self.inner.borrow();
        let max_age = inner.config.refetch_after;
        inner
            .entries
            .get(fingerprint)
            .map(|entry| entry.snapshot(Utc::now(), max_age))
    }

    /// Receiver that observes every state transition of an entry
    pub fn watch(&self, fingerprint: &Fingerprint) -> Option<watch::Receiver<QueryState>> {
        self.inner
            .borrow()
            .entries
            .get(fingerprint)
            .map(|entry| entry.notify.subscribe())
    }

    /// Whether a fetch for the entry has not settled yet
    pub fn is_in_flight(&self, fingerprint: &Fingerprint) -> bool {
        self.inner
            .borrow()
            .entries
            .get(fingerprint)
            .is_some_and(|entry| entry.in_flight.is_some())
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.borrow().entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Every cached fingerprint, sorted
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        let mut fingerprints: Vec<_> = self.inner.borrow().entries.keys().cloned().collect();
        fingerprints.sort();
        fingerprints
    }

    /// Tags stamped on an entry by its last successful fetch
    pub fn tags_of(&self, fingerprint: &Fingerprint) -> Vec<Tag> {
        self.inner.borrow().tags.tags_of(fingerprint).to_vec()
    }

    /// Fingerprints the tag index currently references
    pub fn tagged_len(&self) -> usize {
        self.inner.borrow().tags.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriber counts
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the entry if needed and return a receiver for its transitions
    pub fn attach(&self, fingerprint: &Fingerprint, fetch_fn: FetchFn) -> watch::Receiver<QueryState> {
        let mut inner = self.inner.borrow_mut();
        inner
            .entries
            .entry(fingerprint.clone())
            .or_insert_with(|| CacheEntry::new(fetch_fn))
            .notify
            .subscribe()
    }

    /// Create the entry if needed and count one more subscriber
    pub fn retain(&self, fingerprint: &Fingerprint, fetch_fn: FetchFn) -> usize {
        let mut inner = self.inner.borrow_mut();
        let entry = inner
            .entries
            .entry(fingerprint.clone())
            .or_insert_with(|| CacheEntry::new(fetch_fn));
        entry.subscribers += 1;
        entry.subscribers
    }

    /// Count one subscriber fewer; returns the remaining count
    pub fn release(&self, fingerprint: &Fingerprint) -> usize {
        let mut inner = self.inner.borrow_mut();
        match inner.entries.get_mut(fingerprint) {
            Some(entry) => {
                entry.subscribers = entry.subscribers.saturating_sub(1);
                entry.subscribers
            }
            None => 0,
        }
    }

    pub fn subscriber_count(&self, fingerprint: &Fingerprint) -> usize {
        self.inner
            .borrow()
            .entries
            .get(fingerprint)
            .map_or(0, |entry| entry.subscribers)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a new fetch for an entry even if one is in flight
    pub fn refetch(&self, fingerprint: &Fingerprint) -> Option<FetchHandle> {
        let mut inner = self.inner.borrow_mut();
        self.issue(&mut inner, fingerprint).map(Either::Right)
    }

    /// Mark entries stale. Subscribed entries are refetched with the function
    /// they were created with. Unsubscribed entries are evicted, or once their
    /// in-flight fetch settles if one is running; that fetch's waiters see
    /// the result flagged stale.
    pub fn invalidate<I>(&self, fingerprints: I)
    where
        I: IntoIterator<Item = Fingerprint>,
    {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let watermark = inner.next_generation;
        let now = Utc::now();
        let max_age = inner.config.refetch_after;

        for fingerprint in fingerprints {
            let Some(entry) = inner.entries.get_mut(&fingerprint) else {
                continue;
            };
            entry.stale_before = watermark;

            if entry.subscribers == 0 && entry.in_flight.is_some() {
                debug!(fingerprint = %fingerprint, "invalidated while fetching, evicting on settle");
                entry.evict_on_settle = true;
                entry.publish(now, max_age);
            } else if entry.subscribers == 0 {
                debug!(fingerprint = %fingerprint, "invalidated without subscribers, evicting");
                inner.entries.remove(&fingerprint);
                inner.tags.remove(&fingerprint);
            } else {
                debug!(fingerprint = %fingerprint, "invalidated, refetching");
                entry.publish(now, max_age);
                self.issue(inner, &fingerprint);
            }
        }
    }

    /// Invalidate every entry matching any of `tags`; returns what matched
    pub fn invalidate_tags(&self, tags: &[Tag]) -> Vec<Fingerprint> {
        let mut matched: Vec<_> = self.inner.borrow().tags.lookup(tags).into_iter().collect();
        matched.sort();

        debug!(
            tags = %tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(","),
            matched = matched.len(),
            "invalidating tags"
        );
        self.invalidate(matched.iter().cloned());
        matched
    }

    /// Remove an entry and its tag associations unconditionally
    pub fn evict(&self, fingerprint: &Fingerprint) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.tags.remove(fingerprint);
        let removed = inner.entries.remove(fingerprint).is_some();
        if removed {
            debug!(fingerprint = %fingerprint, "evicted");
        }
        removed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    fn issue(&self, inner: &mut CacheInner, fingerprint: &Fingerprint) -> Option<SharedFetch> {
        let generation = inner.next_generation;
        let max_age = inner.config.refetch_after;
        let entry = inner.entries.get_mut(fingerprint)?;
        inner.next_generation += 1;

        entry.issued = generation;
        entry.status = EntryStatus::Pending;
        entry.evict_on_settle = false;
        debug!(fingerprint = %fingerprint, generation, "issuing fetch");

        let request = (entry.fetch_fn)();
        let weak: Weak<RefCell<CacheInner>> = Rc::downgrade(&self.inner);
        let key = fingerprint.clone();

        let fetch = async move {
            let result = request.await;
            let Some(inner) = weak.upgrade() else {
                return detached_state(result, Utc::now());
            };
            let cache = RequestCache { inner };

            match cache.settle(&key, generation, result) {
                Settled::Done(state) => state,
                Settled::Superseded(next) => next.await,
            }
        }
        .boxed_local()
        .shared();

        entry.in_flight = Some(fetch.clone());
        entry.publish(Utc::now(), max_age);

        // Runs to completion even if every waiter goes away
        tokio::task::spawn_local(fetch.clone());

        Some(fetch)
    }

    fn settle(&self, fingerprint: &Fingerprint, generation: u64, result: FetchResult) -> Settled {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let now = Utc::now();
        let max_age = inner.config.refetch_after;

        let Some(entry) = inner.entries.get_mut(fingerprint) else {
            debug!(fingerprint = %fingerprint, generation, "entry evicted before fetch settled");
            return Settled::Done(detached_state(result, now));
        };

        if generation < entry.settled {
            debug!(
                fingerprint = %fingerprint,
                generation,
                settled = entry.settled,
                "discarding out-of-order result"
            );
        } else {
            entry.settled = generation;
            let latest = entry.issued == generation;

            match result {
                Ok(fetched) => {
                    entry.data = Some(fetched.data);
                    entry.error = None;
                    entry.fulfilled_at = Some(now);
                    entry.data_gen = generation;
                    inner.tags.stamp(fingerprint, &fetched.tags);
                    if latest {
                        entry.status = EntryStatus::Fulfilled;
                    }
                }
                Err(error) => {
                    debug!(fingerprint = %fingerprint, generation, %error, "fetch rejected");
                    entry.error = Some(error);
                    if latest {
                        entry.status = EntryStatus::Rejected;
                    }
                }
            }
        }

        if entry.issued == generation {
            entry.in_flight = None;
        }
        entry.publish(now, max_age);

        if let Some(next) = &entry.in_flight {
            if entry.issued > generation {
                return Settled::Superseded(next.clone());
            }
        }

        let state = entry.snapshot(now, max_age);
        if entry.evict_on_settle && entry.in_flight.is_none() && entry.subscribers == 0 {
            debug!(fingerprint = %fingerprint, generation, "evicting invalidated entry");
            inner.entries.remove(fingerprint);
            inner.tags.remove(fingerprint);
        }
        Settled::Done(state)
    }
}
