//! Consumer interest and entry lifecycle
//!
//! A consumer attaches to a fingerprint with [`SubscriptionManager::subscribe`]
//! and gets back a [`Subscription`]; dropping it detaches. The first
//! subscriber triggers a fetch. When the last one leaves, the entry is kept
//! for a grace period and evicted if nobody has come back by then.
//!
//! Subscriptions spawn grace timers with [`tokio::task::spawn_local`], so they
//! must be created and dropped inside the same [`tokio::task::LocalSet`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace};

use super::entry::QueryState;
use super::fingerprint::Fingerprint;
use super::request::{FetchFn, FetchHandle, RequestCache};

/// Identity of one UI consumer
pub type ConsumerId = u64;

#[derive(Default)]
struct SubscriptionsInner {
    /// fingerprint -> consumer -> live `Subscription` handles
    consumers: HashMap<Fingerprint, BTreeMap<ConsumerId, usize>>,
    /// fingerprint -> token of the grace timer allowed to evict it
    pending_evictions: HashMap<Fingerprint, u64>,
    next_token: u64,
}

/// Tracks which consumers are interested in which fingerprints
#[derive(Clone)]
pub struct SubscriptionManager {
    cache: RequestCache,
    keep_unused_for: Duration,
    inner: Rc<RefCell<SubscriptionsInner>>,
}

impl SubscriptionManager {
    pub fn new(cache: RequestCache) -> Self {
        let keep_unused_for = cache.config().keep_unused_for;
        Self {
            cache,
            keep_unused_for,
            inner: Rc::new(RefCell::new(SubscriptionsInner::default())),
        }
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// Register interest in `fingerprint`.
    ///
    /// The first subscriber starts a fetch (or picks up a cached result).
    /// Subscribing the same consumer twice counts once, and it stays
    /// subscribed until every handle it was given has been dropped.
    pub fn subscribe(
        &self,
        fingerprint: &Fingerprint,
        consumer: ConsumerId,
        fetch_fn: FetchFn,
    ) -> Subscription {
        let receiver = self.cache.attach(fingerprint, fetch_fn.clone());

        let newly_added = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending_evictions.remove(fingerprint).is_some() {
                trace!(fingerprint = %fingerprint, "resubscribed during grace period");
            }
            let handles = inner
                .consumers
                .entry(fingerprint.clone())
                .or_default()
                .entry(consumer)
                .or_insert(0);
            *handles += 1;
            *handles == 1
        };

        if newly_added {
            let count = self.cache.retain(fingerprint, fetch_fn.clone());
            debug!(fingerprint = %fingerprint, consumer, subscribers = count, "subscribed");
            if count == 1 {
                // The spawned fetch drives itself; the handle is not needed here
                drop(self.cache.get_or_fetch(fingerprint, fetch_fn));
            }
        }

        Subscription {
            fingerprint: fingerprint.clone(),
            consumer,
            receiver,
            manager: self.clone(),
        }
    }

    /// Release one handle of `consumer`. The consumer leaves once its last
    /// handle is released; at zero subscribers the grace timer starts.
    pub fn unsubscribe(&self, fingerprint: &Fingerprint, consumer: ConsumerId) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let Some(consumers) = inner.consumers.get_mut(fingerprint) else {
                return;
            };
            let removed = match consumers.get(&consumer).copied() {
                None => false,
                Some(1) => consumers.remove(&consumer).is_some(),
                Some(handles) => {
                    consumers.insert(consumer, handles - 1);
                    false
                }
            };
            if consumers.is_empty() {
                inner.consumers.remove(fingerprint);
            }
            removed
        };

        if !removed {
            return;
        }

        let remaining = self.cache.release(fingerprint);
        debug!(fingerprint = %fingerprint, consumer, subscribers = remaining, "unsubscribed");
        if remaining == 0 {
            self.schedule_eviction(fingerprint);
        }
    }

    /// Consumers currently attached to `fingerprint`
    pub fn consumers(&self, fingerprint: &Fingerprint) -> Vec<ConsumerId> {
        self.inner
            .borrow()
            .consumers
            .get(fingerprint)
            .map(|consumers| consumers.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Fingerprints with at least one subscriber
    pub fn active(&self) -> Vec<Fingerprint> {
        let mut active: Vec<_> = self.inner.borrow().consumers.keys().cloned().collect();
        active.sort();
        active
    }

    /// Refetch everything that has subscribers, e.g. after reconnecting
    pub fn refetch_active(&self) -> usize {
        let active = self.active();
        for fingerprint in &active {
            drop(self.cache.refetch(fingerprint));
        }
        debug!(count = active.len(), "refetched active queries");
        active.len()
    }

    fn schedule_eviction(&self, fingerprint: &Fingerprint) {
        let token = {
            let mut inner = self.inner.borrow_mut();
            inner.next_token += 1;
            let token = inner.next_token;
            inner.pending_evictions.insert(fingerprint.clone(), token);
            token
        };

        trace!(fingerprint = %fingerprint, grace = ?self.keep_unused_for, "grace timer started");
        let manager = self.clone();
        let fingerprint = fingerprint.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(manager.keep_unused_for).await;
            manager.expire(&fingerprint, token);
        });
    }

    fn expire(&self, fingerprint: &Fingerprint, token: u64) {
        let still_pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending_evictions.get(fingerprint) == Some(&token) {
                inner.pending_evictions.remove(fingerprint);
                true
            } else {
                false
            }
        };

        if !still_pending || self.cache.subscriber_count(fingerprint) != 0 {
            return;
        }
        if self.cache.is_in_flight(fingerprint) {
            // keep the result for whoever comes back; wait another period
            trace!(fingerprint = %fingerprint, "grace period elapsed mid-fetch");
            self.schedule_eviction(fingerprint);
        } else {
            debug!(fingerprint = %fingerprint, "grace period elapsed");
            self.cache.evict(fingerprint);
        }
    }
}

/// One consumer's attachment to a fingerprint.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    fingerprint: Fingerprint,
    consumer: ConsumerId,
    receiver: watch::Receiver<QueryState>,
    manager: SubscriptionManager,
}

impl Subscription {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }

    /// Current state of the entry, staleness evaluated now
    pub fn state(&self) -> QueryState {
        self.manager
            .cache
            .state(&self.fingerprint)
            .unwrap_or_else(|| self.receiver.borrow().clone())
    }

    /// Wait for the next transition; `None` once the entry is gone
    pub async fn changed(&mut self) -> Option<QueryState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until no fetch is running and return the state
    pub async fn settled(&mut self) -> QueryState {
        loop {
            let state = self.receiver.borrow_and_update().clone();
            if state.is_settled() {
                return state;
            }
            if self.receiver.changed().await.is_err() {
                return state;
            }
        }
    }

    /// Force a new fetch for this entry
    pub fn refetch(&self) -> Option<FetchHandle> {
        self.manager.cache.refetch(&self.fingerprint)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.manager.unsubscribe(&self.fingerprint, self.consumer);
    }
}
