//! Client-side query cache
//!
//! Keeps query results in memory keyed by [`Fingerprint`], shares in-flight
//! fetches between readers, invalidates by [`Tag`], and evicts entries
//! nobody has looked at for a while.

mod entry;
mod fingerprint;
mod request;
mod subscription;
mod tags;

#[cfg(test)]
pub(crate) mod testing;

pub use entry::{EntryStatus, FetchResult, Fetched, QueryError, QueryState};
pub use fingerprint::Fingerprint;
pub use request::{FetchFn, FetchHandle, RequestCache};
pub use subscription::{ConsumerId, Subscription, SubscriptionManager};
pub use tags::{Tag, TagIndex};

use std::time::Duration;

/// Default grace period before an unused entry is evicted
pub const DEFAULT_KEEP_UNUSED_FOR: Duration = Duration::from_secs(60);

/// Cache tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry survives with zero subscribers
    pub keep_unused_for: Duration,
    /// Fulfilled entries older than this are refetched on the next read
    pub refetch_after: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: DEFAULT_KEEP_UNUSED_FOR,
            refetch_after: None,
        }
    }
}
