//! The query store handed to consumers
//!
//! [`ApiStore`] bundles the endpoint registry, the request cache and the
//! subscription manager. Construct one per session and pass it to whatever
//! drives the UI; dropping every clone tears the session down.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info};

use crate::api::{endpoints, Endpoint, EndpointKind, EndpointRegistry, RegistryError, Transport};
use crate::cache::{
    CacheConfig, ConsumerId, Fingerprint, QueryError, QueryState, RequestCache, Subscription,
    SubscriptionManager, Tag,
};

/// Options for [`ApiStore::use_query`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Do not subscribe or fetch; the handle stays uninitialized
    pub skip: bool,
}

impl QueryOptions {
    pub fn skip_if(skip: bool) -> Self {
        Self { skip }
    }
}

/// Session-wide query context
#[derive(Clone)]
pub struct ApiStore {
    registry: Rc<EndpointRegistry>,
    cache: RequestCache,
    subscriptions: SubscriptionManager,
    next_consumer: Rc<Cell<ConsumerId>>,
}

impl ApiStore {
    pub fn new(registry: EndpointRegistry, config: CacheConfig) -> Self {
        let cache = RequestCache::new(config);
        Self {
            registry: Rc::new(registry),
            subscriptions: SubscriptionManager::new(cache.clone()),
            cache,
            next_consumer: Rc::new(Cell::new(1)),
        }
    }

    /// A store over the full listings catalog
    pub fn with_catalog(
        transport: Rc<dyn Transport>,
        config: CacheConfig,
    ) -> Result<Self, RegistryError> {
        Ok(Self::new(endpoints::registry(transport)?, config))
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    fn next_consumer(&self) -> ConsumerId {
        let id = self.next_consumer.get();
        self.next_consumer.set(id + 1);
        id
    }

    /// Subscribe to a query and read its live state.
    ///
    /// Must be called inside a [`tokio::task::LocalSet`].
    pub fn use_query(
        &self,
        name: &str,
        args: Value,
        options: QueryOptions,
    ) -> Result<QueryHandle, RegistryError> {
        self.registry.get_as(name, EndpointKind::Query)?;
        let fingerprint = Fingerprint::new(name, &args);

        if options.skip {
            debug!(fingerprint = %fingerprint, "query skipped");
            return Ok(QueryHandle {
                fingerprint,
                subscription: None,
            });
        }

        let fetch_fn = self.registry.fetch_fn(name, args)?;
        let subscription = self
            .subscriptions
            .subscribe(&fingerprint, self.next_consumer(), fetch_fn);

        Ok(QueryHandle {
            fingerprint,
            subscription: Some(subscription),
        })
    }

    /// Trigger for a mutation endpoint
    pub fn use_mutation(&self, name: &str) -> Result<Mutation, RegistryError> {
        let endpoint = self.registry.get_as(name, EndpointKind::Mutation)?;
        Ok(Mutation {
            endpoint,
            store: self.clone(),
        })
    }

    /// Invalidate cached queries outside the mutation flow
    pub fn invalidate_tags(&self, tags: &[Tag]) -> Vec<Fingerprint> {
        self.cache.invalidate_tags(tags)
    }

    /// Subscribe, wait for the result, and let go again
    pub async fn query(&self, name: &str, args: Value) -> Result<QueryState, RegistryError> {
        let mut handle = self.use_query(name, args, QueryOptions::default())?;
        Ok(handle.settled().await)
    }

    /// Refetch every query with a live subscriber
    pub fn refetch_active(&self) -> usize {
        self.subscriptions.refetch_active()
    }
}

/// A consumer's view of one query. Dropping it unsubscribes.
pub struct QueryHandle {
    fingerprint: Fingerprint,
    subscription: Option<Subscription>,
}

impl QueryHandle {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn is_skipped(&self) -> bool {
        self.subscription.is_none()
    }

    pub fn state(&self) -> QueryState {
        self.subscription
            .as_ref()
            .map(Subscription::state)
            .unwrap_or_default()
    }

    /// Next state transition. A skipped handle never changes.
    pub async fn changed(&mut self) -> Option<QueryState> {
        match &mut self.subscription {
            Some(subscription) => subscription.changed().await,
            None => futures::future::pending().await,
        }
    }

    /// Wait until no fetch is running. A skipped handle returns at once.
    pub async fn settled(&mut self) -> QueryState {
        match &mut self.subscription {
            Some(subscription) => subscription.settled().await,
            None => QueryState::default(),
        }
    }

    /// Force a refetch; returns whether one was issued
    pub fn refetch(&self) -> bool {
        self.subscription
            .as_ref()
            .and_then(Subscription::refetch)
            .is_some()
    }
}

/// A write operation. Results are never cached.
pub struct Mutation {
    endpoint: Rc<dyn Endpoint>,
    store: ApiStore,
}

impl Mutation {
    pub fn name(&self) -> &str {
        self.endpoint.name()
    }

    /// Run the mutation; on success invalidate the tags it declares
    pub async fn trigger(&self, args: Value) -> Result<Value, QueryError> {
        let fetched = self
            .store
            .registry
            .call(Rc::clone(&self.endpoint), args.clone())
            .await?;

        let tags = self.endpoint.invalidates_tags(&args);
        if !tags.is_empty() {
            let refreshed = self.store.invalidate_tags(&tags);
            info!(
                mutation = self.endpoint.name(),
                invalidated = refreshed.len(),
                "mutation succeeded"
            );
        }
        Ok(fetched.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Args;
    use crate::cache::testing::flush;
    use crate::cache::EntryStatus;
    use serde_json::json;
    use std::time::Duration;
    use tokio::task::LocalSet;

    const GRACE: Duration = Duration::from_secs(60);

    fn store(transport: &Rc<MockTransport>) -> ApiStore {
        ApiStore::with_catalog(
            transport.clone(),
            CacheConfig {
                keep_unused_for: GRACE,
                refetch_after: None,
            },
        )
        .unwrap()
    }

    fn host_body(venues: &[&str]) -> String {
        let venues: Vec<_> = venues
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"venue_uid": format!("v{i}"), "name": name}))
            .collect();
        json!({"host_uid": "h1", "name": "Cellar Comedy", "venues": venues}).to_string()
    }

    fn venue_names(state: &QueryState) -> Vec<String> {
        state.data.as_ref().unwrap()["venues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap().to_string())
            .collect()
    }

    fn host_args() -> Value {
        Args::new().param("host_uid", "h1").into_value()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_use_query_loads_then_settles() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/host/h1", Ok(host_body(&["The Cellar"])));
                let store = store(&transport);

                let mut handle = store
                    .use_query("findOneHost", host_args(), QueryOptions::default())
                    .unwrap();
                assert!(handle.state().is_loading());

                let state = handle.settled().await;
                assert_eq!(state.status, EntryStatus::Fulfilled);
                assert_eq!(venue_names(&state), vec!["The Cellar"]);
                assert_eq!(
                    store.cache().tags_of(handle.fingerprint()),
                    vec![Tag::specific("Host", "h1")]
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_skip_does_not_fetch() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                let store = store(&transport);

                let mut handle = store
                    .use_query("findOneEvent", Value::Null, QueryOptions::skip_if(true))
                    .unwrap();
                assert!(handle.is_skipped());
                assert_eq!(handle.settled().await.status, EntryStatus::Uninitialized);
                flush().await;
                assert!(transport.calls().is_empty());
                assert!(store.cache().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_unknown_and_wrong_kind_are_registry_errors() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                let store = store(&transport);

                assert!(matches!(
                    store.use_query("findEverything", Value::Null, QueryOptions::default()),
                    Err(RegistryError::UnknownEndpoint(_))
                ));
                assert!(matches!(
                    store.use_query("createVenue", Value::Null, QueryOptions::default()),
                    Err(RegistryError::WrongKind { .. })
                ));
                assert!(matches!(
                    store.use_mutation("findOneHost"),
                    Err(RegistryError::WrongKind { .. })
                ));
            })
            .await;
    }

    #[tokio::test]
    async fn test_http_error_is_state_not_panic() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                let store = store(&transport);

                let state = store
                    .query("findOneEvent", Args::new().param("event_uid", "gone").into())
                    .await
                    .unwrap();
                assert!(state.is_error());
                assert!(state.error.unwrap().is_not_found());
            })
            .await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_venue_refreshes_subscribed_host() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/host/h1", Ok(host_body(&[])));
                transport.respond("GET", "/host/h1", Ok(host_body(&["New Venue"])));
                transport.respond(
                    "POST",
                    "/host/h1/venue",
                    Ok(json!({"venue_uid": "v9", "name": "New Venue"}).to_string()),
                );
                let store = store(&transport);

                let mut host = store
                    .use_query("findOneHost", host_args(), QueryOptions::default())
                    .unwrap();
                let state = host.settled().await;
                assert!(venue_names(&state).is_empty());

                let created = store
                    .use_mutation("createVenue")
                    .unwrap()
                    .trigger(json!({
                        "params": {"host_uid": "h1"},
                        "body": {"name": "New Venue"}
                    }))
                    .await
                    .unwrap();
                assert_eq!(created["venue_uid"], "v9");

                let state = host.state();
                assert!(state.is_fetching());
                assert!(state.is_stale);
                assert!(venue_names(&state).is_empty());

                let state = host.settled().await;
                assert_eq!(state.status, EntryStatus::Fulfilled);
                assert!(!state.is_stale);
                assert_eq!(venue_names(&state), vec!["New Venue"]);
                assert_eq!(transport.count("GET", "/host/h1"), 2);
                assert_eq!(
                    transport.bodies()[1],
                    Some(json!({"name": "New Venue"}))
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_alone() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/host/h1", Ok(host_body(&["The Cellar"])));
                transport.respond(
                    "PUT",
                    "/host/h1",
                    Err(QueryError::http(400, "name must not be empty")),
                );
                let store = store(&transport);

                let mut host = store
                    .use_query("findOneHost", host_args(), QueryOptions::default())
                    .unwrap();
                host.settled().await;

                let err = store
                    .use_mutation("updateHost")
                    .unwrap()
                    .trigger(json!({"params": {"host_uid": "h1"}, "body": {"name": ""}}))
                    .await
                    .unwrap_err();
                assert_eq!(err.status(), Some(400));

                let state = host.state();
                assert!(state.is_success());
                assert!(!state.is_stale);
                assert_eq!(transport.count("GET", "/host/h1"), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_manual_invalidation_after_out_of_band_delete() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                let event = |artists: Value| {
                    Ok(json!({"event_uid": "e1", "name": "Open Mic", "artists": artists}).to_string())
                };
                transport.respond(
                    "GET",
                    "/event/e1",
                    event(json!([{"event_artist_link_uid": "l1",
                                  "artist": {"artist_uid": "a1", "name": "Sam"}}])),
                );
                transport.respond("GET", "/event/e1", event(json!([])));
                transport.respond("DELETE", "/artist/a1", Ok(String::new()));
                let store = store(&transport);

                let mut event = store
                    .use_query(
                        "findOneEvent",
                        Args::new().param("event_uid", "e1").into(),
                        QueryOptions::default(),
                    )
                    .unwrap();
                event.settled().await;

                // deleteArtist only knows about the artist, not the events it played
                store
                    .use_mutation("deleteArtist")
                    .unwrap()
                    .trigger(Args::new().param("artist_uid", "a1").into())
                    .await
                    .unwrap();
                assert!(!event.state().is_stale);

                let matched = store.invalidate_tags(&[Tag::specific("Event", "e1")]);
                assert_eq!(matched, vec![event.fingerprint().clone()]);

                let state = event.settled().await;
                assert_eq!(state.data.unwrap()["artists"], json!([]));
            })
            .await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_two_consumers_share_venue_until_both_leave() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond(
                    "GET",
                    "/host/h1/venue/v1",
                    Ok(json!({"venue_uid": "v1", "name": "The Cellar"}).to_string()),
                );
                let store = store(&transport);
                let args = || -> Value {
                    Args::new()
                        .param("host_uid", "h1")
                        .param("venue_uid", "v1")
                        .into()
                };

                let mut first = store
                    .use_query("findOneVenue", args(), QueryOptions::default())
                    .unwrap();
                let mut second = store
                    .use_query("findOneVenue", args(), QueryOptions::default())
                    .unwrap();
                assert_eq!(first.settled().await, second.settled().await);
                assert_eq!(transport.count("GET", "/host/h1/venue/v1"), 1);

                let key = first.fingerprint().clone();
                drop(first);
                tokio::time::sleep(GRACE * 3).await;
                assert!(store.cache().contains(&key));

                drop(second);
                tokio::time::sleep(GRACE / 2).await;
                assert!(store.cache().contains(&key));
                tokio::time::sleep(GRACE).await;
                assert!(!store.cache().contains(&key));
                assert_eq!(store.cache().tagged_len(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_one_shot_query_reuses_cached_entry() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/host", Ok("[]".to_string()));
                let store = store(&transport);

                let first = store.query("findAllHosts", Value::Null).await.unwrap();
                let second = store.query("findAllHosts", Value::Null).await.unwrap();
                assert_eq!(first.data, Some(json!([])));
                assert_eq!(first, second);
                assert_eq!(transport.count("GET", "/host"), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_refetch_active_after_reconnect() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/host/h1", Ok(host_body(&[])));
                let store = store(&transport);

                let mut host = store
                    .use_query("findOneHost", host_args(), QueryOptions::default())
                    .unwrap();
                host.settled().await;

                assert_eq!(store.refetch_active(), 1);
                host.settled().await;
                assert_eq!(transport.count("GET", "/host/h1"), 2);
            })
            .await;
    }
}
