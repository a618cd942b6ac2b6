//! Query client: the async face of the resource cache.
//!
//! Owns the cache, the in-flight table and the event bus behind one lock.
//! Fetches run as shared futures spawned onto the runtime, so concurrent
//! readers of a key share a single request and a fetch finishes (and is
//! stored) even if every reader goes away.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use storefront_api_types::SessionRecord;

use crate::api::{
    ApiError, EndpointSpec, Mutation, MutationHook, Query, RequestExecutor, Resource,
};
use crate::infra::storage::StorageError;
use crate::session::SessionStore;

use super::config::CacheConfig;
use super::events::{EventBus, EventKind};
use super::keys::{CacheKey, Tag, TagType};
use super::lock::mutex_lock;
use super::store::{EntryChange, EntryStatus, QueryState, ResourceCache};
use super::subscription::Subscription;

const TARGET: &str = "storefront::cache::client";

pub(crate) const METRIC_CACHE_HIT: &str = "storefront_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "storefront_cache_miss_total";
pub(crate) const METRIC_CACHE_DEDUP: &str = "storefront_cache_dedup_total";
pub(crate) const METRIC_CACHE_INVALIDATED: &str = "storefront_cache_invalidated_total";
pub(crate) const METRIC_CACHE_RESET: &str = "storefront_cache_reset_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "storefront_cache_evict_total";
pub(crate) const METRIC_FETCH_ERROR: &str = "storefront_fetch_error_total";
pub(crate) const METRIC_FETCH_MS: &str = "storefront_fetch_ms";
pub(crate) const METRIC_MUTATION_ERROR: &str = "storefront_mutation_error_total";

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Resource>, ApiError>>>;

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct ClientState {
    cache: ResourceCache,
    inflight: HashMap<CacheKey, InFlight>,
}

struct ClientInner {
    state: Mutex<ClientState>,
    executor: RequestExecutor,
    session: SessionStore,
    events: EventBus,
    config: CacheConfig,
}

/// Cheaply cloneable handle; clones share one cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl QueryClient {
    pub fn new(executor: RequestExecutor, session: SessionStore, config: CacheConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            inner: Arc::new(ClientInner {
                state: Mutex::new(ClientState::default()),
                executor,
                session,
                events,
                config,
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Current value for `query`, fetching unless the entry is fresh.
    ///
    /// Joins an in-flight fetch for the same key instead of issuing another.
    pub async fn read(&self, query: &Query) -> QueryState {
        let key = query.cache_key();
        let fetch = {
            let mut state = self.inner.lock("read");
            let entry = state.cache.ensure(query);
            if entry.status() == EntryStatus::Fresh {
                counter!(METRIC_CACHE_HIT, "kind" => key.kind().as_str()).increment(1);
                debug!(%key, "Cache hit");
                return entry.state();
            }
            self.inner.join_or_start(&mut state, query)
        };

        // Errors are already stored on the entry.
        let _ = fetch.await;
        self.snapshot(&key, query)
    }

    /// Fetch `query` again whatever its status, joining an in-flight fetch.
    pub async fn refetch(&self, query: &Query) -> QueryState {
        let fetch = {
            let mut state = self.inner.lock("refetch");
            self.inner.join_or_start(&mut state, query)
        };
        let _ = fetch.await;
        self.snapshot(&query.cache_key(), query)
    }

    /// Start observing `query`. The first subscriber of an idle, stale or
    /// errored entry triggers a fetch in the background.
    pub fn subscribe(&self, query: Query) -> Subscription {
        // Listen before fetching so the `Loading` transition is observed.
        let events = self.inner.events.subscribe();
        {
            let mut state = self.inner.lock("subscribe");
            let previous = state.cache.subscribe(&query);
            let needs_fetch = state
                .cache
                .get(&query.cache_key())
                .is_some_and(|entry| entry.status().needs_fetch());
            if previous == 0 && needs_fetch {
                // Spawned; the subscription observes it through events.
                let _fetch = self.inner.join_or_start(&mut state, &query);
            }
        }
        Subscription::new(self.clone(), query, events)
    }

    pub(crate) fn unsubscribe(&self, key: &CacheKey) {
        let remaining = self
            .inner
            .lock("unsubscribe")
            .cache
            .unsubscribe(key, Instant::now());
        debug!(%key, ?remaining, "Subscriber released");
    }

    /// Mark every entry providing any of `tags` stale and refetch the
    /// subscribed ones. Returns the affected keys.
    pub fn invalidate(&self, tags: &HashSet<Tag>) -> Vec<CacheKey> {
        if tags.is_empty() {
            return Vec::new();
        }
        let mut state = self.inner.lock("invalidate");
        let changes = state.cache.invalidate(tags);
        counter!(METRIC_CACHE_INVALIDATED).increment(changes.len() as u64);
        debug!(
            tags = ?tags.iter().map(Tag::to_string).collect::<Vec<_>>(),
            affected = changes.len(),
            "Tags invalidated"
        );
        self.inner.apply_changes(&mut state, &changes);
        changes.into_iter().map(|change| change.key).collect()
    }

    /// Run a write. On success its hook runs first, then its invalidations.
    pub async fn mutate(&self, mutation: &Mutation) -> Result<Arc<Resource>, ApiError> {
        let resource = match self.inner.executor.execute(mutation).await {
            Ok(resource) => Arc::new(resource),
            Err(err) => {
                counter!(METRIC_MUTATION_ERROR, "kind" => err.kind.as_str()).increment(1);
                warn!(
                    mutation = mutation.name(),
                    error = %err,
                    "Mutation failed"
                );
                return Err(err);
            }
        };

        if let Some(MutationHook::StoreSession) = mutation.hook() {
            match resource.as_session() {
                Some(record) => self.store_session(record.clone()).await,
                None => warn!("Session hook skipped: response carried no session record"),
            }
        }

        self.invalidate(&mutation.invalidates_tags(&resource));
        Ok(resource)
    }

    async fn store_session(&self, record: SessionRecord) {
        let previous = self.inner.session.mirror().user_id();
        let user_id = record.id.clone();
        if let Err(err) = self.inner.session.replace_session(record).await {
            warn!(error = %err, "Session kept in memory only; persisting failed");
        }
        if previous.as_deref() != Some(user_id.as_str()) {
            self.reset_session_scoped();
        }
        self.inner.events.publish(EventKind::SessionChanged {
            user_id: Some(user_id),
        });
    }

    /// Sign out: forget the session and every cached read that depended on it.
    pub async fn logout(&self) -> Result<(), StorageError> {
        let cleared = self.inner.session.clear_session().await;
        self.reset_session_scoped();
        self.inner
            .events
            .publish(EventKind::SessionChanged { user_id: None });
        cleared.map(|previous| {
            info!(
                user_id = previous.as_ref().map(|r| r.id.as_str()).unwrap_or("-"),
                "Logged out"
            );
        })
    }

    /// Return user and order entries to `Idle`, dropping their values and
    /// orphaning in-flight fetches. Subscribed entries refetch under the
    /// current session.
    pub fn reset_session_scoped(&self) -> Vec<CacheKey> {
        let mut state = self.inner.lock("reset_session_scoped");
        let changes = state
            .cache
            .reset_matching(|tag| matches!(tag.kind, TagType::User | TagType::Order));
        for change in &changes {
            state.inflight.remove(&change.key);
        }
        counter!(METRIC_CACHE_RESET).increment(changes.len() as u64);
        info!(reset = changes.len(), "Session-scoped cache entries reset");
        self.inner.apply_changes(&mut state, &changes);
        changes.into_iter().map(|change| change.key).collect()
    }

    pub fn peek(&self, key: &CacheKey) -> Option<QueryState> {
        self.inner.lock("peek").cache.state(key)
    }

    pub fn tags_for(&self, key: &CacheKey) -> HashSet<Tag> {
        self.inner.lock("tags_for").cache.index().tags_for(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock("len").cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock("in_flight").inflight.len()
    }

    /// Evict entries nobody has subscribed to for `keep_unused_for`.
    /// No-op when eviction is not configured.
    pub fn collect_garbage(&self, now: Instant) -> Vec<CacheKey> {
        self.inner.collect_garbage(now)
    }

    /// Run [`collect_garbage`](Self::collect_garbage) on the configured
    /// interval until the last client handle is dropped.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        if !self.inner.config.evicts() {
            return None;
        }
        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("Cache sweeper stopped");
                    break;
                };
                inner.collect_garbage(Instant::now());
            }
        }))
    }

    fn snapshot(&self, key: &CacheKey, query: &Query) -> QueryState {
        let mut state = self.inner.lock("snapshot");
        match state.cache.state(key) {
            Some(snapshot) => snapshot,
            None => state.cache.ensure(query).state(),
        }
    }
}

impl ClientInner {
    fn lock(&self, op: &'static str) -> std::sync::MutexGuard<'_, ClientState> {
        mutex_lock(&self.state, TARGET, op)
    }

    fn join_or_start(self: &Arc<Self>, state: &mut ClientState, query: &Query) -> SharedFetch {
        let key = query.cache_key();
        if let Some(inflight) = state.inflight.get(&key) {
            counter!(METRIC_CACHE_DEDUP, "kind" => key.kind().as_str()).increment(1);
            debug!(%key, "Joined in-flight fetch");
            return inflight.fetch.clone();
        }
        counter!(METRIC_CACHE_MISS, "kind" => key.kind().as_str()).increment(1);
        self.start_fetch(state, query)
    }

    fn start_fetch(self: &Arc<Self>, state: &mut ClientState, query: &Query) -> SharedFetch {
        let key = query.cache_key();
        let generation = state.cache.begin_fetch(query);
        self.events.publish(EventKind::EntryChanged {
            key: key.clone(),
            status: EntryStatus::Loading,
        });

        let inner = Arc::clone(self);
        let query = query.clone();
        let fetch = async move {
            let started = Instant::now();
            let result = inner.executor.execute(&query).await.map(Arc::new);
            histogram!(METRIC_FETCH_MS, "kind" => query.cache_key().kind().as_str())
                .record(started.elapsed().as_secs_f64() * 1000.0);
            inner.settle(&query, generation, &result);
            result
        }
        .boxed()
        .shared();

        state.inflight.insert(
            key.clone(),
            InFlight {
                generation,
                fetch: fetch.clone(),
            },
        );
        debug!(%key, generation, "Fetch started");
        tokio::spawn(fetch.clone());
        fetch
    }

    /// Store a fetch result. Runs exactly once per fetch, inside the shared
    /// future, whether or not anyone is still waiting.
    fn settle(
        self: &Arc<Self>,
        query: &Query,
        generation: u64,
        result: &Result<Arc<Resource>, ApiError>,
    ) {
        let key = query.cache_key();
        let mut state = self.lock("settle");
        if state
            .inflight
            .get(&key)
            .is_some_and(|inflight| inflight.generation == generation)
        {
            state.inflight.remove(&key);
        }

        let change = match result {
            Ok(value) => {
                let tags = query.provides_tags(Some(value));
                state.cache.complete(&key, generation, Arc::clone(value), tags)
            }
            Err(err) => {
                counter!(METRIC_FETCH_ERROR, "kind" => err.kind.as_str()).increment(1);
                warn!(%key, error = %err, "Fetch failed; keeping previous value");
                state
                    .cache
                    .fail(&key, generation, err.clone(), query.provides_tags(None))
            }
        };

        let Some(change) = change else {
            debug!(%key, generation, "Discarded outdated fetch result");
            return;
        };
        self.apply_changes(&mut state, std::slice::from_ref(&change));
    }

    /// Publish entry transitions and refetch the subscribed entries that
    /// need it.
    fn apply_changes(self: &Arc<Self>, state: &mut ClientState, changes: &[EntryChange]) {
        for change in changes {
            self.events.publish(EventKind::EntryChanged {
                key: change.key.clone(),
                status: change.status,
            });
        }

        for change in changes {
            let refetch = change.subscribers > 0
                && matches!(change.status, EntryStatus::Stale | EntryStatus::Idle)
                && !state.inflight.contains_key(&change.key);
            if !refetch {
                continue;
            }
            let Some(query) = state.cache.get(&change.key).map(|e| e.query().clone()) else {
                continue;
            };
            let _fetch = self.start_fetch(state, &query);
        }
    }

    fn collect_garbage(&self, now: Instant) -> Vec<CacheKey> {
        let Some(keep_for) = self.config.keep_unused_for else {
            return Vec::new();
        };
        let evicted = self.lock("collect_garbage").cache.evict_idle(now, keep_for);
        if !evicted.is_empty() {
            counter!(METRIC_CACHE_EVICT).increment(evicted.len() as u64);
            info!(evicted = evicted.len(), "Evicted unused cache entries");
        }
        for key in &evicted {
            self.events.publish(EventKind::Evicted { key: key.clone() });
        }
        evicted
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
