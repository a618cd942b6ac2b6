//! Resource cache storage.
//!
//! Holds one `CacheEntry` per `CacheKey` plus the tag index, and implements
//! the entry state machine. Everything here is synchronous; the query client
//! wraps it in a single lock so entries and index always change together.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{ApiError, Query, Resource};

use super::keys::{CacheKey, Tag};
use super::registry::TagIndex;

/// Freshness of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Known key, never fetched (or reset after logout).
    Idle,
    /// A fetch is in flight. A previous value, if any, is still served.
    Loading,
    Fresh,
    /// Invalidated by a write; value kept until the refetch lands.
    Stale,
    /// Last fetch failed. A previous value, if any, is kept.
    Errored,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
            Self::Errored => "errored",
        }
    }

    /// Whether a read or a new subscriber should start a fetch.
    pub fn needs_fetch(self) -> bool {
        matches!(self, Self::Idle | Self::Stale | Self::Errored)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: CacheKey,
    query: Query,
    status: EntryStatus,
    value: Option<Arc<Resource>>,
    error: Option<ApiError>,
    subscribers: usize,
    /// Replaced on reset; a fetch settling with another generation is dropped.
    /// Unique across the cache so a recreated entry never matches an orphan.
    generation: u64,
    invalidated_in_flight: bool,
    idle_since: Option<Instant>,
}

impl CacheEntry {
    fn new(query: &Query, generation: u64) -> Self {
        Self {
            key: query.cache_key(),
            query: query.clone(),
            status: EntryStatus::Idle,
            value: None,
            error: None,
            subscribers: 0,
            generation,
            invalidated_in_flight: false,
            idle_since: Some(Instant::now()),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn value(&self) -> Option<&Arc<Resource>> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn subscribers(&self) -> usize {
        self.subscribers
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> QueryState {
        QueryState {
            key: self.key.clone(),
            status: self.status,
            data: self.value.clone(),
            error: self.error.clone(),
        }
    }
}

/// Point-in-time view of one cache entry, as handed to subscribers.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub key: CacheKey,
    pub status: EntryStatus,
    pub data: Option<Arc<Resource>>,
    pub error: Option<ApiError>,
}

impl QueryState {
    /// First load: fetching with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == EntryStatus::Loading && self.data.is_none()
    }

    /// Any fetch in flight, including background revalidation.
    pub fn is_fetching(&self) -> bool {
        self.status == EntryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == EntryStatus::Errored
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, EntryStatus::Fresh | EntryStatus::Stale)
    }
}

/// Outcome of applying an invalidation to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange {
    pub key: CacheKey,
    pub status: EntryStatus,
    pub subscribers: usize,
}

/// In-memory resource cache: entries plus the tag index they feed.
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: HashMap<CacheKey, CacheEntry>,
    index: TagIndex,
    generations: u64,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn state(&self, key: &CacheKey) -> Option<QueryState> {
        self.entries.get(key).map(CacheEntry::state)
    }

    /// Entry for `query`, created `Idle` on first sight.
    pub fn ensure(&mut self, query: &Query) -> &CacheEntry {
        self.entry_mut(query)
    }

    fn entry_mut(&mut self, query: &Query) -> &mut CacheEntry {
        let generations = &mut self.generations;
        self.entries.entry(query.cache_key()).or_insert_with(|| {
            *generations += 1;
            CacheEntry::new(query, *generations)
        })
    }

    /// Move the entry to `Loading`, returning the generation the fetch
    /// must present when it settles.
    ///
    /// The tags the endpoint provides regardless of its result are indexed
    /// right away, so a first fetch is reachable by writes and resets while
    /// it is still in flight.
    pub fn begin_fetch(&mut self, query: &Query) -> u64 {
        let key = query.cache_key();
        let baseline = query.provides_tags(None);
        if !baseline.is_empty() {
            let mut provided = self.index.tags_for(&key);
            provided.extend(baseline);
            self.index.register(key, provided);
        }

        let entry = self.entry_mut(query);
        entry.status = EntryStatus::Loading;
        entry.invalidated_in_flight = false;
        if entry.subscribers == 0 {
            entry.idle_since = Some(Instant::now());
        }
        entry.generation
    }

    /// Store a successful fetch. Returns `None` when the fetch is outdated
    /// (entry reset or evicted while it was in flight).
    pub fn complete(
        &mut self,
        key: &CacheKey,
        generation: u64,
        value: Arc<Resource>,
        tags: HashSet<Tag>,
    ) -> Option<EntryChange> {
        let entry = self.entries.get_mut(key)?;
        if entry.generation != generation {
            return None;
        }

        entry.status = if entry.invalidated_in_flight {
            EntryStatus::Stale
        } else {
            EntryStatus::Fresh
        };
        entry.invalidated_in_flight = false;
        entry.value = Some(value);
        entry.error = None;
        let change = EntryChange {
            key: key.clone(),
            status: entry.status,
            subscribers: entry.subscribers,
        };

        self.index.register(key.clone(), tags);
        Some(change)
    }

    /// Store a failed fetch, keeping any previous value readable.
    ///
    /// `tags` are the tags the endpoint provides without a result; they are
    /// added to whatever the entry already provides so a later write can
    /// still reach it.
    pub fn fail(
        &mut self,
        key: &CacheKey,
        generation: u64,
        error: ApiError,
        tags: HashSet<Tag>,
    ) -> Option<EntryChange> {
        let entry = self.entries.get_mut(key)?;
        if entry.generation != generation {
            return None;
        }

        entry.status = EntryStatus::Errored;
        entry.invalidated_in_flight = false;
        entry.error = Some(error);
        let change = EntryChange {
            key: key.clone(),
            status: entry.status,
            subscribers: entry.subscribers,
        };

        let mut provided = self.index.tags_for(key);
        provided.extend(tags);
        self.index.register(key.clone(), provided);
        Some(change)
    }

    /// Mark every entry providing any of `tags` as stale.
    ///
    /// Entries still loading are flagged so their result lands as `Stale`.
    pub fn invalidate(&mut self, tags: &HashSet<Tag>) -> Vec<EntryChange> {
        let mut keys: Vec<CacheKey> = self.index.keys_for(tags).into_iter().collect();
        keys.sort();

        let mut changes = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            match entry.status {
                EntryStatus::Fresh => entry.status = EntryStatus::Stale,
                EntryStatus::Errored if entry.value.is_some() => {
                    entry.status = EntryStatus::Stale;
                }
                EntryStatus::Errored => entry.status = EntryStatus::Idle,
                EntryStatus::Loading => entry.invalidated_in_flight = true,
                EntryStatus::Stale | EntryStatus::Idle => {}
            }
            changes.push(EntryChange {
                key,
                status: entry.status,
                subscribers: entry.subscribers,
            });
        }
        changes
    }

    /// Drop the value of every entry providing a tag accepted by
    /// `predicate`, returning them to `Idle`. In-flight fetches for those
    /// entries are orphaned by the generation bump.
    pub fn reset_matching(&mut self, predicate: impl Fn(&Tag) -> bool) -> Vec<EntryChange> {
        let mut keys: Vec<CacheKey> = self.index.keys_matching(predicate).into_iter().collect();
        keys.sort();

        let mut changes = Vec::with_capacity(keys.len());
        for key in keys {
            self.index.unregister(&key);
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            entry.status = EntryStatus::Idle;
            entry.value = None;
            entry.error = None;
            entry.invalidated_in_flight = false;
            self.generations += 1;
            entry.generation = self.generations;
            changes.push(EntryChange {
                key,
                status: entry.status,
                subscribers: entry.subscribers,
            });
        }
        changes
    }

    /// Register a subscriber, returning the previous subscriber count.
    pub fn subscribe(&mut self, query: &Query) -> usize {
        let entry = self.entry_mut(query);
        let previous = entry.subscribers;
        entry.subscribers += 1;
        entry.idle_since = None;
        previous
    }

    /// Drop a subscriber, returning the remaining count.
    pub fn unsubscribe(&mut self, key: &CacheKey, now: Instant) -> Option<usize> {
        let entry = self.entries.get_mut(key)?;
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers == 0 {
            entry.idle_since = Some(now);
        }
        Some(entry.subscribers)
    }

    /// Evict unsubscribed entries idle for at least `keep_for`.
    ///
    /// Loading entries are never evicted so their result has a home.
    pub fn evict_idle(&mut self, now: Instant, keep_for: Duration) -> Vec<CacheKey> {
        let expired: Vec<CacheKey> = self
            .entries
            .values()
            .filter(|entry| {
                entry.subscribers == 0
                    && entry.status != EntryStatus::Loading
                    && entry
                        .idle_since
                        .is_some_and(|since| now.saturating_duration_since(since) >= keep_for)
            })
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.index.unregister(key);
        }
        expired
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use storefront_api_types::{Product, ProductPage};

    use super::*;
    use crate::api::ApiErrorKind;
    use crate::cache::keys::TagType;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            image: String::new(),
            brand: String::new(),
            category: String::new(),
            description: String::new(),
            price: 10.0,
            count_in_stock: 3,
            rating: 0.0,
            num_reviews: 0,
            reviews: Vec::new(),
        }
    }

    fn fetch_ok(cache: &mut ResourceCache, query: &Query, value: Resource) -> EntryChange {
        let generation = cache.begin_fetch(query);
        let tags = query.provides_tags(Some(&value));
        cache
            .complete(&query.cache_key(), generation, Arc::new(value), tags)
            .expect("current generation")
    }

    fn list_query(page: u32) -> Query {
        Query::ListProducts {
            keyword: String::new(),
            page: Some(page),
        }
    }

    fn page_of(ids: &[&str]) -> Resource {
        Resource::ProductPage(ProductPage {
            products: ids.iter().map(|id| product(id)).collect(),
            page: 1,
            pages: 1,
        })
    }

    #[test]
    fn new_entries_start_idle_without_value() {
        let mut cache = ResourceCache::new();
        let entry = cache.ensure(&Query::TopProducts);
        assert_eq!(entry.status(), EntryStatus::Idle);
        assert!(entry.value().is_none());
    }

    #[test]
    fn successful_fetch_is_fresh_and_indexed() {
        let mut cache = ResourceCache::new();
        let query = list_query(1);

        let change = fetch_ok(&mut cache, &query, page_of(&["a", "b"]));

        assert_eq!(change.status, EntryStatus::Fresh);
        let tags = cache.index().tags_for(&query.cache_key());
        assert!(tags.contains(&Tag::list(TagType::Product)));
        assert!(tags.contains(&Tag::id(TagType::Product, "a")));
        assert!(tags.contains(&Tag::id(TagType::Product, "b")));
    }

    #[test]
    fn failure_keeps_previous_value() {
        let mut cache = ResourceCache::new();
        let query = Query::ProductDetails { id: "a".into() };
        fetch_ok(&mut cache, &query, Resource::Product(product("a")));

        let generation = cache.begin_fetch(&query);
        let change = cache
            .fail(
                &query.cache_key(),
                generation,
                ApiError::network("connection refused"),
                query.provides_tags(None),
            )
            .expect("current generation");

        assert_eq!(change.status, EntryStatus::Errored);
        let state = cache.state(&query.cache_key()).expect("entry");
        assert!(state.data.is_some());
        assert_eq!(
            state.error.map(|error| error.kind),
            Some(ApiErrorKind::Network)
        );
    }

    #[test]
    fn invalidate_marks_only_matching_entries_stale() {
        let mut cache = ResourceCache::new();
        let seven = Query::ProductDetails { id: "7".into() };
        let forty_two = Query::ProductDetails { id: "42".into() };
        fetch_ok(&mut cache, &seven, Resource::Product(product("7")));
        fetch_ok(&mut cache, &forty_two, Resource::Product(product("42")));

        let changes = cache.invalidate(&HashSet::from([Tag::id(TagType::Product, "42")]));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, forty_two.cache_key());
        assert_eq!(
            cache.get(&forty_two.cache_key()).map(CacheEntry::status),
            Some(EntryStatus::Stale)
        );
        assert_eq!(
            cache.get(&seven.cache_key()).map(CacheEntry::status),
            Some(EntryStatus::Fresh)
        );
    }

    #[test]
    fn invalidation_during_fetch_lands_stale() {
        let mut cache = ResourceCache::new();
        let query = list_query(1);
        fetch_ok(&mut cache, &query, page_of(&["a"]));

        let generation = cache.begin_fetch(&query);
        cache.invalidate(&HashSet::from([Tag::list(TagType::Product)]));
        let value = page_of(&["a"]);
        let tags = query.provides_tags(Some(&value));
        let change = cache
            .complete(&query.cache_key(), generation, Arc::new(value), tags)
            .expect("current generation");

        assert_eq!(change.status, EntryStatus::Stale);
    }

    #[test]
    fn reset_orphans_in_flight_fetch() {
        let mut cache = ResourceCache::new();
        let query = Query::MyOrders;
        let generation = cache.begin_fetch(&query);
        cache.fail(
            &query.cache_key(),
            generation,
            ApiError::network("offline"),
            query.provides_tags(None),
        );

        let generation = cache.begin_fetch(&query);
        let reset = cache.reset_matching(|tag| tag.kind == TagType::Order);
        assert_eq!(reset.len(), 1);

        let late = cache.complete(
            &query.cache_key(),
            generation,
            Arc::new(Resource::Orders(Vec::new())),
            HashSet::new(),
        );
        assert!(late.is_none());
        let entry = cache.get(&query.cache_key()).expect("entry kept");
        assert_eq!(entry.status(), EntryStatus::Idle);
        assert!(entry.value().is_none());
    }

    #[test]
    fn recreated_entry_rejects_orphaned_fetch() {
        let mut cache = ResourceCache::new();
        let query = Query::MyOrders;
        let orphan = cache.begin_fetch(&query);
        cache.reset_matching(|tag| tag.kind == TagType::Order);
        cache.fail(
            &query.cache_key(),
            orphan,
            ApiError::network("offline"),
            HashSet::new(),
        );
        cache.evict_idle(Instant::now(), Duration::ZERO);
        assert!(cache.is_empty());

        let current = cache.begin_fetch(&query);
        assert_ne!(current, orphan);
        let late = cache.complete(
            &query.cache_key(),
            orphan,
            Arc::new(Resource::Orders(Vec::new())),
            HashSet::new(),
        );
        assert!(late.is_none());
    }

    #[test]
    fn evict_idle_skips_subscribed_and_loading_entries() {
        let mut cache = ResourceCache::new();
        let subscribed = Query::ProductDetails { id: "s".into() };
        let idle = Query::ProductDetails { id: "i".into() };
        let loading = Query::TopProducts;

        fetch_ok(&mut cache, &subscribed, Resource::Product(product("s")));
        cache.subscribe(&subscribed);
        fetch_ok(&mut cache, &idle, Resource::Product(product("i")));
        cache.begin_fetch(&loading);

        let evicted = cache.evict_idle(Instant::now(), Duration::ZERO);

        assert_eq!(evicted, vec![idle.cache_key()]);
        assert!(cache.get(&idle.cache_key()).is_none());
        assert!(cache.index().tags_for(&idle.cache_key()).is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn unsubscribe_saturates_at_zero() {
        let mut cache = ResourceCache::new();
        let query = Query::TopProducts;
        assert_eq!(cache.subscribe(&query), 0);
        assert_eq!(cache.subscribe(&query), 1);
        let key = query.cache_key();
        assert_eq!(cache.unsubscribe(&key, Instant::now()), Some(1));
        assert_eq!(cache.unsubscribe(&key, Instant::now()), Some(0));
        assert_eq!(cache.unsubscribe(&key, Instant::now()), Some(0));
    }
}
