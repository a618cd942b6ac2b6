//! Storefront Resource Cache
//!
//! Declarative data fetching for the storefront API:
//!
//! - **Entries**: one per `CacheKey`, tracking value, freshness and error
//! - **Tags**: what each entry depends on, indexed so a write's invalidated
//!   tags resolve to exactly the entries it made stale
//! - **Dedup**: concurrent reads of a key share one in-flight request
//!
//! ## Configuration
//!
//! Eviction is controlled via `storefront.toml`:
//!
//! ```toml
//! [cache]
//! keep_unused_for_secs = 300   # omit to keep entries forever
//! sweep_interval_secs = 30
//! event_capacity = 256
//! ```

mod client;
mod config;
mod events;
mod keys;
pub(crate) mod lock;
mod registry;
mod store;
mod subscription;

pub use client::QueryClient;
pub use config::CacheConfig;
pub use events::{CacheEvent, Epoch, EventBus, EventKind};
pub use keys::{CacheKey, ResourceKind, Tag, TagId, TagType};
pub use registry::TagIndex;
pub use store::{CacheEntry, EntryChange, EntryStatus, QueryState, ResourceCache};
pub use subscription::{MutationHandle, MutationState, MutationStatus, Subscription};

pub(crate) use client::{
    METRIC_CACHE_DEDUP, METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED,
    METRIC_CACHE_MISS, METRIC_CACHE_RESET, METRIC_FETCH_ERROR, METRIC_FETCH_MS,
    METRIC_MUTATION_ERROR,
};
