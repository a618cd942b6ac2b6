//! Cache configuration.
//!
//! Controls garbage collection of unused entries and the event channel via
//! the `[cache]` table of `storefront.toml`.

use std::time::Duration;

pub(crate) const DEFAULT_EVENT_CAPACITY: usize = 256;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is kept. `None` keeps entries
    /// for the life of the process.
    pub keep_unused_for: Option<Duration>,
    /// Cadence of the background sweeper when `keep_unused_for` is set.
    pub sweep_interval: Duration,
    /// Buffered events per listener before it starts lagging.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: None,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            keep_unused_for: settings.keep_unused_for,
            sweep_interval: settings.sweep_interval,
            event_capacity: settings.event_capacity.get(),
        }
    }
}

impl CacheConfig {
    /// Returns true if unused entries are ever evicted.
    pub fn evicts(&self) -> bool {
        self.keep_unused_for.is_some()
    }
}
