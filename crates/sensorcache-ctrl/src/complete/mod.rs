//! Complete cache update
//!
//! Builds a new store from nothing in four phases. Each phase is a join
//! barrier because the next one reads what it wrote:
//!
//! ```text
//!   1. independent fetch   (properties, features, related features,
//!                           result templates, global time; concurrent)
//!   2. i18n                (names and descriptions; sequential)
//!   3. offerings           (one task per offering, thread_count at a time)
//!   4. procedures          (one task per procedure, thread_count at a time,
//!                           including their localized names)
//! ```
//!
//! The global envelope and times are then derived from the offerings and
//! the result is checked with [`CacheStore::validate`].

pub mod fetch;
pub mod i18n;
pub mod offering;
pub mod procedure;

use crate::action::{CompleteCacheUpdate, CompleteCacheUpdateFactory, WritableCache};
use crate::gateway::DataSourceGateway;
use async_trait::async_trait;
use sensorcache_common::{CacheConfig, Result};
use sensorcache_store::CacheStore;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct InitialCacheUpdate {
    gateway: Arc<dyn DataSourceGateway>,
    thread_count: usize,
    default_locale: String,
}

impl InitialCacheUpdate {
    pub fn new(
        gateway: Arc<dyn DataSourceGateway>,
        thread_count: usize,
        default_locale: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            thread_count,
            default_locale: default_locale.into(),
        }
    }
}

impl fmt::Debug for InitialCacheUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialCacheUpdate")
            .field("thread_count", &self.thread_count)
            .field("default_locale", &self.default_locale)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompleteCacheUpdate for InitialCacheUpdate {
    fn name(&self) -> &str {
        "InitialCacheUpdate"
    }

    async fn build(&self) -> Result<CacheStore> {
        let gateway = self.gateway.as_ref();
        let cache = WritableCache::default();

        let started = Instant::now();
        let fetched_times = fetch::update_independent(gateway, &cache).await?;
        debug!("Independent updates took {:?}", started.elapsed());

        let phase = Instant::now();
        let offerings = gateway.fetch_offerings().await?;
        i18n::update_i18n(gateway, &cache, &offerings, &self.default_locale).await?;
        debug!("I18n update took {:?}", phase.elapsed());

        let phase = Instant::now();
        offering::update_offerings(gateway, &cache, &offerings, self.thread_count).await?;
        debug!("Offering update took {:?}", phase.elapsed());

        let phase = Instant::now();
        procedure::update_procedures(gateway, &cache, self.thread_count, &self.default_locale)
            .await?;
        debug!("Procedure update took {:?}", phase.elapsed());

        let mut store = cache.into_inner();
        store.reconcile_global_times(fetched_times.phenomenon_time, fetched_times.result_time);
        store.validate()?;

        info!(
            "Built cache with {} offerings and {} procedures in {:?}",
            store.get_offerings().len(),
            store.get_procedures().len(),
            started.elapsed()
        );
        Ok(store)
    }
}

/// Creates [`InitialCacheUpdate`]s against one gateway
pub struct InitialCacheUpdateFactory {
    gateway: Arc<dyn DataSourceGateway>,
    thread_count: usize,
    default_locale: String,
}

impl InitialCacheUpdateFactory {
    pub fn new(gateway: Arc<dyn DataSourceGateway>, config: &CacheConfig) -> Self {
        Self {
            gateway,
            thread_count: config.thread_count,
            default_locale: config.default_locale.clone(),
        }
    }
}

impl CompleteCacheUpdateFactory for InitialCacheUpdateFactory {
    fn create(&self) -> Box<dyn CompleteCacheUpdate> {
        Box::new(InitialCacheUpdate::new(
            Arc::clone(&self.gateway),
            self.thread_count,
            self.default_locale.clone(),
        ))
    }
}
