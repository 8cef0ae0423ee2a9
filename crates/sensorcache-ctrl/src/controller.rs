//! Cache controller
//!
//! Owns the current [`CacheStore`] and serializes every write behind one
//! gate. Readers never touch the gate: [`CacheController::get_cache`] hands
//! out the currently published snapshot.
//!
//! Writers publish whole stores. An incremental update runs against a copy
//! of the current store which is published when the update returns, failed
//! or not, so partial mutations stay (there is no rollback) while readers
//! still only ever see stores between two updates. A complete update builds
//! a fresh store and publishes it only on success.
//!
//! The copy is a deep clone, so an incremental update costs time and memory
//! proportional to the whole store, not to the entities it touches.
//!
//! Updates are not timed out: a data source call that never returns blocks
//! the write path until it does.

use crate::action::{CompleteCacheUpdate, CompleteCacheUpdateFactory, UpdateAction, WritableCache};
use crate::persistence::{CachePersistenceStrategy, NoOpPersistence};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sensorcache_common::{CacheConfig, Result};
use sensorcache_store::CacheStore;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Update counters of a controller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    pub incremental_updates: u64,
    pub complete_updates: u64,
    pub failed_updates: u64,
    pub last_complete_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Counters {
    incremental: AtomicU64,
    complete: AtomicU64,
    failed: AtomicU64,
    last_complete: Mutex<Option<DateTime<Utc>>>,
}

pub struct CacheController {
    current: ArcSwap<CacheStore>,
    gate: tokio::sync::Mutex<()>,
    config: CacheConfig,
    factory: Box<dyn CompleteCacheUpdateFactory>,
    persistence: Arc<dyn CachePersistenceStrategy>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    counters: Counters,
}

impl CacheController {
    /// Create a controller with an empty cache
    ///
    /// Fails with a configuration error if `config` does not validate.
    pub fn new(
        config: CacheConfig,
        factory: impl CompleteCacheUpdateFactory + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            current: ArcSwap::from_pointee(CacheStore::new()),
            gate: tokio::sync::Mutex::new(()),
            config,
            factory: Box::new(factory),
            persistence: Arc::new(NoOpPersistence),
            scheduler: Mutex::new(None),
            counters: Counters::default(),
        })
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn CachePersistenceStrategy>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Load the persisted cache or build one, then start the scheduler
    pub async fn init(self: &Arc<Self>) -> Result<()> {
        let loaded = match self.persistence.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Failed to load persisted cache, rebuilding it: {}", e);
                None
            }
        };
        match loaded {
            Some(store) => {
                let _gate = self.gate.lock().await;
                info!(
                    "Loaded cache with {} offerings from {} persistence",
                    store.get_offerings().len(),
                    self.persistence.name()
                );
                self.current.store(Arc::new(store));
            }
            None => self.update_complete().await?,
        }
        self.start_scheduler();
        Ok(())
    }

    /// Current cache snapshot. Never waits for a running update.
    pub fn get_cache(&self) -> Arc<CacheStore> {
        self.current.load_full()
    }

    /// Run an update behind the write gate
    pub async fn update(&self, action: UpdateAction) -> Result<()> {
        let _gate = self.gate.lock().await;
        let name = action.name().to_string();
        let started = Instant::now();
        debug!("Starting cache update {}", name);

        let result = match action {
            UpdateAction::Complete(update) => self.run_complete(update.as_ref()).await,
            UpdateAction::Incremental(update) => {
                let cache = self.writable_copy();
                let result = update.execute(&cache).await;
                self.publish(cache, &name, result)
            }
            UpdateAction::Parallel(batch) => {
                let cache = self.writable_copy();
                let result = batch.execute(&cache).await;
                self.publish(cache, &name, result)
            }
        };

        debug!(
            "Finished cache update {} in {:?}",
            name,
            started.elapsed()
        );
        result
    }

    /// Rebuild the cache with a complete update from the factory
    pub async fn update_complete(&self) -> Result<()> {
        self.update(UpdateAction::Complete(self.factory.create()))
            .await
    }

    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            incremental_updates: self.counters.incremental.load(Ordering::Relaxed),
            complete_updates: self.counters.complete.load(Ordering::Relaxed),
            failed_updates: self.counters.failed.load(Ordering::Relaxed),
            last_complete_update: *self.counters.last_complete.lock(),
        }
    }

    /// Start the periodic complete update, if an interval is configured
    pub fn start_scheduler(self: &Arc<Self>) {
        let Some(period) = self.config.update_interval() else {
            debug!("Periodic cache updates disabled");
            return;
        };
        let handle = tokio::spawn(scheduler_loop(Arc::downgrade(self), period));
        let previous = self.scheduler.lock().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        info!("Scheduled complete cache updates every {:?}", period);
    }

    /// Stop the scheduler, wait for the running update and persist the cache
    pub async fn close(&self) -> Result<()> {
        let scheduler = self.scheduler.lock().take();
        if let Some(handle) = scheduler {
            handle.abort();
        }
        let _gate = self.gate.lock().await;
        let store = self.current.load_full();
        self.persistence.save(&store).await?;
        info!("Cache controller closed");
        Ok(())
    }

    fn writable_copy(&self) -> WritableCache {
        WritableCache::new(CacheStore::clone(&self.current.load()))
    }

    fn publish(&self, cache: WritableCache, name: &str, result: Result<()>) -> Result<()> {
        self.current.store(Arc::new(cache.into_inner()));
        self.counters.incremental.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = &result {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!("Cache update {} failed: {}", name, e);
        }
        result
    }

    async fn run_complete(&self, update: &dyn CompleteCacheUpdate) -> Result<()> {
        let store = match update.build().await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Complete cache update {} failed, keeping the previous cache: {}",
                    update.name(),
                    e
                );
                return Err(e);
            }
        };

        self.current.store(Arc::clone(&store));
        self.counters.complete.fetch_add(1, Ordering::Relaxed);
        *self.counters.last_complete.lock() = Some(Utc::now());
        info!(
            "Complete cache update {} published {} offerings",
            update.name(),
            store.get_offerings().len()
        );

        if let Err(e) = self.persistence.save(&store).await {
            error!("Failed to persist cache: {}", e);
        }
        Ok(())
    }
}

impl Drop for CacheController {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.get_mut().take() {
            handle.abort();
        }
    }
}

async fn scheduler_loop(controller: Weak<CacheController>, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(controller) = controller.upgrade() else {
            break;
        };
        // failures are logged by the update itself
        let _ = controller.update_complete().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::CacheUpdate;
    use crate::persistence::JsonFilePersistence;
    use async_trait::async_trait;
    use sensorcache_common::Error;
    use std::sync::atomic::AtomicUsize;

    /// Complete update producing a store with one offering after a delay
    #[derive(Debug)]
    struct FixedComplete {
        offering: String,
        delay: Duration,
        fail: bool,
        windows: Option<Windows>,
    }

    #[async_trait]
    impl CompleteCacheUpdate for FixedComplete {
        fn name(&self) -> &str {
            "FixedComplete"
        }

        async fn build(&self) -> Result<CacheStore> {
            let started = Instant::now();
            tokio::time::sleep(self.delay).await;
            if let Some(windows) = &self.windows {
                windows.lock().push((started, Instant::now()));
            }
            if self.fail {
                return Err(Error::data_access("data source down"));
            }
            let mut store = CacheStore::new();
            store.add_offering(&self.offering);
            Ok(store)
        }
    }

    type Windows = Arc<Mutex<Vec<(Instant, Instant)>>>;

    #[derive(Clone, Default)]
    struct CountingFactory {
        builds: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CompleteCacheUpdateFactory for CountingFactory {
        fn create(&self) -> Box<dyn CompleteCacheUpdate> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst);
            Box::new(FixedComplete {
                offering: format!("built-{n}"),
                delay: Duration::ZERO,
                fail: self.fail,
                windows: None,
            })
        }
    }

    /// Incremental update adding an offering, recording when it ran
    #[derive(Debug)]
    struct Recording {
        offering: String,
        delay: Duration,
        fail: bool,
        windows: Windows,
    }

    #[async_trait]
    impl CacheUpdate for Recording {
        fn name(&self) -> &str {
            "Recording"
        }

        async fn execute(&self, cache: &WritableCache) -> Result<()> {
            let started = Instant::now();
            cache.write(|store| store.add_offering(&self.offering));
            tokio::time::sleep(self.delay).await;
            self.windows.lock().push((started, Instant::now()));
            if self.fail {
                return Err(Error::data_access("gateway failed"));
            }
            Ok(())
        }
    }

    fn controller() -> Arc<CacheController> {
        Arc::new(CacheController::new(CacheConfig::default(), CountingFactory::default()).unwrap())
    }

    fn slow_complete(offering: &str, delay_ms: u64, windows: Option<Windows>) -> UpdateAction {
        UpdateAction::complete(FixedComplete {
            offering: offering.into(),
            delay: Duration::from_millis(delay_ms),
            fail: false,
            windows,
        })
    }

    fn recording(offering: &str, delay_ms: u64, windows: &Windows) -> UpdateAction {
        UpdateAction::incremental(Recording {
            offering: offering.into(),
            delay: Duration::from_millis(delay_ms),
            fail: false,
            windows: Arc::clone(windows),
        })
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let config = CacheConfig {
            thread_count: 0,
            ..CacheConfig::default()
        };
        let err = CacheController::new(config, CountingFactory::default()).err();
        assert!(matches!(err, Some(Error::Configuration(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_incremental_waits_for_running_complete() {
        let controller = controller();
        let windows = Windows::default();

        let submitted = Instant::now();
        let c = Arc::clone(&controller);
        let complete = tokio::spawn(async move { c.update(slow_complete("full", 500, None)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let c = Arc::clone(&controller);
        let w = Arc::clone(&windows);
        let incremental = tokio::spawn(async move { c.update(recording("inc", 0, &w)).await });

        complete.await.unwrap().unwrap();
        incremental.await.unwrap().unwrap();

        let (applied, _) = windows.lock()[0];
        assert!(applied.duration_since(submitted) >= Duration::from_millis(500));
        // the incremental update ran on top of the rebuilt store
        let store = controller.get_cache();
        assert!(store.has_offering("full"));
        assert!(store.has_offering("inc"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_execution_windows_never_overlap() {
        let controller = controller();
        let windows = Windows::default();

        let mut handles = Vec::new();
        for i in 0..8 {
            let action = if i % 3 == 0 {
                slow_complete(&format!("c{i}"), 20, Some(Arc::clone(&windows)))
            } else {
                recording(&format!("i{i}"), 10, &windows)
            };
            let c = Arc::clone(&controller);
            handles.push(tokio::spawn(async move { c.update(action).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut windows = windows.lock().clone();
        assert_eq!(windows.len(), 8);
        windows.sort_by_key(|(start, _)| *start);
        for pair in windows.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "update windows overlap");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_not_blocked_and_see_whole_stores() {
        let controller = controller();
        controller
            .update(slow_complete("old", 0, None))
            .await
            .unwrap();

        let c = Arc::clone(&controller);
        let rebuild = tokio::spawn(async move { c.update(slow_complete("new", 300, None)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let during = controller.get_cache();
        assert!(started.elapsed() < Duration::from_millis(50));
        assert!(during.has_offering("old"));
        assert!(!during.has_offering("new"));

        rebuild.await.unwrap().unwrap();
        let after = controller.get_cache();
        assert!(after.has_offering("new"));
        assert!(!after.has_offering("old"));
        // the earlier snapshot is unaffected
        assert!(during.has_offering("old"));
    }

    #[tokio::test]
    async fn test_failed_complete_keeps_previous_store() {
        let controller = controller();
        controller
            .update(slow_complete("old", 0, None))
            .await
            .unwrap();

        let failing = UpdateAction::complete(FixedComplete {
            offering: "new".into(),
            delay: Duration::ZERO,
            fail: true,
            windows: None,
        });
        let err = controller.update(failing).await.unwrap_err();
        assert!(err.is_data_access());
        assert!(controller.get_cache().has_offering("old"));

        let stats = controller.stats();
        assert_eq!(stats.complete_updates, 1);
        assert_eq!(stats.failed_updates, 1);
        assert!(stats.last_complete_update.is_some());
    }

    #[tokio::test]
    async fn test_incremental_update_leaves_earlier_snapshot_untouched() {
        let controller = controller();
        let windows = Windows::default();
        controller.update(recording("first", 0, &windows)).await.unwrap();

        let before = controller.get_cache();
        controller.update(recording("second", 0, &windows)).await.unwrap();
        let after = controller.get_cache();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.get_offerings().len(), 1);
        assert_eq!(after.get_offerings().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_incremental_keeps_partial_mutations() {
        let controller = controller();
        let failing = UpdateAction::incremental(Recording {
            offering: "partial".into(),
            delay: Duration::ZERO,
            fail: true,
            windows: Windows::default(),
        });
        assert!(controller.update(failing).await.is_err());
        assert!(controller.get_cache().has_offering("partial"));
        assert_eq!(controller.stats().failed_updates, 1);
        assert_eq!(controller.stats().incremental_updates, 1);
    }

    #[tokio::test]
    async fn test_init_builds_when_nothing_persisted_and_close_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let factory = CountingFactory::default();
        let controller = Arc::new(
            CacheController::new(CacheConfig::default(), factory.clone())
                .unwrap()
                .with_persistence(Arc::new(JsonFilePersistence::new(&path))),
        );

        controller.init().await.unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
        assert!(controller.get_cache().has_offering("built-0"));
        controller.close().await.unwrap();

        // a second controller starts from the snapshot
        let factory = CountingFactory::default();
        let restarted = Arc::new(
            CacheController::new(CacheConfig::default(), factory.clone())
                .unwrap()
                .with_persistence(Arc::new(JsonFilePersistence::new(&path))),
        );
        restarted.init().await.unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
        assert!(restarted.get_cache().has_offering("built-0"));
    }

    #[tokio::test]
    async fn test_init_propagates_build_failure() {
        let factory = CountingFactory {
            fail: true,
            ..CountingFactory::default()
        };
        let controller = Arc::new(CacheController::new(CacheConfig::default(), factory).unwrap());
        assert!(controller.init().await.is_err());
        assert!(controller.get_cache().get_offerings().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scheduler_runs_complete_updates() {
        let factory = CountingFactory::default();
        let config = CacheConfig {
            update_interval_secs: 1,
            ..CacheConfig::default()
        };
        let controller = Arc::new(CacheController::new(config, factory.clone()).unwrap());
        controller.start_scheduler();

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
        assert_eq!(controller.stats().complete_updates, 1);

        controller.close().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_does_nothing() {
        let controller = controller();
        controller.start_scheduler();
        assert!(controller.scheduler.lock().is_none());
    }
}
