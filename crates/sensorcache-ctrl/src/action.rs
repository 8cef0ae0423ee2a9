//! Cache update actions
//!
//! An [`UpdateAction`] is what the controller runs behind its write gate:
//!
//! - `Incremental`: a bounded sequence of store mutations built from the data
//!   of one transactional request
//! - `Parallel`: independent incremental updates run concurrently against
//!   the same store, failures collected into one aggregate error
//! - `Complete`: a pipeline that builds a brand new store from the data source

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use sensorcache_common::{Error, Result};
use sensorcache_store::{CacheStore, IdSet};
use std::fmt;

/// Store being mutated by an incremental update
///
/// The store sits behind a short-lived lock so the sub-updates of a parallel
/// batch can share it. Closures passed to [`WritableCache::write`] are
/// synchronous, so the lock is never held across an await point.
#[derive(Debug, Default)]
pub struct WritableCache {
    inner: Mutex<CacheStore>,
}

impl WritableCache {
    pub fn new(store: CacheStore) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    /// Run a group of mutations as one locked step
    pub fn write<R>(&self, f: impl FnOnce(&mut CacheStore) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn read<R>(&self, f: impl FnOnce(&CacheStore) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn into_inner(self) -> CacheStore {
        self.inner.into_inner()
    }
}

/// Incremental update of an existing store
#[async_trait]
pub trait CacheUpdate: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Identifiers this update writes, used to check parallel batches
    ///
    /// Only what the caller passed in is declared. Entities an update reaches
    /// through the store, such as the offerings a sensor deletion destroys,
    /// and store-wide sets like the supported languages are not listed.
    fn identifiers(&self) -> IdSet {
        IdSet::new()
    }

    /// Apply the update. A failure leaves the mutations done so far in place.
    async fn execute(&self, cache: &WritableCache) -> Result<()>;
}

/// Full rebuild of the cache from the data source
#[async_trait]
pub trait CompleteCacheUpdate: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Build a new, fully populated store
    async fn build(&self) -> Result<CacheStore>;
}

/// Creates the complete update run by the scheduler and on startup
pub trait CompleteCacheUpdateFactory: Send + Sync {
    fn create(&self) -> Box<dyn CompleteCacheUpdate>;
}

/// Batch of incremental updates over disjoint identifier sets
///
/// The disjointness check only covers the identifiers each sub-update
/// declares. Keeping the undeclared writes of a batch apart is up to the
/// caller.
#[derive(Debug)]
pub struct ParallelUpdate {
    updates: Vec<Box<dyn CacheUpdate>>,
}

impl ParallelUpdate {
    /// Create a batch, rejecting sub-updates whose declared identifiers overlap
    pub fn new(updates: Vec<Box<dyn CacheUpdate>>) -> Result<Self> {
        let mut seen = IdSet::new();
        for update in &updates {
            for id in update.identifiers() {
                if !seen.insert(id.clone()) {
                    return Err(Error::invariant(format!(
                        "parallel update {} touches {id} which another update of the batch also touches",
                        update.name()
                    )));
                }
            }
        }
        Ok(Self { updates })
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Run every sub-update to completion and aggregate their failures
    pub async fn execute(&self, cache: &WritableCache) -> Result<()> {
        let results = join_all(self.updates.iter().map(|u| u.execute(cache))).await;
        let errors: Vec<Error> = results.into_iter().filter_map(Result::err).collect();
        Error::from_errors(errors)
    }
}

/// Action submitted to the controller
#[derive(Debug)]
pub enum UpdateAction {
    Incremental(Box<dyn CacheUpdate>),
    Parallel(ParallelUpdate),
    Complete(Box<dyn CompleteCacheUpdate>),
}

impl UpdateAction {
    pub fn incremental(update: impl CacheUpdate + 'static) -> Self {
        Self::Incremental(Box::new(update))
    }

    pub fn complete(update: impl CompleteCacheUpdate + 'static) -> Self {
        Self::Complete(Box::new(update))
    }

    pub fn parallel(updates: Vec<Box<dyn CacheUpdate>>) -> Result<Self> {
        ParallelUpdate::new(updates).map(Self::Parallel)
    }

    #[must_use]
    pub const fn is_complete_update(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Incremental(update) => update.name(),
            Self::Parallel(_) => "ParallelUpdate",
            Self::Complete(update) => update.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AddOffering {
        offering: String,
        fail: bool,
    }

    #[async_trait]
    impl CacheUpdate for AddOffering {
        fn name(&self) -> &str {
            "AddOffering"
        }

        fn identifiers(&self) -> IdSet {
            IdSet::from([self.offering.clone()])
        }

        async fn execute(&self, cache: &WritableCache) -> Result<()> {
            tokio::task::yield_now().await;
            cache.write(|store| store.add_offering(&self.offering));
            if self.fail {
                return Err(Error::data_access(format!("{} failed", self.offering)));
            }
            Ok(())
        }
    }

    fn add(offering: &str, fail: bool) -> Box<dyn CacheUpdate> {
        Box::new(AddOffering {
            offering: offering.to_string(),
            fail,
        })
    }

    #[test]
    fn test_parallel_rejects_overlapping_identifiers() {
        let err = ParallelUpdate::new(vec![add("off1", false), add("off1", false)]).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[tokio::test]
    async fn test_parallel_check_ignores_undeclared_writes() {
        let languages = crate::actions::SupportedLanguagesUpdate::new(["eng"]).unwrap();
        assert!(languages.identifiers().is_empty());

        let batch = ParallelUpdate::new(vec![add("off1", false), Box::new(languages)]).unwrap();
        assert_eq!(batch.len(), 2);

        let cache = WritableCache::default();
        batch.execute(&cache).await.unwrap();
        let store = cache.into_inner();
        assert!(store.has_offering("off1"));
        assert!(store.get_supported_languages().contains("eng"));
    }

    #[tokio::test]
    async fn test_parallel_runs_all_and_aggregates_errors() {
        let batch = ParallelUpdate::new(vec![
            add("off1", false),
            add("off2", true),
            add("off3", true),
        ])
        .unwrap();
        let cache = WritableCache::default();

        let err = batch.execute(&cache).await.unwrap_err();
        assert!(matches!(&err, Error::Aggregate(inner) if inner.len() == 2));
        // failed siblings do not cancel the others, and nothing is rolled back
        assert_eq!(cache.into_inner().get_offerings().len(), 3);
    }

    #[test]
    fn test_action_kind() {
        let action = UpdateAction::incremental(AddOffering {
            offering: "off1".into(),
            fail: false,
        });
        assert!(!action.is_complete_update());
        assert_eq!(action.name(), "AddOffering");

        let parallel = UpdateAction::parallel(vec![add("a", false)]).unwrap();
        assert!(!parallel.is_complete_update());
    }
}
