use super::destroy_offering;
use super::offering_reload::reload_offerings;
use crate::action::{CacheUpdate, WritableCache};
use crate::gateway::DataSourceGateway;
use async_trait::async_trait;
use sensorcache_common::{Error, Result};
use sensorcache_store::{CacheStore, IdSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Removes a deleted procedure and everything only it kept alive
///
/// The steps run in a fixed order and the global aggregates are recomputed
/// last, so intermediate removals never have to patch them.
pub struct SensorDeletion {
    procedure: String,
    gateway: Arc<dyn DataSourceGateway>,
    default_locale: String,
}

impl SensorDeletion {
    pub fn new(
        procedure: impl Into<String>,
        gateway: Arc<dyn DataSourceGateway>,
        default_locale: impl Into<String>,
    ) -> Result<Self> {
        let procedure = procedure.into();
        if procedure.is_empty() {
            return Err(Error::invalid_argument("missing procedure identifier"));
        }
        Ok(Self {
            procedure,
            gateway,
            default_locale: default_locale.into(),
        })
    }

    /// Steps 1 to 3, returning the offerings that need a reload
    fn detach_procedure(&self, store: &mut CacheStore) -> IdSet {
        let procedure = self.procedure.as_str();

        store.remove_procedure(procedure);
        store.remove_published_procedure(procedure);
        store.remove_name_for_procedure(procedure);
        store.remove_phenomenon_time_for_procedure(procedure);

        for feature in store.get_features_of_interest_for_procedure(procedure) {
            store.remove_procedure_for_feature_of_interest(&feature, procedure);
        }

        let mut needs_reload = IdSet::new();
        for offering in store.get_all_offerings_for_procedure(procedure) {
            let hidden_child = store.is_hidden_child_of(&offering, procedure);
            store.remove_procedure_for_offering(&offering, procedure);

            if hidden_child {
                // parent offering survives, its remaining children define it
                needs_reload.insert(offering);
            } else {
                destroy_offering(store, &offering);
            }
        }
        store.remove_offerings_for_procedure(procedure);
        needs_reload
    }

    /// Steps 5 to 7
    fn recompute_derived(&self, store: &mut CacheStore) {
        let procedure = self.procedure.as_str();

        store.remove_roles_for_related_feature_not_in(&store.get_related_features());
        let with_offering = store.get_features_of_interest_with_offering();
        store.set_features_of_interest(with_offering.clone());
        store.set_published_features_of_interest(with_offering);

        for observable_property in store.get_observable_properties_for_procedure(procedure) {
            store.remove_observable_property_for_procedure(procedure, &observable_property);
        }
        store.clear_composite_phenomenon_for_procedure(procedure);

        store.remove_offerings_for_procedure(procedure);
        store.recalculate_phenomenon_time();
        store.recalculate_result_time();
        store.recalculate_global_envelope();
    }
}

impl fmt::Debug for SensorDeletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorDeletion")
            .field("procedure", &self.procedure)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheUpdate for SensorDeletion {
    fn name(&self) -> &str {
        "SensorDeletion"
    }

    fn identifiers(&self) -> IdSet {
        IdSet::from([self.procedure.clone()])
    }

    async fn execute(&self, cache: &WritableCache) -> Result<()> {
        let needs_reload = cache.write(|store| self.detach_procedure(store));

        // a failed reload is reported, the remaining steps still run
        let reload = reload_offerings(
            self.gateway.as_ref(),
            cache,
            &needs_reload,
            &self.default_locale,
        )
        .await;
        if let Err(e) = &reload {
            warn!(
                "Reloading offerings of deleted procedure {} failed: {}",
                self.procedure, e
            );
        }

        cache.write(|store| self.recompute_derived(store));
        debug!(
            "Deleted procedure {} ({} offerings reloaded)",
            self.procedure,
            needs_reload.len()
        );
        reload
    }
}
