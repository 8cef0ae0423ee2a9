use super::Observation;
use crate::action::{CacheUpdate, WritableCache};
use async_trait::async_trait;
use sensorcache_common::{Envelope, Error, Result};
use sensorcache_store::{CacheStore, IdSet};
use tracing::debug;

/// Records observations inserted through a result template
#[derive(Clone, Debug)]
pub struct ResultInsertion {
    template: String,
    observations: Vec<Observation>,
}

impl ResultInsertion {
    pub fn new(template: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        let template = template.into();
        if template.is_empty() || observations.is_empty() {
            return Err(Error::invalid_argument(format!(
                "missing argument: template '{template}', {} observations",
                observations.len()
            )));
        }
        Ok(Self {
            template,
            observations,
        })
    }

    fn apply_observation(&self, store: &mut CacheStore, observation: &Observation) {
        let template = self.template.as_str();
        let procedure = observation.procedure.as_str();
        let property = observation.observable_property.as_str();
        let phenomenon_time = &observation.phenomenon_time;
        let result_time = observation.result_time.as_ref().unwrap_or(phenomenon_time);

        store.update_phenomenon_time(phenomenon_time);
        store.update_result_time(result_time);

        store.add_procedure(procedure);
        store.update_phenomenon_time_for_procedure(procedure, phenomenon_time);

        store.add_observable_property_for_procedure(procedure, property);
        store.add_observable_property_for_result_template(template, property);

        let mut envelope: Option<Envelope> = None;
        for feature in &observation.features {
            if let Some(geometry) = &feature.geometry {
                geometry.fold_into(&mut envelope);
            }
        }
        if let Some(envelope) = &envelope {
            store.update_global_envelope(envelope);
        }

        for feature in &observation.features {
            store.add_feature_of_interest(&feature.identifier);
            store.add_feature_of_interest_for_result_template(template, &feature.identifier);
            store.add_procedure_for_feature_of_interest(&feature.identifier, procedure);
            for offering in &observation.offerings {
                store.add_feature_of_interest_for_offering(offering, &feature.identifier);
            }
        }

        // observations without geometry count for the whole known area
        let offering_envelope = envelope.or_else(|| store.get_global_envelope().copied());
        for offering in &observation.offerings {
            store.add_offering(offering);
            store.add_procedure_for_offering(offering, procedure);
            if let Some(envelope) = &offering_envelope {
                store.update_envelope_for_offering(offering, envelope);
            }
            store.update_phenomenon_time_for_offering(offering, phenomenon_time);
            store.update_result_time_for_offering(offering, result_time);
            store.add_observable_property_for_offering(offering, property);
            store.add_observation_type_for_offering(offering, &observation.observation_type);
        }
    }
}

#[async_trait]
impl CacheUpdate for ResultInsertion {
    fn name(&self) -> &str {
        "ResultInsertion"
    }

    fn identifiers(&self) -> IdSet {
        let mut ids = IdSet::from([self.template.clone()]);
        for observation in &self.observations {
            ids.insert(observation.procedure.clone());
            ids.extend(observation.offerings.iter().cloned());
        }
        ids
    }

    async fn execute(&self, cache: &WritableCache) -> Result<()> {
        for observation in &self.observations {
            cache.write(|store| self.apply_observation(store, observation));
        }
        debug!(
            "Inserted {} observations for result template {}",
            self.observations.len(),
            self.template
        );
        Ok(())
    }
}
