use super::ObservationTemplate;
use crate::action::{CacheUpdate, WritableCache};
use async_trait::async_trait;
use sensorcache_common::{Error, Result};
use sensorcache_store::IdSet;
use tracing::debug;

/// Registers an accepted result template
#[derive(Clone, Debug)]
pub struct ResultTemplateInsertion {
    template: String,
    observation: ObservationTemplate,
}

impl ResultTemplateInsertion {
    pub fn new(template: impl Into<String>, observation: ObservationTemplate) -> Result<Self> {
        let template = template.into();
        if template.is_empty() {
            return Err(Error::invalid_argument("missing accepted template identifier"));
        }
        if observation.offerings.is_empty() {
            return Err(Error::invalid_argument(format!(
                "result template {template} has no offerings"
            )));
        }
        Ok(Self {
            template,
            observation,
        })
    }
}

#[async_trait]
impl CacheUpdate for ResultTemplateInsertion {
    fn name(&self) -> &str {
        "ResultTemplateInsertion"
    }

    fn identifiers(&self) -> IdSet {
        let mut ids: IdSet = self.observation.offerings.iter().cloned().collect();
        ids.insert(self.template.clone());
        ids
    }

    async fn execute(&self, cache: &WritableCache) -> Result<()> {
        let template = self.template.as_str();
        let observation = &self.observation;
        let property = &observation.observable_property;

        cache.write(|store| {
            store.add_result_template(template);
            for offering in &observation.offerings {
                if !store.has_offering(offering) {
                    store.add_offering(offering);
                    store.add_published_offering(offering);
                }
                store.add_result_template_for_offering(offering, template);
            }
            store.add_observable_property_for_result_template(template, &property.identifier);

            if let Some(feature) = &observation.feature_of_interest {
                store.add_feature_of_interest(&feature.identifier);
                store.add_feature_of_interest_for_result_template(template, &feature.identifier);
                if let Some(name) = &feature.name {
                    store.set_name_for_feature_of_interest(&feature.identifier, name);
                    store.add_published_feature_of_interest(&feature.identifier);
                }
                if let Some(envelope) = &feature.geometry {
                    store.update_global_envelope(envelope);
                    for offering in &observation.offerings {
                        store.update_envelope_for_offering(offering, envelope);
                    }
                }
            }

            if property.is_composite() {
                store.add_composite_phenomenon(&property.identifier);
                store.add_composite_phenomenon_for_procedure(
                    &observation.procedure,
                    &property.identifier,
                );
                for offering in &observation.offerings {
                    store.add_composite_phenomenon_for_offering(offering, &property.identifier);
                }
                for component in &property.components {
                    store.add_observable_property_for_composite_phenomenon(
                        &property.identifier,
                        component,
                    );
                }
            }
        });

        debug!(
            "Inserted result template {} for {} offerings",
            template,
            observation.offerings.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Phenomenon, SamplingFeature};
    use sensorcache_common::Envelope;
    use sensorcache_store::CacheStore;

    fn template(offerings: &[&str], property: Phenomenon) -> ObservationTemplate {
        ObservationTemplate {
            offerings: offerings.iter().map(ToString::to_string).collect(),
            procedure: "proc1".into(),
            observable_property: property,
            feature_of_interest: None,
        }
    }

    async fn apply(update: &ResultTemplateInsertion, store: CacheStore) -> CacheStore {
        let cache = WritableCache::new(store);
        update.execute(&cache).await.unwrap();
        cache.into_inner()
    }

    #[tokio::test]
    async fn test_insert_into_empty_store() {
        let update =
            ResultTemplateInsertion::new("tpl1", template(&["off1"], Phenomenon::new("temp")))
                .unwrap();
        let store = apply(&update, CacheStore::new()).await;

        assert_eq!(store.get_offerings(), &IdSet::from(["off1".to_string()]));
        assert_eq!(
            store.get_result_templates_for_offering("off1"),
            IdSet::from(["tpl1".to_string()])
        );
        assert_eq!(store.get_result_templates(), &IdSet::from(["tpl1".to_string()]));
        assert!(store.get_published_offerings().contains("off1"));
    }

    #[tokio::test]
    async fn test_insert_twice_is_idempotent() {
        let mut observation = template(
            &["off1", "off2"],
            Phenomenon::composite("weather", vec!["temp".into(), "wind".into()]),
        );
        observation.feature_of_interest = Some(SamplingFeature {
            identifier: "foi1".into(),
            name: Some("Station".into()),
            geometry: Some(Envelope::point(4326, 7.0, 51.0)),
        });
        let update = ResultTemplateInsertion::new("tpl1", observation).unwrap();

        let once = apply(&update, CacheStore::new()).await;
        let twice = apply(&update, once.clone()).await;
        assert_eq!(once, twice);
        assert!(once.get_composite_phenomena_for_offering("off2").contains("weather"));
        assert!(once.get_composite_phenomena_for_procedure("proc1").contains("weather"));
        assert_eq!(
            once.get_envelope_for_offering("off1"),
            Some(&Envelope::point(4326, 7.0, 51.0))
        );
        assert!(once.get_global_envelope().is_some());
    }

    #[tokio::test]
    async fn test_existing_unpublished_offering_stays_unpublished() {
        let mut store = CacheStore::new();
        store.add_offering("off1");
        let update =
            ResultTemplateInsertion::new("tpl1", template(&["off1"], Phenomenon::new("temp")))
                .unwrap();
        let store = apply(&update, store).await;
        assert!(store.get_published_offerings().is_empty());
    }

    #[test]
    fn test_missing_input_rejected() {
        let err = ResultTemplateInsertion::new("", template(&["off1"], Phenomenon::new("temp")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(ResultTemplateInsertion::new("tpl1", template(&[], Phenomenon::new("t"))).is_err());
    }
}
