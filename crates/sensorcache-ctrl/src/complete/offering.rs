//! Per-offering cache data
//!
//! [`OfferingData`] holds everything the data source knows about one
//! offering. Loading only talks to the gateway, applying only touches the
//! store and only the offering's own entries plus additive procedure links,
//! so any number of offerings can be loaded concurrently.

use crate::action::WritableCache;
use crate::gateway::{DataSourceGateway, DatasetRow, OfferingRow};
use futures::stream::{self, StreamExt};
use sensorcache_common::{Envelope, Error, Result, TimePeriod};
use sensorcache_store::{CacheStore, IdSet};
use tracing::{debug, info};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfferingData {
    pub identifier: String,
    pub published: bool,
    pub procedures: IdSet,
    pub hidden_children: IdSet,
    pub observable_properties: IdSet,
    pub features: IdSet,
    pub observation_types: Vec<String>,
    pub feature_types: Vec<String>,
    pub envelope: Option<Envelope>,
    pub phenomenon_time: Option<TimePeriod>,
    pub result_time: Option<TimePeriod>,
    datasets: Vec<DatasetRow>,
}

impl OfferingData {
    /// Fetch the offering's datasets and envelope
    pub async fn load(gateway: &dyn DataSourceGateway, row: &OfferingRow) -> Result<Self> {
        let datasets = gateway.fetch_datasets_for_offering(&row.identifier).await?;

        let mut procedures = IdSet::new();
        let mut hidden_children = IdSet::new();
        if datasets.is_empty() {
            procedures.extend(
                gateway
                    .fetch_procedure_identifiers_for_offering(&row.identifier)
                    .await?,
            );
        } else {
            for dataset in &datasets {
                if dataset.hidden_child {
                    hidden_children.insert(dataset.procedure.clone());
                } else {
                    procedures.insert(dataset.procedure.clone());
                }
            }
        }

        let observable_properties = datasets
            .iter()
            .map(|d| d.observable_property.clone())
            .collect();
        let features = datasets
            .iter()
            .filter_map(|d| d.feature_of_interest.clone())
            .collect();
        let envelope = gateway.fetch_envelope(&row.identifier).await?;

        Ok(Self {
            identifier: row.identifier.clone(),
            published: row.published,
            procedures,
            hidden_children,
            observable_properties,
            features,
            observation_types: row.observation_types.clone(),
            feature_types: row.feature_types.clone(),
            envelope,
            phenomenon_time: row.phenomenon_time,
            result_time: row.result_time,
            datasets,
        })
    }

    /// Replace the offering's cached entries with this data
    pub fn apply(&self, store: &mut CacheStore) {
        let id = self.identifier.as_str();
        store.add_offering(id);
        if self.published {
            store.add_published_offering(id);
        } else {
            store.remove_published_offering(id);
        }

        // hidden children first so they are never listed as direct procedures
        store.set_hidden_child_procedures_for_offering(id, &self.hidden_children);
        store.set_procedures_for_offering(id, &self.procedures);
        for procedure in self.procedures.iter().chain(&self.hidden_children) {
            store.add_procedure(procedure);
        }

        store.set_observable_properties_for_offering(id, &self.observable_properties);
        store.set_observation_types_for_offering(id, self.observation_types.iter().cloned());
        store.set_features_of_interest_for_offering(id, &self.features);
        store.set_feature_of_interest_types_for_offering(id, self.feature_types.iter().cloned());

        store.set_envelope_for_offering(id, self.envelope);
        store.set_phenomenon_time_for_offering(id, self.phenomenon_time);
        store.set_result_time_for_offering(id, self.result_time);

        store.clear_composite_phenomenon_for_offering(id);
        for observable_property in &self.observable_properties {
            for composite in
                store.get_composite_phenomena_for_observable_property(observable_property)
            {
                store.add_composite_phenomenon_for_offering(id, &composite);
            }
        }

        for dataset in &self.datasets {
            store.add_observable_property_for_procedure(
                &dataset.procedure,
                &dataset.observable_property,
            );
            if let Some(feature) = &dataset.feature_of_interest {
                store.add_procedure_for_feature_of_interest(feature, &dataset.procedure);
            }
            if dataset.published {
                store.add_published_procedure(&dataset.procedure);
            }
        }
    }
}

/// Load and apply every offering, at most `thread_count` at a time
pub async fn update_offerings(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
    offerings: &[OfferingRow],
    thread_count: usize,
) -> Result<()> {
    info!(
        "Updating {} offerings with {} concurrent tasks",
        offerings.len(),
        thread_count
    );

    let tasks: Vec<_> = offerings
        .iter()
        .map(|row| async move {
            let data = OfferingData::load(gateway, row).await?;
            cache.write(|store| data.apply(store));
            debug!("Updated offering {}", row.identifier);
            Ok::<(), Error>(())
        })
        .collect();
    let results: Vec<Result<()>> = stream::iter(tasks)
        .buffer_unordered(thread_count.max(1))
        .collect()
        .await;

    Error::from_errors(results.into_iter().filter_map(Result::err).collect())
}
