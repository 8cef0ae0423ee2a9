use super::destroy_offering;
use crate::action::{CacheUpdate, WritableCache};
use crate::complete::i18n::OfferingNames;
use crate::complete::offering::OfferingData;
use crate::gateway::DataSourceGateway;
use async_trait::async_trait;
use sensorcache_common::{Error, Result};
use sensorcache_store::IdSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Reload the given offerings from the data source
///
/// Offerings the data source no longer knows are destroyed. The gateway is
/// queried without holding the store lock; failures are collected per
/// offering.
pub(crate) async fn reload_offerings(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
    offerings: &IdSet,
    default_locale: &str,
) -> Result<()> {
    if offerings.is_empty() {
        return Ok(());
    }
    let rows = gateway.fetch_offerings().await?;

    let mut errors = Vec::new();
    for offering in offerings {
        let Some(row) = rows.iter().find(|row| &row.identifier == offering) else {
            info!("Offering {} vanished from the data source, removing it", offering);
            cache.write(|store| destroy_offering(store, offering));
            continue;
        };
        let loaded = async {
            let names = OfferingNames::load(gateway, row, default_locale).await?;
            let data = OfferingData::load(gateway, row).await?;
            Ok::<_, Error>((names, data))
        }
        .await;
        match loaded {
            Ok((names, data)) => {
                cache.write(|store| {
                    names.apply(store);
                    data.apply(store);
                });
                debug!("Reloaded offering {}", offering);
            }
            Err(e) => errors.push(e),
        }
    }
    Error::from_errors(errors)
}

/// Refreshes individual offerings from the data source
pub struct OfferingReload {
    offerings: IdSet,
    gateway: Arc<dyn DataSourceGateway>,
    default_locale: String,
}

impl OfferingReload {
    pub fn new<I, S>(
        offerings: I,
        gateway: Arc<dyn DataSourceGateway>,
        default_locale: impl Into<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let offerings: IdSet = offerings.into_iter().map(Into::into).collect();
        if offerings.is_empty() {
            return Err(Error::invalid_argument("no offerings to reload"));
        }
        Ok(Self {
            offerings,
            gateway,
            default_locale: default_locale.into(),
        })
    }
}

impl fmt::Debug for OfferingReload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfferingReload")
            .field("offerings", &self.offerings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheUpdate for OfferingReload {
    fn name(&self) -> &str {
        "OfferingReload"
    }

    fn identifiers(&self) -> IdSet {
        self.offerings.clone()
    }

    async fn execute(&self, cache: &WritableCache) -> Result<()> {
        reload_offerings(
            self.gateway.as_ref(),
            cache,
            &self.offerings,
            &self.default_locale,
        )
        .await?;
        cache.write(|store| store.recalculate_aggregates());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{FixtureData, InMemoryGateway};
    use crate::gateway::{DatasetRow, OfferingRow};
    use sensorcache_common::Envelope;
    use sensorcache_store::CacheStore;

    fn gateway() -> Arc<InMemoryGateway> {
        Arc::new(InMemoryGateway::new(FixtureData {
            offerings: vec![OfferingRow {
                identifier: "off1".into(),
                name: Some("Offering 1".into()),
                published: true,
                ..OfferingRow::default()
            }],
            datasets: vec![DatasetRow {
                offering: "off1".into(),
                procedure: "proc-new".into(),
                observable_property: "temp".into(),
                feature_of_interest: None,
                hidden_child: false,
                published: true,
            }],
            envelopes: [("off1".to_string(), Envelope::point(4326, 3.0, 3.0))].into(),
            ..FixtureData::default()
        }))
    }

    #[tokio::test]
    async fn test_reload_replaces_offering_data() {
        let mut store = CacheStore::new();
        store.add_offering("off1");
        store.add_procedure_for_offering("off1", "proc-old");
        store.add_offering("gone");
        store.add_procedure_for_offering("gone", "proc-old");

        let cache = WritableCache::new(store);
        let update = OfferingReload::new(["off1", "gone"], gateway(), "eng").unwrap();
        update.execute(&cache).await.unwrap();
        let store = cache.into_inner();

        assert_eq!(
            store.get_procedures_for_offering("off1"),
            IdSet::from(["proc-new".to_string()])
        );
        assert_eq!(store.get_name_for_offering("off1"), Some("Offering 1"));
        assert!(!store.has_offering("gone"));
        assert_eq!(
            store.get_global_envelope(),
            Some(&Envelope::point(4326, 3.0, 3.0))
        );
    }

    #[tokio::test]
    async fn test_reload_failure_is_reported() {
        let gateway = gateway();
        gateway.fail_on("fetch_datasets_for_offering");
        let update = OfferingReload::new(["off1"], gateway, "eng").unwrap();
        let err = update.execute(&WritableCache::default()).await.unwrap_err();
        assert!(err.is_data_access());
    }

    #[test]
    fn test_requires_offerings() {
        let gateway: Arc<dyn DataSourceGateway> = Arc::new(InMemoryGateway::default());
        assert!(OfferingReload::new(Vec::<String>::new(), gateway, "eng").is_err());
    }
}
