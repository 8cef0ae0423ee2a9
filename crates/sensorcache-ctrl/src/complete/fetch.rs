//! First phase of the complete update
//!
//! Observable properties, features, related features, result templates and
//! the global time extrema are independent of each other and of the
//! offerings, so they are fetched concurrently. Each part writes its own
//! entity sets.

use crate::action::WritableCache;
use crate::gateway::{DataSourceGateway, TimeExtrema, TimeExtremaScope};
use sensorcache_common::{Error, Result};
use tracing::debug;

async fn update_observable_properties(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
) -> Result<()> {
    let rows = gateway.fetch_observable_properties().await?;
    debug!("Fetched {} observable properties", rows.len());
    cache.write(|store| {
        for row in &rows {
            store.add_observable_property(&row.identifier);
            if row.published {
                store.add_published_observable_property(&row.identifier);
            }
            if let Some(name) = &row.name {
                store.set_name_for_observable_property(&row.identifier, name);
            }
            if !row.components.is_empty() {
                store.add_composite_phenomenon(&row.identifier);
                for component in &row.components {
                    store.add_observable_property_for_composite_phenomenon(
                        &row.identifier,
                        component,
                    );
                }
            }
        }
    });
    Ok(())
}

async fn update_features(gateway: &dyn DataSourceGateway, cache: &WritableCache) -> Result<()> {
    let rows = gateway.fetch_feature_identifiers().await?;
    debug!("Fetched {} features of interest", rows.len());
    cache.write(|store| {
        for row in &rows {
            store.add_feature_of_interest(&row.identifier);
            if row.published {
                store.add_published_feature_of_interest(&row.identifier);
            }
            if let Some(name) = &row.name {
                store.set_name_for_feature_of_interest(&row.identifier, name);
            }
        }
    });
    Ok(())
}

async fn update_related_features(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
) -> Result<()> {
    let rows = gateway.fetch_related_features().await?;
    cache.write(|store| {
        for row in &rows {
            for offering in &row.offerings {
                store.add_related_feature_for_offering(offering, &row.identifier);
            }
            for role in &row.roles {
                store.add_role_for_related_feature(&row.identifier, role);
            }
        }
    });
    Ok(())
}

async fn update_result_templates(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
) -> Result<()> {
    let rows = gateway.fetch_result_templates().await?;
    cache.write(|store| {
        for row in &rows {
            store.add_result_template(&row.identifier);
            store.add_result_template_for_offering(&row.offering, &row.identifier);
            store.add_observable_property_for_result_template(
                &row.identifier,
                &row.observable_property,
            );
            if let Some(feature) = &row.feature_of_interest {
                store.add_feature_of_interest_for_result_template(&row.identifier, feature);
            }
        }
    });
    Ok(())
}

async fn update_observation_time(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
) -> Result<TimeExtrema> {
    let extrema = gateway.fetch_time_extrema(&TimeExtremaScope::Global).await?;
    cache.write(|store| {
        store.set_global_phenomenon_time(extrema.phenomenon_time);
        store.set_global_result_time(extrema.result_time);
    });
    Ok(extrema)
}

/// Run all independent updates, returning the fetched global time extrema
pub async fn update_independent(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
) -> Result<TimeExtrema> {
    let (properties, features, related, templates, times) = futures::join!(
        update_observable_properties(gateway, cache),
        update_features(gateway, cache),
        update_related_features(gateway, cache),
        update_result_templates(gateway, cache),
        update_observation_time(gateway, cache),
    );

    let mut errors: Vec<Error> = [properties, features, related, templates]
        .into_iter()
        .filter_map(Result::err)
        .collect();
    match times {
        Ok(extrema) => {
            Error::from_errors(errors)?;
            Ok(extrema)
        }
        Err(e) => {
            errors.push(e);
            Err(Error::Aggregate(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{FixtureData, InMemoryGateway};
    use crate::gateway::{ObservablePropertyRow, RelatedFeatureRow, ResultTemplateRow};

    fn fixture() -> InMemoryGateway {
        InMemoryGateway::new(FixtureData {
            observable_properties: vec![
                ObservablePropertyRow {
                    identifier: "weather".into(),
                    components: vec!["temp".into(), "humidity".into()],
                    published: true,
                    ..ObservablePropertyRow::default()
                },
                ObservablePropertyRow {
                    identifier: "temp".into(),
                    name: Some("Temperature".into()),
                    published: false,
                    ..ObservablePropertyRow::default()
                },
            ],
            related_features: vec![RelatedFeatureRow {
                identifier: "rf1".into(),
                roles: vec!["sampledFeature".into()],
                offerings: vec!["off1".into(), "off2".into()],
            }],
            result_templates: vec![ResultTemplateRow {
                identifier: "tpl1".into(),
                offering: "off1".into(),
                observable_property: "temp".into(),
                feature_of_interest: Some("foi1".into()),
            }],
            ..FixtureData::default()
        })
    }

    #[tokio::test]
    async fn test_update_independent_populates_store() {
        let gateway = fixture();
        let cache = WritableCache::default();
        update_independent(&gateway, &cache).await.unwrap();
        let store = cache.into_inner();

        assert!(store.is_composite_phenomenon("weather"));
        assert_eq!(store.get_observable_properties_for_composite_phenomenon("weather").len(), 2);
        assert!(!store.get_published_observable_properties().contains("temp"));
        assert_eq!(store.get_name_for_observable_property("temp"), Some("Temperature"));
        assert_eq!(store.get_related_features_for_offering("off2").len(), 1);
        assert_eq!(store.get_roles_for_related_feature("rf1").len(), 1);
        assert!(store.get_result_templates_for_offering("off1").contains("tpl1"));
        assert!(store.get_features_of_interest_for_result_template("tpl1").contains("foi1"));
    }

    #[tokio::test]
    async fn test_failures_are_collected_not_short_circuited() {
        let gateway = fixture();
        gateway.fail_on("fetch_feature_identifiers");
        gateway.fail_on("fetch_time_extrema");
        let cache = WritableCache::default();

        let err = update_independent(&gateway, &cache).await.unwrap_err();
        assert_eq!(err.errors().len(), 2);
        // the other parts still ran
        assert!(cache.read(|store| store.has_result_template("tpl1")));
    }
}
