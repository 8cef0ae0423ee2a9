//! Localized names and descriptions
//!
//! Runs sequentially: the lookups are cheap and the supported language set
//! is collected across all entities. Procedures only exist once the offering
//! phase has run, so their names are resolved by the procedure phase through
//! [`apply_entity_name`].

use crate::action::WritableCache;
use crate::gateway::{DataSourceGateway, EntityKind, I18nMetadata, OfferingRow};
use sensorcache_common::{MultilingualString, Result};
use sensorcache_store::{CacheStore, IdSet};
use tracing::debug;

/// Names of one offering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferingNames {
    pub identifier: String,
    pub name: MultilingualString,
    pub description: MultilingualString,
    /// Human readable name
    pub display_name: String,
}

impl OfferingNames {
    /// Resolve the names of an offering
    ///
    /// Localized metadata wins. Without it the row's name and description are
    /// registered under the default locale, and an offering without a name
    /// gets one derived from its identifier.
    pub async fn load(
        gateway: &dyn DataSourceGateway,
        row: &OfferingRow,
        default_locale: &str,
    ) -> Result<Self> {
        let (name, description) = match gateway
            .fetch_i18n_metadata(EntityKind::Offering, &row.identifier)
            .await?
        {
            Some(metadata) => (metadata.name, metadata.description),
            None => {
                let name = MultilingualString::with(
                    default_locale,
                    row.name
                        .clone()
                        .unwrap_or_else(|| derive_offering_name(&row.identifier).to_string()),
                );
                let description = row
                    .description
                    .as_ref()
                    .map(|d| MultilingualString::with(default_locale, d.clone()))
                    .unwrap_or_default();
                (name, description)
            }
        };

        let display_name = row
            .name
            .clone()
            .or_else(|| name.localization(default_locale).map(ToString::to_string))
            .unwrap_or_else(|| row.identifier.clone());

        Ok(Self {
            identifier: row.identifier.clone(),
            name,
            description,
            display_name,
        })
    }

    pub fn apply(&self, store: &mut CacheStore) {
        for locale in self.name.locales().chain(self.description.locales()) {
            store.add_supported_language(locale);
        }
        store.set_i18n_name_for_offering(&self.identifier, self.name.clone());
        store.set_i18n_description_for_offering(&self.identifier, self.description.clone());
        store.set_name_for_offering(&self.identifier, &self.display_name);
    }
}

/// Short name for an offering identifier
///
/// `http` identifiers keep the part after the last `/`, `urn` identifiers the
/// part after the last `:`, and a trailing `#fragment` wins over both.
pub fn derive_offering_name(identifier: &str) -> &str {
    let mut name = identifier;
    if name.starts_with("http") {
        name = name.rsplit('/').next().unwrap_or(name);
    } else if name.starts_with("urn") {
        name = name.rsplit(':').next().unwrap_or(name);
    }
    name.rsplit('#').next().unwrap_or(name)
}

/// Localized names of offerings, observable properties and features
pub async fn update_i18n(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
    offerings: &[OfferingRow],
    default_locale: &str,
) -> Result<()> {
    cache.write(|store| store.add_supported_language(default_locale));

    for row in offerings {
        let names = OfferingNames::load(gateway, row, default_locale).await?;
        cache.write(|store| names.apply(store));
    }

    let (properties, features) = cache.read(|store| {
        (
            store.get_observable_properties().clone(),
            store.get_features_of_interest().clone(),
        )
    });
    update_entity_names(gateway, cache, EntityKind::ObservableProperty, &properties, default_locale)
        .await?;
    update_entity_names(gateway, cache, EntityKind::FeatureOfInterest, &features, default_locale)
        .await?;

    debug!(
        "Resolved localized names for {} offerings",
        offerings.len()
    );
    Ok(())
}

async fn update_entity_names(
    gateway: &dyn DataSourceGateway,
    cache: &WritableCache,
    kind: EntityKind,
    identifiers: &IdSet,
    default_locale: &str,
) -> Result<()> {
    for identifier in identifiers {
        let Some(metadata) = gateway.fetch_i18n_metadata(kind, identifier).await? else {
            continue;
        };
        cache.write(|store| {
            apply_entity_name(store, kind, identifier, &metadata, default_locale);
        });
    }
    Ok(())
}

/// Register the metadata's locales and its default-locale name
pub fn apply_entity_name(
    store: &mut CacheStore,
    kind: EntityKind,
    identifier: &str,
    metadata: &I18nMetadata,
    default_locale: &str,
) {
    for locale in metadata.name.locales() {
        store.add_supported_language(locale);
    }
    let Some(name) = metadata.name.localization(default_locale) else {
        return;
    };
    match kind {
        EntityKind::ObservableProperty => store.set_name_for_observable_property(identifier, name),
        EntityKind::Procedure => store.set_name_for_procedure(identifier, name),
        EntityKind::FeatureOfInterest => store.set_name_for_feature_of_interest(identifier, name),
        EntityKind::Offering => store.set_name_for_offering(identifier, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{FixtureData, I18nEntry, InMemoryGateway};

    #[test]
    fn test_derive_offering_name() {
        assert_eq!(derive_offering_name("http://example.org/offerings/temp"), "temp");
        assert_eq!(derive_offering_name("urn:ogc:offering:wind"), "wind");
        assert_eq!(derive_offering_name("http://example.org/o#rain"), "rain");
        assert_eq!(derive_offering_name("urn:x:a#b"), "b");
        assert_eq!(derive_offering_name("plain"), "plain");
        assert_eq!(derive_offering_name("plain#frag"), "frag");
    }

    fn row(identifier: &str, name: Option<&str>) -> OfferingRow {
        OfferingRow {
            identifier: identifier.into(),
            name: name.map(Into::into),
            description: Some("desc".into()),
            ..OfferingRow::default()
        }
    }

    #[tokio::test]
    async fn test_offering_names_fallbacks() {
        let gateway = InMemoryGateway::default();

        let named = OfferingNames::load(&gateway, &row("urn:x:off1", Some("Air")), "eng")
            .await
            .unwrap();
        assert_eq!(named.display_name, "Air");
        assert_eq!(named.description.localization("eng"), Some("desc"));

        let derived = OfferingNames::load(&gateway, &row("urn:x:off1", None), "eng")
            .await
            .unwrap();
        assert_eq!(derived.name.localization("eng"), Some("off1"));
        assert_eq!(derived.display_name, "off1");
    }

    #[tokio::test]
    async fn test_metadata_wins_and_languages_collected() {
        let mut name = MultilingualString::with("ger", "Lufttemperatur");
        name.add_localization("eng", "Air temperature");
        let gateway = InMemoryGateway::new(FixtureData {
            i18n: vec![
                I18nEntry {
                    kind: EntityKind::Offering,
                    identifier: "off1".into(),
                    metadata: I18nMetadata {
                        name,
                        description: MultilingualString::new(),
                    },
                },
                I18nEntry {
                    kind: EntityKind::FeatureOfInterest,
                    identifier: "foi1".into(),
                    metadata: I18nMetadata {
                        name: MultilingualString::with("fre", "Station"),
                        description: MultilingualString::new(),
                    },
                },
            ],
            ..FixtureData::default()
        });
        let cache = WritableCache::default();
        cache.write(|store| store.add_feature_of_interest("foi1"));

        update_i18n(&gateway, &cache, &[row("off1", None)], "eng")
            .await
            .unwrap();

        let store = cache.into_inner();
        assert_eq!(store.get_name_for_offering("off1"), Some("Air temperature"));
        assert!(store.get_i18n_description_for_offering("off1").unwrap().is_empty());
        // no "eng" name for the feature
        assert!(store.get_name_for_feature_of_interest("foi1").is_none());
        let mut languages: Vec<_> = store.get_supported_languages().iter().cloned().collect();
        languages.sort();
        assert_eq!(languages, vec!["eng", "fre", "ger"]);
    }

    #[test]
    fn test_apply_entity_name_uses_default_locale() {
        let mut name = MultilingualString::with("eng", "Thermometer");
        name.add_localization("ger", "Thermometer DE");
        let metadata = I18nMetadata {
            name,
            description: MultilingualString::new(),
        };
        let mut store = CacheStore::new();
        apply_entity_name(&mut store, EntityKind::Procedure, "proc1", &metadata, "eng");

        assert_eq!(store.get_name_for_procedure("proc1"), Some("Thermometer"));
        assert!(store.get_supported_languages().contains("ger"));
    }
}
