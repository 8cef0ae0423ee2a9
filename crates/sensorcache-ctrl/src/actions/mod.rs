//! Incremental cache updates fired by transactional requests
//!
//! Each action captures its input at construction and is applied by the
//! controller behind the write gate. Constructors reject missing input with
//! [`Error::InvalidArgument`](sensorcache_common::Error::InvalidArgument).

mod offering_reload;
mod result_insertion;
mod result_template_deletion;
mod result_template_insertion;
mod sensor_deletion;
mod supported_languages;

pub use offering_reload::OfferingReload;
pub use result_insertion::ResultInsertion;
pub use result_template_deletion::ResultTemplateDeletion;
pub use result_template_insertion::ResultTemplateInsertion;
pub use sensor_deletion::SensorDeletion;
pub use supported_languages::SupportedLanguagesUpdate;

use sensorcache_common::{Envelope, Time};
use sensorcache_store::CacheStore;
use serde::{Deserialize, Serialize};

/// Feature of interest as carried by an insert request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingFeature {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Bounding box of the feature's geometry
    #[serde(default)]
    pub geometry: Option<Envelope>,
}

impl SamplingFeature {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }
}

/// Observed phenomenon, possibly composed of component properties
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phenomenon {
    pub identifier: String,
    #[serde(default)]
    pub components: Vec<String>,
}

impl Phenomenon {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            components: Vec::new(),
        }
    }

    pub fn composite(identifier: impl Into<String>, components: Vec<String>) -> Self {
        Self {
            identifier: identifier.into(),
            components,
        }
    }

    pub fn is_composite(&self) -> bool {
        !self.components.is_empty()
    }
}

/// Observation structure a result template was registered for
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationTemplate {
    pub offerings: Vec<String>,
    pub procedure: String,
    pub observable_property: Phenomenon,
    #[serde(default)]
    pub feature_of_interest: Option<SamplingFeature>,
}

/// Observation decoded from an inserted result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub procedure: String,
    pub observable_property: String,
    pub observation_type: String,
    pub offerings: Vec<String>,
    #[serde(default)]
    pub features: Vec<SamplingFeature>,
    pub phenomenon_time: Time,
    /// Defaults to the phenomenon time
    #[serde(default)]
    pub result_time: Option<Time>,
}

/// Remove an offering and everything rooted at it
///
/// Result templates reachable only through this offering go with it.
pub(crate) fn destroy_offering(store: &mut CacheStore, offering: &str) {
    store.remove_phenomenon_time_for_offering(offering);
    store.remove_result_time_for_offering(offering);
    store.remove_name_for_offering(offering);
    store.remove_features_of_interest_for_offering(offering);
    store.remove_related_features_for_offering(offering);
    store.remove_observation_types_for_offering(offering);
    store.remove_feature_of_interest_types_for_offering(offering);
    store.remove_envelope_for_offering(offering);
    store.remove_observable_properties_for_offering(offering);
    store.clear_composite_phenomenon_for_offering(offering);

    let templates = store.get_result_templates_for_offering(offering);
    store.remove_result_templates_for_offering(offering);
    for template in &templates {
        if !store.get_offerings_for_result_template(template).is_empty() {
            continue;
        }
        store.remove_result_template(template);
        store.remove_features_of_interest_for_result_template(template);
        store.remove_observable_properties_for_result_template(template);
    }

    store.remove_procedures_for_offering(offering);
    store.remove_hidden_child_procedures_for_offering(offering);
    store.remove_offering(offering);
    store.remove_published_offering(offering);
}
