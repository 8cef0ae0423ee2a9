//! Data source gateway
//!
//! The cache never talks to the observation database directly. Everything
//! it needs is fetched through [`DataSourceGateway`], whose calls may fail
//! with [`Error::DataAccess`](sensorcache_common::Error::DataAccess) and are
//! otherwise side-effect free from the cache's point of view.

pub mod memory;

use async_trait::async_trait;
use sensorcache_common::{Envelope, MultilingualString, Result, TimePeriod};
use serde::{Deserialize, Serialize};

/// Observable property as stored in the data source
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservablePropertyRow {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Component properties, non-empty for composite phenomena
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub published: bool,
}

/// Related feature of one or more offerings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedFeatureRow {
    pub identifier: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub offerings: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingRow {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub observation_types: Vec<String>,
    #[serde(default)]
    pub feature_types: Vec<String>,
    #[serde(default)]
    pub phenomenon_time: Option<TimePeriod>,
    #[serde(default)]
    pub result_time: Option<TimePeriod>,
    #[serde(default = "default_true")]
    pub published: bool,
}

/// One observation series: procedure observing a property in an offering
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub offering: String,
    pub procedure: String,
    pub observable_property: String,
    #[serde(default)]
    pub feature_of_interest: Option<String>,
    /// The procedure is a hidden child of the offering
    #[serde(default)]
    pub hidden_child: bool,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcedureRow {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTemplateRow {
    pub identifier: String,
    pub offering: String,
    pub observable_property: String,
    #[serde(default)]
    pub feature_of_interest: Option<String>,
}

/// Localized name and description of an entity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct I18nMetadata {
    #[serde(default)]
    pub name: MultilingualString,
    #[serde(default)]
    pub description: MultilingualString,
}

/// Min/max phenomenon and result time of some scope
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeExtrema {
    pub phenomenon_time: Option<TimePeriod>,
    pub result_time: Option<TimePeriod>,
}

/// What a time extrema query is about
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeExtremaScope {
    Global,
    Offering(String),
    Procedure(String),
}

/// Kind of entity an i18n lookup refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Offering,
    Procedure,
    ObservableProperty,
    FeatureOfInterest,
}

const fn default_true() -> bool {
    true
}

/// Read access to the observation database
#[async_trait]
pub trait DataSourceGateway: Send + Sync {
    async fn fetch_offerings(&self) -> Result<Vec<OfferingRow>>;

    async fn fetch_datasets_for_offering(&self, offering: &str) -> Result<Vec<DatasetRow>>;

    /// Procedures of an offering that has no dataset rows
    async fn fetch_procedure_identifiers_for_offering(&self, offering: &str)
    -> Result<Vec<String>>;

    async fn fetch_procedures(&self) -> Result<Vec<ProcedureRow>>;

    async fn fetch_observable_properties(&self) -> Result<Vec<ObservablePropertyRow>>;

    /// Features of interest that have observations
    async fn fetch_feature_identifiers(&self) -> Result<Vec<FeatureRow>>;

    async fn fetch_related_features(&self) -> Result<Vec<RelatedFeatureRow>>;

    async fn fetch_result_templates(&self) -> Result<Vec<ResultTemplateRow>>;

    async fn fetch_time_extrema(&self, scope: &TimeExtremaScope) -> Result<TimeExtrema>;

    async fn fetch_envelope(&self, offering: &str) -> Result<Option<Envelope>>;

    async fn fetch_i18n_metadata(
        &self,
        kind: EntityKind,
        identifier: &str,
    ) -> Result<Option<I18nMetadata>>;
}
