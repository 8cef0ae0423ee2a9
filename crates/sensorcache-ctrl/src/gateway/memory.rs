//! In-memory data source
//!
//! Serves gateway rows from a [`FixtureData`] value, typically loaded from a
//! JSON file. Used by the admin binary and as the test double for the
//! pipeline and the actions. Individual calls can be made to fail or to
//! stall for a while.

use super::{
    DataSourceGateway, DatasetRow, EntityKind, FeatureRow, I18nMetadata, ObservablePropertyRow,
    OfferingRow, ProcedureRow, RelatedFeatureRow, ResultTemplateRow, TimeExtrema,
    TimeExtremaScope,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sensorcache_common::{Envelope, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Contents of the in-memory data source
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    pub offerings: Vec<OfferingRow>,
    pub datasets: Vec<DatasetRow>,
    /// Offering procedures for offerings without dataset rows
    pub offering_procedures: HashMap<String, Vec<String>>,
    pub procedures: Vec<ProcedureRow>,
    pub observable_properties: Vec<ObservablePropertyRow>,
    pub features: Vec<FeatureRow>,
    pub related_features: Vec<RelatedFeatureRow>,
    pub result_templates: Vec<ResultTemplateRow>,
    pub envelopes: HashMap<String, Envelope>,
    pub procedure_times: HashMap<String, TimeExtrema>,
    pub i18n: Vec<I18nEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct I18nEntry {
    pub kind: EntityKind,
    pub identifier: String,
    #[serde(flatten)]
    pub metadata: I18nMetadata,
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    data: RwLock<FixtureData>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl InMemoryGateway {
    pub fn new(data: FixtureData) -> Self {
        Self {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Load the fixture from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let data: FixtureData = serde_json::from_str(json)
            .map_err(|e| Error::invalid_argument(format!("invalid gateway fixture: {e}")))?;
        Ok(Self::new(data))
    }

    /// Modify the served data
    pub fn update<R>(&self, f: impl FnOnce(&mut FixtureData) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Make every call to `method` (e.g. `"fetch_offerings"`) fail
    pub fn fail_on(&self, method: &str) {
        self.failing.lock().insert(method.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    /// Sleep this long before answering any call
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    async fn enter(&self, method: &str) -> Result<()> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(method) {
            return Err(Error::data_access(format!("{method}: data source unavailable")));
        }
        Ok(())
    }

    fn offering_time_extrema(data: &FixtureData, offering: Option<&str>) -> TimeExtrema {
        let mut extrema = TimeExtrema::default();
        for row in &data.offerings {
            if offering.is_some_and(|id| id != row.identifier) {
                continue;
            }
            if let Some(period) = &row.phenomenon_time {
                period.fold_into(&mut extrema.phenomenon_time);
            }
            if let Some(period) = &row.result_time {
                period.fold_into(&mut extrema.result_time);
            }
        }
        extrema
    }
}

#[async_trait]
impl DataSourceGateway for InMemoryGateway {
    async fn fetch_offerings(&self) -> Result<Vec<OfferingRow>> {
        self.enter("fetch_offerings").await?;
        Ok(self.data.read().offerings.clone())
    }

    async fn fetch_datasets_for_offering(&self, offering: &str) -> Result<Vec<DatasetRow>> {
        self.enter("fetch_datasets_for_offering").await?;
        Ok(self
            .data
            .read()
            .datasets
            .iter()
            .filter(|d| d.offering == offering)
            .cloned()
            .collect())
    }

    async fn fetch_procedure_identifiers_for_offering(
        &self,
        offering: &str,
    ) -> Result<Vec<String>> {
        self.enter("fetch_procedure_identifiers_for_offering")
            .await?;
        Ok(self
            .data
            .read()
            .offering_procedures
            .get(offering)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_procedures(&self) -> Result<Vec<ProcedureRow>> {
        self.enter("fetch_procedures").await?;
        Ok(self.data.read().procedures.clone())
    }

    async fn fetch_observable_properties(&self) -> Result<Vec<ObservablePropertyRow>> {
        self.enter("fetch_observable_properties").await?;
        Ok(self.data.read().observable_properties.clone())
    }

    async fn fetch_feature_identifiers(&self) -> Result<Vec<FeatureRow>> {
        self.enter("fetch_feature_identifiers").await?;
        Ok(self.data.read().features.clone())
    }

    async fn fetch_related_features(&self) -> Result<Vec<RelatedFeatureRow>> {
        self.enter("fetch_related_features").await?;
        Ok(self.data.read().related_features.clone())
    }

    async fn fetch_result_templates(&self) -> Result<Vec<ResultTemplateRow>> {
        self.enter("fetch_result_templates").await?;
        Ok(self.data.read().result_templates.clone())
    }

    async fn fetch_time_extrema(&self, scope: &TimeExtremaScope) -> Result<TimeExtrema> {
        self.enter("fetch_time_extrema").await?;
        let data = self.data.read();
        Ok(match scope {
            TimeExtremaScope::Global => Self::offering_time_extrema(&data, None),
            TimeExtremaScope::Offering(id) => {
                Self::offering_time_extrema(&data, Some(id.as_str()))
            }
            TimeExtremaScope::Procedure(id) => {
                data.procedure_times.get(id).copied().unwrap_or_default()
            }
        })
    }

    async fn fetch_envelope(&self, offering: &str) -> Result<Option<Envelope>> {
        self.enter("fetch_envelope").await?;
        Ok(self.data.read().envelopes.get(offering).copied())
    }

    async fn fetch_i18n_metadata(
        &self,
        kind: EntityKind,
        identifier: &str,
    ) -> Result<Option<I18nMetadata>> {
        self.enter("fetch_i18n_metadata").await?;
        Ok(self
            .data
            .read()
            .i18n
            .iter()
            .find(|e| e.kind == kind && e.identifier == identifier)
            .map(|e| e.metadata.clone()))
    }
}
