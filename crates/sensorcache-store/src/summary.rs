//! Derived aggregates, consistency checks and the admin summary view

use crate::store::CacheStore;
use sensorcache_common::{Error, Result, TimePeriod};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Entity counts of a store, as reported by the admin binary
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub offerings: usize,
    pub published_offerings: usize,
    pub procedures: usize,
    pub observable_properties: usize,
    pub features_of_interest: usize,
    pub related_features: usize,
    pub result_templates: usize,
    pub composite_phenomena: usize,
    pub supported_languages: Vec<String>,
    pub has_global_envelope: bool,
    pub phenomenon_time: Option<TimePeriod>,
    pub result_time: Option<TimePeriod>,
}

impl CacheStore {
    /// Recompute the global phenomenon time from the offerings' times
    pub fn recalculate_phenomenon_time(&mut self) {
        self.global_phenomenon_time = fold_periods(self.phenomenon_time_for_offering.values());
    }

    /// Recompute the global result time from the offerings' times
    pub fn recalculate_result_time(&mut self) {
        self.global_result_time = fold_periods(self.result_time_for_offering.values());
    }

    /// Recompute the global envelope from the offerings' envelopes
    pub fn recalculate_global_envelope(&mut self) {
        let mut global = None;
        for envelope in self.envelope_for_offering.values() {
            envelope.fold_into(&mut global);
        }
        self.global_envelope = global;
    }

    /// Recompute all three global aggregates
    pub fn recalculate_aggregates(&mut self) {
        self.recalculate_global_envelope();
        self.recalculate_phenomenon_time();
        self.recalculate_result_time();
    }

    /// Check the structural invariants
    ///
    /// Every relation must be symmetric and no procedure may be both a
    /// direct procedure and a hidden child of the same offering.
    pub fn validate(&self) -> Result<()> {
        let relations = [
            ("offering/procedure", &self.offering_procedures),
            ("offering/hidden child", &self.offering_hidden_children),
            (
                "offering/observable property",
                &self.offering_observable_properties,
            ),
            ("offering/feature", &self.offering_features),
            ("offering/result template", &self.offering_result_templates),
            (
                "offering/composite phenomenon",
                &self.offering_composite_phenomena,
            ),
            ("offering/related feature", &self.offering_related_features),
            (
                "procedure/observable property",
                &self.procedure_observable_properties,
            ),
            ("procedure/feature", &self.procedure_features),
            (
                "procedure/composite phenomenon",
                &self.procedure_composite_phenomena,
            ),
            (
                "result template/observable property",
                &self.result_template_observable_properties,
            ),
            ("result template/feature", &self.result_template_features),
            (
                "composite phenomenon/component",
                &self.composite_phenomenon_components,
            ),
        ];
        for (name, relation) in relations {
            if let Some((left, right)) = relation.find_asymmetry() {
                return Err(Error::invariant(format!(
                    "{name} relation is not symmetric at ({left}, {right})"
                )));
            }
        }

        for offering in self.offering_hidden_children.lefts() {
            let Some(hidden) = self.offering_hidden_children.rights_ref(offering) else {
                continue;
            };
            let Some(direct) = self.offering_procedures.rights_ref(offering) else {
                continue;
            };
            if let Some(procedure) = hidden.intersection(direct).next() {
                return Err(Error::invariant(format!(
                    "procedure {procedure} is both direct and hidden child of offering {offering}"
                )));
            }
        }
        Ok(())
    }

    /// Compare the fetched global extents with the ones derived from the offerings
    ///
    /// Mismatches are only logged; the derived values win.
    pub fn reconcile_global_times(
        &mut self,
        fetched_phenomenon: Option<TimePeriod>,
        fetched_result: Option<TimePeriod>,
    ) {
        self.recalculate_aggregates();
        if fetched_phenomenon.is_some() && fetched_phenomenon != self.global_phenomenon_time {
            debug!(
                "Fetched global phenomenon time {:?} differs from offerings {:?}",
                fetched_phenomenon, self.global_phenomenon_time
            );
        }
        if fetched_result.is_some() && fetched_result != self.global_result_time {
            debug!(
                "Fetched global result time {:?} differs from offerings {:?}",
                fetched_result, self.global_result_time
            );
        }
    }

    pub fn summary(&self) -> CacheSummary {
        let mut supported_languages: Vec<String> =
            self.get_supported_languages().iter().cloned().collect();
        supported_languages.sort();
        CacheSummary {
            offerings: self.get_offerings().len(),
            published_offerings: self.get_published_offerings().len(),
            procedures: self.get_procedures().len(),
            observable_properties: self.get_observable_properties().len(),
            features_of_interest: self.get_features_of_interest().len(),
            related_features: self.get_related_features().len(),
            result_templates: self.get_result_templates().len(),
            composite_phenomena: self.get_composite_phenomena().len(),
            supported_languages,
            has_global_envelope: self.get_global_envelope().is_some(),
            phenomenon_time: self.global_phenomenon_time,
            result_time: self.global_result_time,
        }
    }
}

fn fold_periods<'a>(periods: impl Iterator<Item = &'a TimePeriod>) -> Option<TimePeriod> {
    let mut acc = None;
    for period in periods {
        period.fold_into(&mut acc);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use sensorcache_common::{Envelope, Time};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_recalculate_from_offerings() {
        let mut store = CacheStore::new();
        store.set_phenomenon_time_for_offering("off1", Some(TimePeriod::new(ts(1), ts(3))));
        store.set_phenomenon_time_for_offering("off2", Some(TimePeriod::new(ts(2), ts(9))));
        store.set_result_time_for_offering("off2", Some(TimePeriod::instant(ts(4))));
        store.set_envelope_for_offering("off1", Some(Envelope::new(4326, 0.0, 0.0, 1.0, 1.0)));
        store.set_envelope_for_offering("off2", Some(Envelope::new(4326, 5.0, 5.0, 6.0, 6.0)));

        // a stale wider global time must shrink back
        store.update_phenomenon_time(&Time::at(ts(20)));
        store.recalculate_aggregates();

        assert_eq!(
            store.get_global_phenomenon_time(),
            Some(&TimePeriod::new(ts(1), ts(9)))
        );
        assert_eq!(
            store.get_global_result_time(),
            Some(&TimePeriod::instant(ts(4)))
        );
        assert_eq!(
            store.get_global_envelope(),
            Some(&Envelope::new(4326, 0.0, 0.0, 6.0, 6.0))
        );
    }

    #[test]
    fn test_recalculate_empty_clears() {
        let mut store = CacheStore::new();
        store.update_phenomenon_time(&Time::at(ts(1)));
        store.update_global_envelope(&Envelope::point(4326, 1.0, 1.0));
        store.recalculate_aggregates();
        assert!(store.get_global_phenomenon_time().is_none());
        assert!(store.get_global_envelope().is_none());
    }

    #[test]
    fn test_validate_ok_on_consistent_store() {
        let mut store = CacheStore::new();
        store.add_procedure_for_offering("off1", "proc1");
        store.add_hidden_child_procedure_for_offering("off1", "proc2");
        store.add_observable_property_for_composite_phenomenon("weather", "temp");
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_validate_detects_direct_and_hidden() {
        let mut store = CacheStore::new();
        store.add_hidden_child_procedure_for_offering("off1", "proc1");
        // bypass the public API which keeps the two apart
        store.offering_procedures.insert("off1", "proc1");
        let err = store.validate().unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_summary_counts() {
        let mut store = CacheStore::new();
        store.add_offering("off1");
        store.add_published_offering("off1");
        store.add_procedure("proc1");
        store.add_supported_language("ger");
        store.add_supported_language("eng");
        store.add_related_feature_for_offering("off1", "rf1");

        let summary = store.summary();
        assert_eq!(summary.offerings, 1);
        assert_eq!(summary.published_offerings, 1);
        assert_eq!(summary.procedures, 1);
        assert_eq!(summary.related_features, 1);
        assert_eq!(summary.supported_languages, vec!["eng", "ger"]);
        assert!(!summary.has_global_envelope);
    }

    #[derive(Clone, Debug)]
    enum StoreOp {
        LinkProcedure(u8, u8),
        HideProcedure(u8, u8),
        UnlinkProcedure(u8),
        SetFeatures(u8, Vec<u8>),
        DropOfferingFeatures(u8),
        LinkTemplate(u8, u8),
        DropTemplateOfferings(u8),
    }

    fn arb_store_op() -> impl Strategy<Value = StoreOp> {
        prop_oneof![
            (0u8..4, 0u8..4).prop_map(|(o, p)| StoreOp::LinkProcedure(o, p)),
            (0u8..4, 0u8..4).prop_map(|(o, p)| StoreOp::HideProcedure(o, p)),
            (0u8..4).prop_map(StoreOp::UnlinkProcedure),
            (0u8..4, prop::collection::vec(0u8..4, 0..3))
                .prop_map(|(o, fs)| StoreOp::SetFeatures(o, fs)),
            (0u8..4).prop_map(StoreOp::DropOfferingFeatures),
            (0u8..4, 0u8..4).prop_map(|(o, t)| StoreOp::LinkTemplate(o, t)),
            (0u8..4).prop_map(StoreOp::DropTemplateOfferings),
        ]
    }

    proptest! {
        #[test]
        fn store_stays_valid(ops in prop::collection::vec(arb_store_op(), 1..48)) {
            let mut store = CacheStore::new();
            for op in ops {
                match op {
                    StoreOp::LinkProcedure(o, p) => {
                        store.add_procedure_for_offering(&format!("off{o}"), &format!("proc{p}"));
                    }
                    StoreOp::HideProcedure(o, p) => {
                        store.add_hidden_child_procedure_for_offering(&format!("off{o}"), &format!("proc{p}"));
                    }
                    StoreOp::UnlinkProcedure(p) => {
                        store.remove_offerings_for_procedure(&format!("proc{p}"));
                    }
                    StoreOp::SetFeatures(o, fs) => {
                        store.set_features_of_interest_for_offering(
                            &format!("off{o}"),
                            fs.iter().map(|f| format!("foi{f}")),
                        );
                    }
                    StoreOp::DropOfferingFeatures(o) => {
                        store.remove_features_of_interest_for_offering(&format!("off{o}"));
                    }
                    StoreOp::LinkTemplate(o, t) => {
                        store.add_result_template_for_offering(&format!("off{o}"), &format!("tpl{t}"));
                    }
                    StoreOp::DropTemplateOfferings(t) => {
                        store.remove_offerings_for_result_template(&format!("tpl{t}"));
                    }
                }
                prop_assert!(store.validate().is_ok());
            }
        }
    }
}
