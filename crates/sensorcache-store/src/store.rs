//! The content cache store
//!
//! [`CacheStore`] mirrors the metadata of the observation database: which
//! offerings exist, which procedures observe which properties at which
//! features, through which result templates, over which time ranges and
//! spatial extent. It is plain data; concurrency control lives in the
//! controller.
//!
//! Every `add_x_for_y` / `remove_x_for_y` pair goes through a [`Relation`],
//! so both lookup directions change together. Removing something that is not
//! there is a silent no-op. There is no "delete entity" primitive: callers
//! unlink an entity from every relation before removing its existence record.

use crate::relation::{IdSet, Relation};
use sensorcache_common::{Envelope, MultilingualString, Time, TimePeriod};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStore {
    // Entity sets
    offerings: IdSet,
    published_offerings: IdSet,
    procedures: IdSet,
    published_procedures: IdSet,
    observable_properties: IdSet,
    published_observable_properties: IdSet,
    features_of_interest: IdSet,
    published_features_of_interest: IdSet,
    result_templates: IdSet,
    composite_phenomena: IdSet,
    supported_languages: IdSet,

    // Relations, named left_right
    pub(crate) offering_procedures: Relation,
    pub(crate) offering_hidden_children: Relation,
    pub(crate) offering_observable_properties: Relation,
    pub(crate) offering_features: Relation,
    pub(crate) offering_result_templates: Relation,
    pub(crate) offering_composite_phenomena: Relation,
    pub(crate) offering_related_features: Relation,
    pub(crate) procedure_observable_properties: Relation,
    pub(crate) procedure_features: Relation,
    pub(crate) procedure_composite_phenomena: Relation,
    pub(crate) result_template_observable_properties: Relation,
    pub(crate) result_template_features: Relation,
    pub(crate) composite_phenomenon_components: Relation,

    // Per-offering attributes
    observation_types_for_offering: HashMap<String, IdSet>,
    feature_types_for_offering: HashMap<String, IdSet>,
    pub(crate) envelope_for_offering: HashMap<String, Envelope>,
    pub(crate) phenomenon_time_for_offering: HashMap<String, TimePeriod>,
    pub(crate) result_time_for_offering: HashMap<String, TimePeriod>,
    i18n_names_for_offering: HashMap<String, MultilingualString>,
    i18n_descriptions_for_offering: HashMap<String, MultilingualString>,

    phenomenon_time_for_procedure: HashMap<String, TimePeriod>,
    roles_for_related_feature: HashMap<String, IdSet>,

    // Human readable names (identifier -> name)
    offering_names: HashMap<String, String>,
    procedure_names: HashMap<String, String>,
    observable_property_names: HashMap<String, String>,
    feature_names: HashMap<String, String>,

    // Aggregates
    pub(crate) global_envelope: Option<Envelope>,
    pub(crate) global_phenomenon_time: Option<TimePeriod>,
    pub(crate) global_result_time: Option<TimePeriod>,
}

impl CacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Offerings ----

    pub fn add_offering(&mut self, offering: &str) {
        self.offerings.insert(offering.to_string());
    }

    pub fn remove_offering(&mut self, offering: &str) {
        self.offerings.remove(offering);
    }

    pub fn has_offering(&self, offering: &str) -> bool {
        self.offerings.contains(offering)
    }

    pub fn get_offerings(&self) -> &IdSet {
        &self.offerings
    }

    pub fn add_published_offering(&mut self, offering: &str) {
        self.published_offerings.insert(offering.to_string());
    }

    pub fn remove_published_offering(&mut self, offering: &str) {
        self.published_offerings.remove(offering);
    }

    pub fn get_published_offerings(&self) -> &IdSet {
        &self.published_offerings
    }

    pub fn set_name_for_offering(&mut self, offering: &str, name: &str) {
        self.offering_names
            .insert(offering.to_string(), name.to_string());
    }

    pub fn get_name_for_offering(&self, offering: &str) -> Option<&str> {
        self.offering_names.get(offering).map(String::as_str)
    }

    /// Drop the human readable and localized names and description
    pub fn remove_name_for_offering(&mut self, offering: &str) {
        self.offering_names.remove(offering);
        self.i18n_names_for_offering.remove(offering);
        self.i18n_descriptions_for_offering.remove(offering);
    }

    pub fn set_i18n_name_for_offering(&mut self, offering: &str, name: MultilingualString) {
        self.i18n_names_for_offering
            .insert(offering.to_string(), name);
    }

    pub fn get_i18n_name_for_offering(&self, offering: &str) -> Option<&MultilingualString> {
        self.i18n_names_for_offering.get(offering)
    }

    pub fn set_i18n_description_for_offering(
        &mut self,
        offering: &str,
        description: MultilingualString,
    ) {
        self.i18n_descriptions_for_offering
            .insert(offering.to_string(), description);
    }

    pub fn get_i18n_description_for_offering(
        &self,
        offering: &str,
    ) -> Option<&MultilingualString> {
        self.i18n_descriptions_for_offering.get(offering)
    }

    pub fn add_observation_type_for_offering(&mut self, offering: &str, observation_type: &str) {
        self.observation_types_for_offering
            .entry(offering.to_string())
            .or_default()
            .insert(observation_type.to_string());
    }

    pub fn set_observation_types_for_offering<I, S>(&mut self, offering: &str, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        set_entry(
            &mut self.observation_types_for_offering,
            offering,
            types.into_iter().map(Into::into).collect(),
        );
    }

    pub fn get_observation_types_for_offering(&self, offering: &str) -> IdSet {
        self.observation_types_for_offering
            .get(offering)
            .cloned()
            .unwrap_or_default()
    }

    pub fn remove_observation_types_for_offering(&mut self, offering: &str) {
        self.observation_types_for_offering.remove(offering);
    }

    pub fn set_feature_of_interest_types_for_offering<I, S>(&mut self, offering: &str, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        set_entry(
            &mut self.feature_types_for_offering,
            offering,
            types.into_iter().map(Into::into).collect(),
        );
    }

    pub fn get_feature_of_interest_types_for_offering(&self, offering: &str) -> IdSet {
        self.feature_types_for_offering
            .get(offering)
            .cloned()
            .unwrap_or_default()
    }

    pub fn remove_feature_of_interest_types_for_offering(&mut self, offering: &str) {
        self.feature_types_for_offering.remove(offering);
    }

    // ---- Offering extents ----

    pub fn set_envelope_for_offering(&mut self, offering: &str, envelope: Option<Envelope>) {
        match envelope {
            Some(env) => {
                self.envelope_for_offering.insert(offering.to_string(), env);
            }
            None => {
                self.envelope_for_offering.remove(offering);
            }
        }
    }

    /// Grow the offering's envelope to cover `envelope`
    pub fn update_envelope_for_offering(&mut self, offering: &str, envelope: &Envelope) {
        self.envelope_for_offering
            .entry(offering.to_string())
            .and_modify(|e| e.expand_to_include(envelope))
            .or_insert(*envelope);
    }

    pub fn get_envelope_for_offering(&self, offering: &str) -> Option<&Envelope> {
        self.envelope_for_offering.get(offering)
    }

    pub fn remove_envelope_for_offering(&mut self, offering: &str) {
        self.envelope_for_offering.remove(offering);
    }

    pub fn set_phenomenon_time_for_offering(&mut self, offering: &str, time: Option<TimePeriod>) {
        set_optional(&mut self.phenomenon_time_for_offering, offering, time);
    }

    pub fn update_phenomenon_time_for_offering(&mut self, offering: &str, time: &Time) {
        extend_entry(&mut self.phenomenon_time_for_offering, offering, time);
    }

    pub fn get_phenomenon_time_for_offering(&self, offering: &str) -> Option<&TimePeriod> {
        self.phenomenon_time_for_offering.get(offering)
    }

    pub fn remove_phenomenon_time_for_offering(&mut self, offering: &str) {
        self.phenomenon_time_for_offering.remove(offering);
    }

    pub fn set_result_time_for_offering(&mut self, offering: &str, time: Option<TimePeriod>) {
        set_optional(&mut self.result_time_for_offering, offering, time);
    }

    pub fn update_result_time_for_offering(&mut self, offering: &str, time: &Time) {
        extend_entry(&mut self.result_time_for_offering, offering, time);
    }

    pub fn get_result_time_for_offering(&self, offering: &str) -> Option<&TimePeriod> {
        self.result_time_for_offering.get(offering)
    }

    pub fn remove_result_time_for_offering(&mut self, offering: &str) {
        self.result_time_for_offering.remove(offering);
    }

    // ---- Procedures ----

    pub fn add_procedure(&mut self, procedure: &str) {
        self.procedures.insert(procedure.to_string());
    }

    pub fn remove_procedure(&mut self, procedure: &str) {
        self.procedures.remove(procedure);
    }

    pub fn has_procedure(&self, procedure: &str) -> bool {
        self.procedures.contains(procedure)
    }

    pub fn get_procedures(&self) -> &IdSet {
        &self.procedures
    }

    pub fn add_published_procedure(&mut self, procedure: &str) {
        self.published_procedures.insert(procedure.to_string());
    }

    pub fn remove_published_procedure(&mut self, procedure: &str) {
        self.published_procedures.remove(procedure);
    }

    pub fn get_published_procedures(&self) -> &IdSet {
        &self.published_procedures
    }

    pub fn set_name_for_procedure(&mut self, procedure: &str, name: &str) {
        self.procedure_names
            .insert(procedure.to_string(), name.to_string());
    }

    pub fn get_name_for_procedure(&self, procedure: &str) -> Option<&str> {
        self.procedure_names.get(procedure).map(String::as_str)
    }

    pub fn remove_name_for_procedure(&mut self, procedure: &str) {
        self.procedure_names.remove(procedure);
    }

    /// Link a direct procedure. Hidden children of the offering are skipped.
    pub fn add_procedure_for_offering(&mut self, offering: &str, procedure: &str) {
        if !self.offering_hidden_children.contains(offering, procedure) {
            self.offering_procedures.insert(offering, procedure);
        }
    }

    pub fn remove_procedure_for_offering(&mut self, offering: &str, procedure: &str) {
        self.offering_procedures.remove(offering, procedure);
    }

    pub fn set_procedures_for_offering<I, S>(&mut self, offering: &str, procedures: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.offering_procedures.remove_left(offering);
        for procedure in procedures {
            self.add_procedure_for_offering(offering, procedure.as_ref());
        }
    }

    pub fn remove_procedures_for_offering(&mut self, offering: &str) {
        self.offering_procedures.remove_left(offering);
    }

    /// Direct (non hidden) procedures of an offering
    pub fn get_procedures_for_offering(&self, offering: &str) -> IdSet {
        self.offering_procedures.rights_of(offering)
    }

    /// Offerings that list the procedure directly
    pub fn get_offerings_for_procedure(&self, procedure: &str) -> IdSet {
        self.offering_procedures.lefts_of(procedure)
    }

    /// Offerings the procedure feeds, directly or as hidden child
    pub fn get_all_offerings_for_procedure(&self, procedure: &str) -> IdSet {
        let mut offerings = self.offering_procedures.lefts_of(procedure);
        offerings.extend(self.offering_hidden_children.lefts_of(procedure));
        offerings
    }

    /// Unlink the procedure from every offering, direct and hidden
    pub fn remove_offerings_for_procedure(&mut self, procedure: &str) {
        self.offering_procedures.remove_right(procedure);
        self.offering_hidden_children.remove_right(procedure);
    }

    /// Register a hidden child; it is never listed as a direct procedure
    pub fn add_hidden_child_procedure_for_offering(&mut self, offering: &str, procedure: &str) {
        self.offering_procedures.remove(offering, procedure);
        self.offering_hidden_children.insert(offering, procedure);
    }

    pub fn set_hidden_child_procedures_for_offering<I, S>(&mut self, offering: &str, procedures: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.offering_hidden_children.remove_left(offering);
        for procedure in procedures {
            self.add_hidden_child_procedure_for_offering(offering, procedure.as_ref());
        }
    }

    pub fn get_hidden_child_procedures_for_offering(&self, offering: &str) -> IdSet {
        self.offering_hidden_children.rights_of(offering)
    }

    pub fn is_hidden_child_of(&self, offering: &str, procedure: &str) -> bool {
        self.offering_hidden_children.contains(offering, procedure)
    }

    pub fn remove_hidden_child_procedures_for_offering(&mut self, offering: &str) {
        self.offering_hidden_children.remove_left(offering);
    }

    pub fn set_phenomenon_time_for_procedure(&mut self, procedure: &str, time: Option<TimePeriod>) {
        set_optional(&mut self.phenomenon_time_for_procedure, procedure, time);
    }

    pub fn update_phenomenon_time_for_procedure(&mut self, procedure: &str, time: &Time) {
        extend_entry(&mut self.phenomenon_time_for_procedure, procedure, time);
    }

    pub fn get_phenomenon_time_for_procedure(&self, procedure: &str) -> Option<&TimePeriod> {
        self.phenomenon_time_for_procedure.get(procedure)
    }

    /// Clear both the minimum and maximum phenomenon time of a procedure
    pub fn remove_phenomenon_time_for_procedure(&mut self, procedure: &str) {
        self.phenomenon_time_for_procedure.remove(procedure);
    }

    // ---- Observable properties ----

    pub fn add_observable_property(&mut self, observable_property: &str) {
        self.observable_properties
            .insert(observable_property.to_string());
    }

    pub fn remove_observable_property(&mut self, observable_property: &str) {
        self.observable_properties.remove(observable_property);
        self.published_observable_properties
            .remove(observable_property);
    }

    pub fn get_observable_properties(&self) -> &IdSet {
        &self.observable_properties
    }

    pub fn add_published_observable_property(&mut self, observable_property: &str) {
        self.published_observable_properties
            .insert(observable_property.to_string());
    }

    pub fn get_published_observable_properties(&self) -> &IdSet {
        &self.published_observable_properties
    }

    pub fn set_name_for_observable_property(&mut self, observable_property: &str, name: &str) {
        self.observable_property_names
            .insert(observable_property.to_string(), name.to_string());
    }

    pub fn get_name_for_observable_property(&self, observable_property: &str) -> Option<&str> {
        self.observable_property_names
            .get(observable_property)
            .map(String::as_str)
    }

    pub fn add_observable_property_for_offering(
        &mut self,
        offering: &str,
        observable_property: &str,
    ) {
        self.offering_observable_properties
            .insert(offering, observable_property);
    }

    pub fn remove_observable_property_for_offering(
        &mut self,
        offering: &str,
        observable_property: &str,
    ) {
        self.offering_observable_properties
            .remove(offering, observable_property);
    }

    pub fn set_observable_properties_for_offering<I, S>(&mut self, offering: &str, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.offering_observable_properties
            .set_left(offering, properties);
    }

    pub fn get_observable_properties_for_offering(&self, offering: &str) -> IdSet {
        self.offering_observable_properties.rights_of(offering)
    }

    pub fn get_offerings_for_observable_property(&self, observable_property: &str) -> IdSet {
        self.offering_observable_properties
            .lefts_of(observable_property)
    }

    pub fn remove_observable_properties_for_offering(&mut self, offering: &str) {
        self.offering_observable_properties.remove_left(offering);
    }

    pub fn add_observable_property_for_procedure(
        &mut self,
        procedure: &str,
        observable_property: &str,
    ) {
        self.procedure_observable_properties
            .insert(procedure, observable_property);
    }

    pub fn remove_observable_property_for_procedure(
        &mut self,
        procedure: &str,
        observable_property: &str,
    ) {
        self.procedure_observable_properties
            .remove(procedure, observable_property);
    }

    pub fn get_observable_properties_for_procedure(&self, procedure: &str) -> IdSet {
        self.procedure_observable_properties.rights_of(procedure)
    }

    pub fn get_procedures_for_observable_property(&self, observable_property: &str) -> IdSet {
        self.procedure_observable_properties
            .lefts_of(observable_property)
    }

    // ---- Composite phenomena ----

    pub fn add_composite_phenomenon(&mut self, composite: &str) {
        self.composite_phenomena.insert(composite.to_string());
    }

    pub fn remove_composite_phenomenon(&mut self, composite: &str) {
        self.composite_phenomena.remove(composite);
        self.composite_phenomenon_components.remove_left(composite);
    }

    pub fn get_composite_phenomena(&self) -> &IdSet {
        &self.composite_phenomena
    }

    pub fn is_composite_phenomenon(&self, observable_property: &str) -> bool {
        self.composite_phenomena.contains(observable_property)
    }

    /// Register `component` as a member of the composite phenomenon
    pub fn add_observable_property_for_composite_phenomenon(
        &mut self,
        composite: &str,
        component: &str,
    ) {
        self.composite_phenomenon_components
            .insert(composite, component);
    }

    pub fn get_observable_properties_for_composite_phenomenon(&self, composite: &str) -> IdSet {
        self.composite_phenomenon_components.rights_of(composite)
    }

    pub fn get_composite_phenomena_for_observable_property(&self, component: &str) -> IdSet {
        self.composite_phenomenon_components.lefts_of(component)
    }

    pub fn add_composite_phenomenon_for_offering(&mut self, offering: &str, composite: &str) {
        self.offering_composite_phenomena
            .insert(offering, composite);
    }

    pub fn get_composite_phenomena_for_offering(&self, offering: &str) -> IdSet {
        self.offering_composite_phenomena.rights_of(offering)
    }

    pub fn clear_composite_phenomenon_for_offering(&mut self, offering: &str) {
        self.offering_composite_phenomena.remove_left(offering);
    }

    pub fn add_composite_phenomenon_for_procedure(&mut self, procedure: &str, composite: &str) {
        self.procedure_composite_phenomena
            .insert(procedure, composite);
    }

    pub fn get_composite_phenomena_for_procedure(&self, procedure: &str) -> IdSet {
        self.procedure_composite_phenomena.rights_of(procedure)
    }

    pub fn clear_composite_phenomenon_for_procedure(&mut self, procedure: &str) {
        self.procedure_composite_phenomena.remove_left(procedure);
    }

    // ---- Features of interest ----

    pub fn add_feature_of_interest(&mut self, feature: &str) {
        self.features_of_interest.insert(feature.to_string());
    }

    pub fn remove_feature_of_interest(&mut self, feature: &str) {
        self.features_of_interest.remove(feature);
    }

    pub fn get_features_of_interest(&self) -> &IdSet {
        &self.features_of_interest
    }

    pub fn set_features_of_interest(&mut self, features: IdSet) {
        self.features_of_interest = features;
    }

    pub fn add_published_feature_of_interest(&mut self, feature: &str) {
        self.published_features_of_interest
            .insert(feature.to_string());
    }

    pub fn get_published_features_of_interest(&self) -> &IdSet {
        &self.published_features_of_interest
    }

    pub fn set_published_features_of_interest(&mut self, features: IdSet) {
        self.published_features_of_interest = features;
    }

    pub fn set_name_for_feature_of_interest(&mut self, feature: &str, name: &str) {
        self.feature_names
            .insert(feature.to_string(), name.to_string());
    }

    pub fn get_name_for_feature_of_interest(&self, feature: &str) -> Option<&str> {
        self.feature_names.get(feature).map(String::as_str)
    }

    pub fn add_feature_of_interest_for_offering(&mut self, offering: &str, feature: &str) {
        self.offering_features.insert(offering, feature);
    }

    pub fn set_features_of_interest_for_offering<I, S>(&mut self, offering: &str, features: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.offering_features.set_left(offering, features);
    }

    pub fn get_features_of_interest_for_offering(&self, offering: &str) -> IdSet {
        self.offering_features.rights_of(offering)
    }

    pub fn get_offerings_for_feature_of_interest(&self, feature: &str) -> IdSet {
        self.offering_features.lefts_of(feature)
    }

    pub fn remove_features_of_interest_for_offering(&mut self, offering: &str) {
        self.offering_features.remove_left(offering);
    }

    /// Features that are still linked to at least one offering
    pub fn get_features_of_interest_with_offering(&self) -> IdSet {
        self.offering_features.rights().cloned().collect()
    }

    pub fn add_procedure_for_feature_of_interest(&mut self, feature: &str, procedure: &str) {
        self.procedure_features.insert(procedure, feature);
    }

    pub fn remove_procedure_for_feature_of_interest(&mut self, feature: &str, procedure: &str) {
        self.procedure_features.remove(procedure, feature);
    }

    /// Drop the feature's procedure set entirely
    pub fn remove_procedures_for_feature_of_interest(&mut self, feature: &str) {
        self.procedure_features.remove_right(feature);
    }

    pub fn get_procedures_for_feature_of_interest(&self, feature: &str) -> IdSet {
        self.procedure_features.lefts_of(feature)
    }

    pub fn get_features_of_interest_for_procedure(&self, procedure: &str) -> IdSet {
        self.procedure_features.rights_of(procedure)
    }

    // ---- Related features ----

    pub fn add_related_feature_for_offering(&mut self, offering: &str, related_feature: &str) {
        self.offering_related_features
            .insert(offering, related_feature);
    }

    pub fn get_related_features_for_offering(&self, offering: &str) -> IdSet {
        self.offering_related_features.rights_of(offering)
    }

    pub fn remove_related_features_for_offering(&mut self, offering: &str) {
        self.offering_related_features.remove_left(offering);
    }

    /// Related features linked to at least one offering
    pub fn get_related_features(&self) -> IdSet {
        self.offering_related_features.rights().cloned().collect()
    }

    pub fn add_role_for_related_feature(&mut self, related_feature: &str, role: &str) {
        self.roles_for_related_feature
            .entry(related_feature.to_string())
            .or_default()
            .insert(role.to_string());
    }

    pub fn get_roles_for_related_feature(&self, related_feature: &str) -> IdSet {
        self.roles_for_related_feature
            .get(related_feature)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget the roles of every related feature not in `keep`
    pub fn remove_roles_for_related_feature_not_in(&mut self, keep: &IdSet) {
        self.roles_for_related_feature
            .retain(|feature, _| keep.contains(feature));
    }

    // ---- Result templates ----

    pub fn add_result_template(&mut self, template: &str) {
        self.result_templates.insert(template.to_string());
    }

    pub fn remove_result_template(&mut self, template: &str) {
        self.result_templates.remove(template);
    }

    pub fn remove_result_templates(&mut self, templates: &IdSet) {
        for template in templates {
            self.result_templates.remove(template);
        }
    }

    pub fn has_result_template(&self, template: &str) -> bool {
        self.result_templates.contains(template)
    }

    pub fn get_result_templates(&self) -> &IdSet {
        &self.result_templates
    }

    pub fn add_result_template_for_offering(&mut self, offering: &str, template: &str) {
        self.offering_result_templates.insert(offering, template);
    }

    pub fn get_result_templates_for_offering(&self, offering: &str) -> IdSet {
        self.offering_result_templates.rights_of(offering)
    }

    pub fn get_offerings_for_result_template(&self, template: &str) -> IdSet {
        self.offering_result_templates.lefts_of(template)
    }

    pub fn remove_result_templates_for_offering(&mut self, offering: &str) {
        self.offering_result_templates.remove_left(offering);
    }

    pub fn remove_offerings_for_result_template(&mut self, template: &str) {
        self.offering_result_templates.remove_right(template);
    }

    pub fn add_observable_property_for_result_template(
        &mut self,
        template: &str,
        observable_property: &str,
    ) {
        self.result_template_observable_properties
            .insert(template, observable_property);
    }

    pub fn get_observable_properties_for_result_template(&self, template: &str) -> IdSet {
        self.result_template_observable_properties
            .rights_of(template)
    }

    pub fn remove_observable_properties_for_result_template(&mut self, template: &str) {
        self.result_template_observable_properties
            .remove_left(template);
    }

    pub fn add_feature_of_interest_for_result_template(&mut self, template: &str, feature: &str) {
        self.result_template_features.insert(template, feature);
    }

    pub fn get_features_of_interest_for_result_template(&self, template: &str) -> IdSet {
        self.result_template_features.rights_of(template)
    }

    pub fn remove_features_of_interest_for_result_template(&mut self, template: &str) {
        self.result_template_features.remove_left(template);
    }

    // ---- Supported languages ----

    pub fn add_supported_language(&mut self, locale: &str) {
        self.supported_languages.insert(locale.to_string());
    }

    pub fn get_supported_languages(&self) -> &IdSet {
        &self.supported_languages
    }

    // ---- Global aggregates ----

    pub fn get_global_envelope(&self) -> Option<&Envelope> {
        self.global_envelope.as_ref()
    }

    pub fn set_global_envelope(&mut self, envelope: Option<Envelope>) {
        self.global_envelope = envelope;
    }

    /// Grow the global envelope to cover `envelope`
    pub fn update_global_envelope(&mut self, envelope: &Envelope) {
        envelope.fold_into(&mut self.global_envelope);
    }

    pub fn get_global_phenomenon_time(&self) -> Option<&TimePeriod> {
        self.global_phenomenon_time.as_ref()
    }

    pub fn set_global_phenomenon_time(&mut self, time: Option<TimePeriod>) {
        self.global_phenomenon_time = time;
    }

    pub fn update_phenomenon_time(&mut self, time: &Time) {
        time.to_period().fold_into(&mut self.global_phenomenon_time);
    }

    pub fn get_global_result_time(&self) -> Option<&TimePeriod> {
        self.global_result_time.as_ref()
    }

    pub fn set_global_result_time(&mut self, time: Option<TimePeriod>) {
        self.global_result_time = time;
    }

    pub fn update_result_time(&mut self, time: &Time) {
        time.to_period().fold_into(&mut self.global_result_time);
    }
}

fn set_entry(map: &mut HashMap<String, IdSet>, key: &str, values: IdSet) {
    if values.is_empty() {
        map.remove(key);
    } else {
        map.insert(key.to_string(), values);
    }
}

fn set_optional<T>(map: &mut HashMap<String, T>, key: &str, value: Option<T>) {
    match value {
        Some(v) => {
            map.insert(key.to_string(), v);
        }
        None => {
            map.remove(key);
        }
    }
}

fn extend_entry(map: &mut HashMap<String, TimePeriod>, key: &str, time: &Time) {
    let period = time.to_period();
    map.entry(key.to_string())
        .and_modify(|p| p.extend(&period))
        .or_insert(period);
}
