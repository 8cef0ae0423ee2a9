//! Value types for the content cache
//!
//! Spatial envelopes, time extents and localized strings. Identifiers of
//! offerings, procedures, properties, features and templates are plain
//! `String`s throughout the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum bounding rectangle of a set of geometries
///
/// Envelopes folded into each other are assumed to share one SRID; the
/// receiving envelope keeps its own.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub srid: i32,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Create an envelope from two corners in any order
    #[must_use]
    pub fn new(srid: i32, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            srid,
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Degenerate envelope of a single point
    #[must_use]
    pub fn point(srid: i32, x: f64, y: f64) -> Self {
        Self::new(srid, x, y, x, y)
    }

    /// Grow this envelope so that it also covers `other`
    pub fn expand_to_include(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Fold this envelope into an optional accumulator
    pub fn fold_into(&self, slot: &mut Option<Envelope>) {
        match slot {
            Some(existing) => existing.expand_to_include(self),
            None => *slot = Some(*self),
        }
    }

    /// Check if `other` lies completely inside this envelope
    #[must_use]
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }
}

/// Closed time interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimePeriod {
    /// Create a period from two instants in any order
    #[must_use]
    pub fn new(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Zero-length period
    #[must_use]
    pub fn instant(t: DateTime<Utc>) -> Self {
        Self { start: t, end: t }
    }

    /// Grow this period so that it also covers `other`
    pub fn extend(&mut self, other: &TimePeriod) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }

    /// Fold this period into an optional accumulator
    pub fn fold_into(&self, slot: &mut Option<TimePeriod>) {
        match slot {
            Some(existing) => existing.extend(self),
            None => *slot = Some(*self),
        }
    }

    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Phenomenon or result time of an observation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Time {
    Instant { at: DateTime<Utc> },
    Period { period: TimePeriod },
}

impl Time {
    #[must_use]
    pub fn at(t: DateTime<Utc>) -> Self {
        Self::Instant { at: t }
    }

    #[must_use]
    pub fn between(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        Self::Period {
            period: TimePeriod::new(a, b),
        }
    }

    /// The extent covered by this time
    #[must_use]
    pub fn to_period(&self) -> TimePeriod {
        match self {
            Self::Instant { at } => TimePeriod::instant(*at),
            Self::Period { period } => *period,
        }
    }
}

impl From<TimePeriod> for Time {
    fn from(period: TimePeriod) -> Self {
        Self::Period { period }
    }
}

/// Text with one localization per locale tag (e.g. "eng", "ger")
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultilingualString {
    localizations: BTreeMap<String, String>,
}

impl MultilingualString {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-localization constructor
    #[must_use]
    pub fn with(locale: impl Into<String>, text: impl Into<String>) -> Self {
        let mut s = Self::new();
        s.add_localization(locale, text);
        s
    }

    /// Add or replace the text for a locale
    pub fn add_localization(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.localizations.insert(locale.into(), text.into());
    }

    #[must_use]
    pub fn localization(&self, locale: &str) -> Option<&str> {
        self.localizations.get(locale).map(String::as_str)
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.localizations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.localizations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.localizations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_envelope_normalizes_corners() {
        let env = Envelope::new(4326, 10.0, 5.0, -1.0, 7.0);
        assert_eq!(env.min_x, -1.0);
        assert_eq!(env.max_x, 10.0);
        assert_eq!(env.min_y, 5.0);
        assert_eq!(env.max_y, 7.0);
    }

    #[test]
    fn test_envelope_fold() {
        let mut slot = None;
        Envelope::point(4326, 1.0, 1.0).fold_into(&mut slot);
        Envelope::point(4326, -2.0, 3.0).fold_into(&mut slot);
        let env = slot.unwrap();
        assert_eq!(env, Envelope::new(4326, -2.0, 1.0, 1.0, 3.0));
        assert!(env.contains(&Envelope::point(4326, 0.0, 2.0)));
        assert!(!env.contains(&Envelope::point(4326, 5.0, 2.0)));
    }

    #[test]
    fn test_time_period_fold() {
        let mut slot = None;
        Time::at(ts(5)).to_period().fold_into(&mut slot);
        Time::between(ts(9), ts(2)).to_period().fold_into(&mut slot);
        let period = slot.unwrap();
        assert_eq!(period.start, ts(2));
        assert_eq!(period.end, ts(9));
        assert!(period.contains(ts(5)));
    }

    #[test]
    fn test_multilingual_string() {
        let mut name = MultilingualString::with("eng", "Temperature");
        name.add_localization("ger", "Temperatur");
        assert_eq!(name.localization("ger"), Some("Temperatur"));
        assert_eq!(name.locales().collect::<Vec<_>>(), vec!["eng", "ger"]);
        assert_eq!(name.len(), 2);
    }

    #[test]
    fn test_time_serde_tagged() {
        let json = serde_json::to_string(&Time::at(ts(1))).unwrap();
        assert!(json.contains("\"type\":\"instant\""));
        let back: Time = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Time::at(ts(1)));
    }
}
