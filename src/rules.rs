//! Duration → reason-code classification.
//!
//! A [`RuleBook`] holds an ordered table of upper bounds, a list of
//! explicit tolerance bands, and the [`MatchPolicy`] that decides what
//! happens to durations beyond every bound.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReasonerError;

/// One bucket: durations up to and including `max_hours` map to `reason_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationRule {
    pub label: String,
    pub max_hours: f64,
    pub reason_code: u32,
}

impl DurationRule {
    pub fn new(label: &str, max_hours: f64, reason_code: u32) -> Self {
        Self {
            label: label.to_string(),
            max_hours,
            reason_code,
        }
    }
}

/// A narrow window around one exact duration that maps to its own reason,
/// even though it lies past the last bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub label: String,
    pub hours: f64,
    pub tolerance_hours: f64,
    pub reason_code: u32,
}

impl ToleranceBand {
    pub fn contains(&self, hours: f64) -> bool {
        (hours - self.hours).abs() <= self.tolerance_hours
    }

    pub fn as_rule(&self) -> DurationRule {
        DurationRule::new(&self.label, self.hours, self.reason_code)
    }
}

/// What to do with a duration larger than every bucket bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Leave it unclassified so the caller skips it.
    #[default]
    Strict,
    /// Put it in the last bucket.
    CatchAll,
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Strict => write!(f, "strict"),
            MatchPolicy::CatchAll => write!(f, "catch-all"),
        }
    }
}

/// First rule whose bound is at least `hours`; a value equal to a bound
/// stays in that bucket. Past the last bound, [`MatchPolicy::CatchAll`]
/// yields the last rule and [`MatchPolicy::Strict`] yields `None`.
/// An empty table always yields `None`.
pub fn classify(
    hours: f64,
    rules: &[DurationRule],
    policy: MatchPolicy,
) -> Option<&DurationRule> {
    if let Some(rule) = rules.iter().find(|r| hours <= r.max_hours) {
        return Some(rule);
    }
    match policy {
        MatchPolicy::Strict => None,
        MatchPolicy::CatchAll => rules.last(),
    }
}

/// The immutable classification table for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBook {
    rules: Vec<DurationRule>,
    bands: Vec<ToleranceBand>,
    policy: MatchPolicy,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            bands: default_bands(),
            policy: MatchPolicy::Strict,
        }
    }
}

/// Standard buckets, up to the 8 hour ceiling.
pub fn default_rules() -> Vec<DurationRule> {
    vec![
        DurationRule::new("≤ 15 min", 0.25, 21),   // Jumper Touching
        DurationRule::new("15 min–1 hr", 1.0, 20), // Jumper Burnt
        DurationRule::new("1–3 hours", 3.0, 31),   // Tree / Tree Branch Falling
        DurationRule::new("3–8 hours", 8.0, 9),    // Conductor Snapped HT Line
    ]
}

pub fn default_bands() -> Vec<ToleranceBand> {
    vec![ToleranceBand {
        label: "~15.73 hours".to_string(),
        hours: 15.73,
        tolerance_hours: 0.01,
        reason_code: 25, // No Cause found
    }]
}

impl RuleBook {
    /// Builds a rule book, rejecting tables that break first-match semantics.
    pub fn new(
        rules: Vec<DurationRule>,
        bands: Vec<ToleranceBand>,
        policy: MatchPolicy,
    ) -> Result<Self, ReasonerError> {
        for pair in rules.windows(2) {
            if pair[1].max_hours < pair[0].max_hours {
                return Err(ReasonerError::Config(format!(
                    "duration rules must be ordered by max_hours: {:?} ({}) comes after {:?} ({})",
                    pair[1].label, pair[1].max_hours, pair[0].label, pair[0].max_hours
                )));
            }
        }
        if let Some(rule) = rules.iter().find(|r| !r.max_hours.is_finite() || r.max_hours < 0.0) {
            return Err(ReasonerError::Config(format!(
                "rule {:?} has an invalid max_hours {}",
                rule.label, rule.max_hours
            )));
        }
        if let Some(band) = bands
            .iter()
            .find(|b| !b.tolerance_hours.is_finite() || b.tolerance_hours < 0.0)
        {
            return Err(ReasonerError::Config(format!(
                "band {:?} has a negative or invalid tolerance",
                band.label
            )));
        }
        Ok(Self {
            rules,
            bands,
            policy,
        })
    }

    pub fn rules(&self) -> &[DurationRule] {
        &self.rules
    }

    pub fn bands(&self) -> &[ToleranceBand] {
        &self.bands
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Buckets first, then tolerance bands, then the policy's fallback.
    pub fn classify(&self, hours: f64) -> Option<DurationRule> {
        if let Some(rule) = classify(hours, &self.rules, MatchPolicy::Strict) {
            return Some(rule.clone());
        }
        if let Some(band) = self.bands.iter().find(|b| b.contains(hours)) {
            return Some(band.as_rule());
        }
        classify(hours, &self.rules, self.policy).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<DurationRule> {
        vec![
            DurationRule::new("a", 1.0, 1),
            DurationRule::new("b", 4.0, 2),
            DurationRule::new("c", 8.0, 3),
        ]
    }

    #[test]
    fn picks_smallest_satisfying_bound() {
        let rules = table();
        for (hours, code) in [(0.0, 1), (0.5, 1), (1.01, 2), (3.99, 2), (7.5, 3)] {
            let rule = classify(hours, &rules, MatchPolicy::Strict).unwrap();
            assert_eq!(rule.reason_code, code, "hours = {hours}");
        }
    }

    #[test]
    fn boundary_stays_in_bucket() {
        let rules = table();
        assert_eq!(classify(1.0, &rules, MatchPolicy::Strict).unwrap().label, "a");
        assert_eq!(classify(4.0, &rules, MatchPolicy::Strict).unwrap().label, "b");
        assert_eq!(classify(8.0, &rules, MatchPolicy::Strict).unwrap().label, "c");
    }

    #[test]
    fn beyond_last_bound_depends_on_policy() {
        let rules = table();
        assert!(classify(9.0, &rules, MatchPolicy::Strict).is_none());
        assert_eq!(
            classify(9.0, &rules, MatchPolicy::CatchAll).unwrap().label,
            "c"
        );
    }

    #[test]
    fn empty_table_is_none() {
        assert!(classify(1.0, &[], MatchPolicy::Strict).is_none());
        assert!(classify(1.0, &[], MatchPolicy::CatchAll).is_none());
    }

    #[test]
    fn default_book_buckets() {
        let book = RuleBook::default();
        assert_eq!(book.classify(0.25).unwrap().reason_code, 21);
        assert_eq!(book.classify(0.5).unwrap().reason_code, 20);
        assert_eq!(book.classify(2.0).unwrap().reason_code, 31);
        assert_eq!(book.classify(8.0).unwrap().reason_code, 9);
    }

    #[test]
    fn default_book_no_cause_band() {
        let book = RuleBook::default();
        for hours in [15.725, 15.73, 15.7299, 15.735] {
            let rule = book.classify(hours).unwrap();
            assert_eq!(rule.reason_code, 25, "hours = {hours}");
        }
        assert!(book.classify(15.75).is_none());
        assert!(book.classify(15.70).is_none());
    }

    #[test]
    fn default_book_skips_past_ceiling() {
        let book = RuleBook::default();
        assert!(book.classify(9.0).is_none());
        assert!(book.classify(48.0).is_none());
    }

    #[test]
    fn catch_all_book_still_honours_band() {
        let book = RuleBook::new(default_rules(), default_bands(), MatchPolicy::CatchAll).unwrap();
        assert_eq!(book.classify(15.73).unwrap().reason_code, 25);
        assert_eq!(book.classify(9.0).unwrap().reason_code, 9);
    }

    #[test]
    fn rejects_unordered_rules() {
        let rules = vec![DurationRule::new("x", 4.0, 1), DurationRule::new("y", 2.0, 2)];
        let err = RuleBook::new(rules, vec![], MatchPolicy::Strict).unwrap_err();
        assert!(matches!(err, ReasonerError::Config(_)));
    }

    #[test]
    fn rejects_negative_tolerance() {
        let band = ToleranceBand {
            label: "bad".into(),
            hours: 5.0,
            tolerance_hours: -0.1,
            reason_code: 1,
        };
        assert!(RuleBook::new(default_rules(), vec![band], MatchPolicy::Strict).is_err());
    }

    #[test]
    fn policy_display() {
        assert_eq!(MatchPolicy::Strict.to_string(), "strict");
        assert_eq!(MatchPolicy::CatchAll.to_string(), "catch-all");
    }
}
