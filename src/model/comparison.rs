//! Comparison table row types: this work vs paper-cited literature vs an
//! external baseline database.

use serde::{Deserialize, Serialize};

/// Conservative novelty label for a (material, property) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Novelty {
    /// This-work range lies outside the range the paper itself cites.
    NewRegimeVsCitedLit,
    /// The paper cites literature values for the same property.
    ComparedToCitedLit,
    /// No cited or baseline values to compare against.
    PotentiallyNewProperty,
    /// This-work range lies outside the external baseline range.
    NewRegimeVsBaseline,
    WithinBaselineRange,
}

impl Novelty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Novelty::NewRegimeVsCitedLit => "new_regime_vs_cited_lit",
            Novelty::ComparedToCitedLit => "compared_to_cited_lit",
            Novelty::PotentiallyNewProperty => "potentially_new_property",
            Novelty::NewRegimeVsBaseline => "new_regime_vs_baseline",
            Novelty::WithinBaselineRange => "within_baseline_range",
        }
    }
}

impl std::fmt::Display for Novelty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric summary of a set of records, as a min..max range with a display
/// string. Empty when no numeric values were available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl RangeSummary {
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }
}

/// One row of the three-way comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub material: String,
    pub property: String,
    pub category: String,
    pub this_work: String,
    pub paper_cited_literature: String,
    pub external_baseline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novelty_flag: Option<Novelty>,
    /// Citations backing the paper-cited column, joined and truncated.
    pub paper_citations: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_novelty_serde_labels() {
        assert_eq!(
            serde_json::to_string(&Novelty::NewRegimeVsCitedLit).unwrap(),
            "\"new_regime_vs_cited_lit\""
        );
        assert_eq!(Novelty::WithinBaselineRange.as_str(), "within_baseline_range");
    }

    #[test]
    fn test_empty_summary() {
        let s = RangeSummary::default();
        assert!(s.is_empty());
        assert_eq!(s.display, "");
    }
}
