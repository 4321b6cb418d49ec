//! The measurement record: one extracted (material, property, value) claim
//! with provenance, normalization traces, and constraint verdicts.

use serde::{Deserialize, Serialize};

use crate::access::BBox;
use crate::origin::{Origin, OriginRationale};

/// Where a record was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Text,
    Table,
}

/// Layout-anchored provenance for a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// 1-based page number, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    /// Whitespace-collapsed source text around the value.
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_caption: Option<String>,
}

/// Audit trail entry for a unit conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationTrace {
    pub from: String,
    pub to: String,
    pub dimension: String,
}

impl NormalizationTrace {
    /// Build the trace for a normalized value or range; `None` when
    /// normalization did not happen.
    pub fn build(
        vmin: f64,
        vmax: Option<f64>,
        unit: &str,
        si_min: Option<f64>,
        si_max: Option<f64>,
        si_unit: Option<&str>,
        dimension: Option<&str>,
    ) -> Option<Self> {
        let (si_min, si_unit, dimension) = match (si_min, si_unit, dimension) {
            (Some(v), Some(u), Some(d)) => (v, u, d),
            _ => return None,
        };
        match (vmax, si_max) {
            (Some(vmax), Some(si_max)) if vmax != vmin => Some(Self {
                from: format!("{vmin}-{vmax} {unit}"),
                to: format!("{si_min}-{si_max} {si_unit}"),
                dimension: dimension.to_string(),
            }),
            _ => Some(Self {
                from: format!("{vmin} {unit}"),
                to: format!("{si_min} {si_unit}"),
                dimension: dimension.to_string(),
            }),
        }
    }
}

/// Constraint verdicts attached to a record.
///
/// `hard_fail` tags mark records that downstream consumers should treat as
/// suspect; `soft_warn` tags are anomalies worth a human look.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    pub hard_pass: Vec<String>,
    pub hard_fail: Vec<String>,
    pub soft_warn: Vec<String>,
}

impl Constraints {
    pub fn is_hard_fail(&self) -> bool {
        !self.hard_fail.is_empty()
    }
}

/// One extracted measurement claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub doc_id: String,
    pub source_type: SourceType,
    pub material: String,
    /// Canonical property key from the ontology, or `"unknown"`.
    pub property: String,
    pub category: String,
    pub value_min: f64,
    /// Equal to `value_min` for point values.
    pub value_max: f64,
    pub unit_original: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_si_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_si_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_si: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub origin: Origin,
    pub origin_rationale: OriginRationale,
    pub citations: Vec<String>,
    /// Heuristic confidence in [0, 0.99], rounded to 3 decimals.
    pub confidence: f64,
    pub provenance: Provenance,
    pub normalization_traces: Vec<NormalizationTrace>,
    #[serde(default)]
    pub constraints: Constraints,
}

impl Record {
    /// Best available lower value for comparisons: SI when present.
    pub fn best_value_min(&self) -> f64 {
        self.value_si_min.unwrap_or(self.value_min)
    }
}

/// Round a confidence score to 3 decimals.
pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_trace_point_value() {
        let t = NormalizationTrace::build(
            1.2,
            Some(1.2),
            "mS/cm",
            Some(0.12),
            Some(0.12),
            Some("S/m"),
            Some("conductivity"),
        )
        .unwrap();
        assert_eq!(t.from, "1.2 mS/cm");
        assert_eq!(t.to, "0.12 S/m");
        assert_eq!(t.dimension, "conductivity");
    }

    #[test]
    fn test_norm_trace_range() {
        let t = NormalizationTrace::build(
            1.0,
            Some(2.0),
            "kPa",
            Some(1000.0),
            Some(2000.0),
            Some("Pa"),
            Some("pressure"),
        )
        .unwrap();
        assert_eq!(t.from, "1-2 kPa");
        assert_eq!(t.to, "1000-2000 Pa");
    }

    #[test]
    fn test_norm_trace_absent_without_si() {
        assert!(NormalizationTrace::build(1.0, None, "widgets", None, None, None, None).is_none());
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.8500000000001), 0.85);
        assert_eq!(round3(0.9991), 0.999);
    }

    #[test]
    fn test_source_type_serde() {
        assert_eq!(serde_json::to_string(&SourceType::Text).unwrap(), "\"text\"");
        assert_eq!(serde_json::to_string(&SourceType::Table).unwrap(), "\"table\"");
    }
}
