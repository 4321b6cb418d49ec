//! Constraint evaluation over extracted records.
//!
//! Not a chemistry rules engine. The checks exist to flag obviously invalid
//! records (unit/dimension mismatches) and cross-record anomalies (Mw < Mn,
//! dispersity below 1) in an auditable way. Evaluation is pure: it takes the
//! records and returns them with `constraints` populated.

use std::collections::HashMap;

use crate::model::Record;
use crate::ontology::expected_dimension;
use crate::units::unit_lookup;

/// Evaluate per-record and cross-record constraints.
pub fn evaluate_constraints(mut records: Vec<Record>) -> Vec<Record> {
    for r in &mut records {
        r.constraints = Default::default();
        let Some(expected) = expected_dimension(&r.property) else {
            continue;
        };

        let unit = r.unit_original.as_str();
        if expected == "dimensionless" {
            // Allow empty unit, %, or any explicitly dimensionless unit.
            let info = unit_lookup(unit);
            let compatible = unit.is_empty()
                || unit == "%"
                || info.is_some_and(|i| i.dimension == "dimensionless");
            if compatible {
                r.constraints.hard_pass.push("unit_dimension_compatible".into());
            } else {
                r.constraints
                    .soft_warn
                    .push(format!("unit_unexpected_for_dimensionless:{unit}"));
            }
        } else {
            match unit_lookup(unit) {
                None => r.constraints.hard_fail.push("unit_unknown".into()),
                Some(info) if info.dimension == expected => {
                    r.constraints.hard_pass.push("unit_dimension_compatible".into());
                }
                Some(info) => {
                    r.constraints.hard_fail.push(format!(
                        "unit_dimension_mismatch:{expected}!={}",
                        info.dimension
                    ));
                }
            }
        }
    }

    polymer_cross_constraints(&mut records);
    records
}

/// Cross-record polymer sanity checks per material: Mw >= Mn, dispersity >= 1.
fn polymer_cross_constraints(records: &mut [Record]) {
    let mut by_material: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        by_material.entry(r.material.clone()).or_default().push(i);
    }

    for idxs in by_material.values() {
        let best = |prop: &str| -> Option<usize> {
            idxs.iter()
                .copied()
                .filter(|&i| records[i].property == prop)
                .max_by(|&a, &b| {
                    records[a]
                        .confidence
                        .partial_cmp(&records[b].confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        };

        if let (Some(mn_i), Some(mw_i)) = (
            best("number_average_molecular_weight"),
            best("weight_average_molecular_weight"),
        ) {
            let mn = records[mn_i].best_value_min();
            let mw = records[mw_i].best_value_min();
            if mw + 1e-12 >= mn {
                records[mn_i].constraints.hard_pass.push("mw_ge_mn_consistent".into());
                records[mw_i].constraints.hard_pass.push("mw_ge_mn_consistent".into());
            } else {
                records[mn_i].constraints.soft_warn.push("mw_lt_mn_anomaly".into());
                records[mw_i].constraints.soft_warn.push("mw_lt_mn_anomaly".into());
            }
        }

        for &i in idxs {
            if records[i].property == "dispersity" && records[i].value_min < 1.0 {
                records[i]
                    .constraints
                    .soft_warn
                    .push("dispersity_lt_1_anomaly".into());
            }
        }
    }
}
