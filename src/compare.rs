//! Three-way comparison: this work vs paper-cited literature vs an external
//! baseline database.

use std::collections::BTreeMap;

use crate::baseline::BaselineRecord;
use crate::model::{ComparisonRow, Novelty, RangeSummary, Record};
use crate::origin::Origin;

/// Relative tolerance when deciding a range lies outside another.
const NOVELTY_TOL: f64 = 0.05;

/// Build the comparison table, one row per (material, property) group, sorted.
pub fn build_comparison_table(
    records: &[Record],
    baseline_records: &[BaselineRecord],
) -> Vec<ComparisonRow> {
    let mut base_by_key: BTreeMap<(String, String), Vec<&BaselineRecord>> = BTreeMap::new();
    let mut base_by_prop: BTreeMap<String, Vec<&BaselineRecord>> = BTreeMap::new();
    for b in baseline_records {
        base_by_key
            .entry((b.material.clone(), b.property.clone()))
            .or_default()
            .push(b);
        base_by_prop.entry(b.property.clone()).or_default().push(b);
    }

    let mut groups: BTreeMap<(String, String), Vec<&Record>> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.material.clone(), r.property.clone()))
            .or_default()
            .push(r);
    }

    let mut rows = Vec::new();
    for ((material, prop), recs) in groups {
        if prop == "unknown" {
            continue;
        }

        let this_recs: Vec<&Record> = recs
            .iter()
            .copied()
            .filter(|r| r.origin == Origin::ThisWork)
            .collect();
        let lit_recs: Vec<&Record> = recs
            .iter()
            .copied()
            .filter(|r| r.origin == Origin::Literature)
            .collect();

        let base = base_by_key
            .get(&(material.clone(), prop.clone()))
            .filter(|v| !v.is_empty())
            .or_else(|| base_by_prop.get(&prop))
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        let this_sum = summarize_records(&this_recs);
        let lit_sum = summarize_records(&lit_recs);
        let base_sum = summarize_baseline(base);

        let novelty = classify_novelty(&this_sum, &lit_sum, &base_sum);

        let mut citations: Vec<String> = lit_recs
            .iter()
            .flat_map(|r| r.citations.iter().cloned())
            .collect();
        citations.sort();
        citations.dedup();
        let mut paper_citations = citations.join(", ");
        truncate_chars(&mut paper_citations, 120);

        let category = recs
            .iter()
            .map(|r| r.category.as_str())
            .find(|c| !c.is_empty())
            .unwrap_or("Other")
            .to_string();

        rows.push(ComparisonRow {
            material,
            property: prop,
            category,
            this_work: this_sum.display.clone(),
            paper_cited_literature: lit_sum.display.clone(),
            external_baseline: base_sum.display.clone(),
            novelty_flag: novelty,
            paper_citations,
        });
    }

    rows
}

/// Summarize records as a min..max range, preferring SI values.
pub fn summarize_records(recs: &[&Record]) -> RangeSummary {
    summarize_spans(recs.iter().map(|r| {
        if let (Some(v), Some(u)) = (r.value_si_min, r.unit_si.as_deref()) {
            (Some(v), r.value_si_max, Some(u.to_string()))
        } else {
            (Some(r.value_min), Some(r.value_max), Some(r.unit_original.clone()))
        }
    }))
}

/// Summarize baseline records the same way.
pub fn summarize_baseline(recs: &[&BaselineRecord]) -> RangeSummary {
    summarize_spans(recs.iter().map(|b| {
        if let (Some(v), Some(u)) = (b.value_si_min, b.unit_si.as_deref()) {
            (Some(v), b.value_si_max, Some(u.to_string()))
        } else {
            (b.value_min, b.value_max, b.unit.clone())
        }
    }))
}

fn summarize_spans(
    spans: impl Iterator<Item = (Option<f64>, Option<f64>, Option<String>)>,
) -> RangeSummary {
    let mut vals: Vec<f64> = Vec::new();
    let mut unit: Option<String> = None;
    for (vmin, vmax, u) in spans {
        let (Some(vmin), Some(u)) = (vmin, u) else { continue };
        vals.push(vmin);
        if let Some(vmax) = vmax {
            vals.push(vmax);
        }
        unit = Some(u);
    }

    if vals.is_empty() {
        return RangeSummary::default();
    }

    let vmin = vals.iter().copied().fold(f64::INFINITY, f64::min);
    let vmax = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let display = match &unit {
        None => format!("{}–{}", fmt(vmin), fmt(vmax)),
        Some(u) if (vmax - vmin).abs() < 1e-12 => format!("{} {u}", fmt(vmin)),
        Some(u) => format!("{}–{} {u}", fmt(vmin), fmt(vmax)),
    };

    RangeSummary {
        display,
        min: Some(vmin),
        max: Some(vmax),
        unit,
    }
}

/// Conservative novelty labeling for a group.
///
/// When the paper itself cites values for the property, the group is a
/// comparison rather than a new property, unless this-work lies outside the
/// cited range. Only then is the baseline consulted.
pub fn classify_novelty(
    this_sum: &RangeSummary,
    lit_sum: &RangeSummary,
    base_sum: &RangeSummary,
) -> Option<Novelty> {
    if this_sum.is_empty() {
        return None;
    }

    if !lit_sum.is_empty() {
        if outside_range(this_sum, lit_sum) {
            return Some(Novelty::NewRegimeVsCitedLit);
        }
        return Some(Novelty::ComparedToCitedLit);
    }

    if base_sum.is_empty() {
        return Some(Novelty::PotentiallyNewProperty);
    }
    if outside_range(this_sum, base_sum) {
        return Some(Novelty::NewRegimeVsBaseline);
    }
    Some(Novelty::WithinBaselineRange)
}

/// True when range `a` lies fully outside range `b` expanded by the relative
/// tolerance. The expansion scale is the largest of the span and the absolute
/// endpoints, floored to avoid zero spans.
fn outside_range(a: &RangeSummary, b: &RangeSummary) -> bool {
    let (Some(amin), Some(amax)) = (a.min, a.max) else { return false };
    let (Some(bmin), Some(bmax)) = (b.min, b.max) else { return false };
    let span = (bmax - bmin)
        .abs()
        .max(bmax.abs())
        .max(bmin.abs())
        .max(1e-12);
    let lo = bmin - NOVELTY_TOL * span;
    let hi = bmax + NOVELTY_TOL * span;
    amax < lo || amin > hi
}

fn fmt(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let ax = x.abs();
    if ax >= 1e4 || ax < 1e-3 {
        format!("{x:.3e}")
    } else if ax >= 100.0 {
        format!("{x:.2}")
    } else if ax >= 1.0 {
        format!("{x:.3}")
    } else {
        format!("{x:.4}")
    }
}

fn truncate_chars(s: &mut String, max_chars: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
}
