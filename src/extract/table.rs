//! Table-derived candidate records.
//!
//! Tables carry units in two places: inside the cell ("1.2 mS/cm") or in the
//! column header ("σ (mS/cm)"). Both are supported; numeric-only cells borrow
//! the header unit. Column roles ("This work", "Ref.") override the row-level
//! origin guess.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::model::{record::round3, NormalizationTrace, Provenance, Record, SourceType, Table};
use crate::ontology::{expected_dimension, infer_property, property_category};
use crate::origin::{classify_origin, detect_citations, Origin};
use crate::units::{canonicalize_unit, parse_numeric_only, parse_value_and_unit, to_si};

static UNIT_IN_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

static REF_WORD: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\b(ref\.?|reference|literature)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static THIS_WORD: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\b(this\s+work|present\s+work)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Convert reconstructed tables into candidate records.
pub fn records_from_tables(tables: &[Table], doc_id: &str, default_material: &str) -> Vec<Record> {
    let mut out = Vec::new();

    for table in tables {
        if table.rows.is_empty() {
            continue;
        }
        let header: Vec<String> = match table.effective_header() {
            Some(h) => h.to_vec(),
            None => continue,
        };
        let caption = table.meta.caption.clone().unwrap_or_default();

        // Caption-anchored tables default to this-work measurements unless the
        // caption explicitly frames them as literature.
        let table_default_origin =
            if REF_WORD.is_match(&caption) && !THIS_WORD.is_match(&caption) {
                Origin::Literature
            } else {
                Origin::ThisWork
            };

        let mut col_props: Vec<Option<&'static str>> = Vec::with_capacity(header.len());
        let mut col_units: Vec<Option<String>> = Vec::with_capacity(header.len());
        let mut ref_col: Option<usize> = None;
        let mut thiswork_col: Option<usize> = None;
        for (j, h) in header.iter().enumerate() {
            let prop = infer_property(h);
            col_props.push((prop != "unknown").then_some(prop));
            col_units.push(unit_from_header(h));
            if REF_WORD.is_match(h) {
                ref_col = Some(j);
            }
            if THIS_WORD.is_match(h) {
                thiswork_col = Some(j);
            }
        }

        for row in table.data_rows() {
            let row_text = row.join(" | ");
            let citations = detect_citations(&row_text);

            let mut origin_hint = table_default_origin;
            if !citations.is_empty() {
                origin_hint = Origin::Literature;
            }
            if THIS_WORD.is_match(&row_text) {
                origin_hint = Origin::ThisWork;
            }
            if let Some(rc) = ref_col {
                if rc < row.len() && !detect_citations(&row[rc]).is_empty() {
                    origin_hint = Origin::Literature;
                }
            }

            let material = material_from_row(row, default_material);

            for (j, prop) in col_props.iter().enumerate() {
                let prop = match prop {
                    Some(p) if j < row.len() => *p,
                    _ => continue,
                };
                let cell = &row[j];

                let (mut vmin, mut vmax, unit) = parse_value_and_unit(cell);
                if vmin.is_none() {
                    let (a, b) = parse_numeric_only(cell);
                    vmin = a;
                    vmax = b;
                }

                let mut unit2 = unit.or_else(|| col_units[j].clone());
                if unit2.is_none() && expected_dimension(prop) == Some("dimensionless") {
                    unit2 = Some("1".to_string());
                }

                let (vmin, unit2) = match (vmin, unit2) {
                    (Some(v), Some(u)) => (v, u),
                    _ => continue,
                };
                let vmax = vmax.unwrap_or(vmin);

                let unit_norm = canonicalize_unit(&unit2);

                let (v_si_min, si_unit, dim) = match to_si(vmin, &unit_norm) {
                    Some((v, u, d)) => (Some(v), Some(u), Some(d)),
                    None => (None, None, None),
                };
                let v_si_max = to_si(vmax, &unit_norm).map(|(v, _, _)| v);

                // Column-specific overrides beat the row hint.
                let mut origin_col = origin_hint;
                if thiswork_col == Some(j) {
                    origin_col = Origin::ThisWork;
                }
                if ref_col == Some(j) {
                    origin_col = Origin::Literature;
                }

                let (row_origin, rationale) = classify_origin(&row_text, None);
                let origin = if origin_col != Origin::Unclear {
                    origin_col
                } else {
                    row_origin
                };

                let mut all_citations = citations.clone();
                for c in &rationale.citations {
                    if !all_citations.contains(c) {
                        all_citations.push(c.clone());
                    }
                }

                // Table structure already suggests factual data.
                let mut conf: f64 = 0.55 + 0.20;
                if si_unit.is_some() {
                    conf += 0.15;
                }
                if origin.is_resolved() {
                    conf += 0.05;
                }
                let conf = round3(conf.min(0.99));

                let mut snippet = format!("{caption} | {row_text}");
                snippet.truncate(floor_char_boundary(&snippet, 500));

                let trace = NormalizationTrace::build(
                    vmin,
                    Some(vmax),
                    &unit_norm,
                    v_si_min,
                    v_si_max,
                    si_unit,
                    dim,
                );

                out.push(Record {
                    doc_id: doc_id.to_string(),
                    source_type: SourceType::Table,
                    material: material.clone(),
                    property: prop.to_string(),
                    category: property_category(prop).to_string(),
                    value_min: vmin,
                    value_max: vmax,
                    unit_original: unit_norm,
                    value_si_min: v_si_min,
                    value_si_max: v_si_max,
                    unit_si: si_unit.map(|s| s.to_string()),
                    dimension: dim.map(|s| s.to_string()),
                    method: None,
                    origin,
                    origin_rationale: rationale,
                    citations: all_citations,
                    confidence: conf,
                    provenance: Provenance {
                        page: Some(table.page),
                        bbox: Some(table.bbox),
                        snippet,
                        table_caption: (!caption.is_empty()).then(|| {
                            let mut c = caption.clone();
                            c.truncate(floor_char_boundary(&c, 200));
                            c
                        }),
                    },
                    normalization_traces: trace.into_iter().collect(),
                    constraints: Default::default(),
                });
            }
        }
    }

    out
}

/// Unit spelled in a header cell, e.g. "Mn (g/mol)".
fn unit_from_header(h: &str) -> Option<String> {
    let caps = UNIT_IN_PARENS.captures(h)?;
    let cand = caps[1].trim();
    if cand.chars().any(|c| c.is_alphabetic()) && cand.chars().count() <= 20 {
        Some(cand.to_string())
    } else {
        None
    }
}

/// Row material: the first early cell that looks like a sample label.
fn material_from_row(row: &[String], default_material: &str) -> String {
    for cell in row.iter().take(2) {
        let c = cell.trim();
        let n = c.chars().count();
        if (1..=25).contains(&n) && c.chars().any(|ch| ch.is_alphabetic()) && !REF_WORD.is_match(c) {
            return c.to_string();
        }
    }
    default_material.to_string()
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
