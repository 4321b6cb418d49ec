//! Text-derived candidate records.
//!
//! Scans each filtered block for numeric mentions with a trailing unit-like
//! token, then judges each mention inside a local context window: property
//! inference, unit normalization, and origin classification all see only the
//! text near the value.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::filter::TextBlock;
use crate::model::{record::round3, NormalizationTrace, Provenance, Record, SourceType};
use crate::ontology::{detect_method, first_material, infer_property, property_category};
use crate::origin::{classify_origin_near_value, step_back, step_forward};
use crate::units::{canonicalize_unit, collapse_whitespace, parse_value_and_unit, to_si, unit_lookup};

/// Context window radius around a numeric mention, in chars.
const CONTEXT_RADIUS: usize = 80;

// Numeric mention followed by a short unit-like token. Deliberately broad;
// parse_value_and_unit does the strict parsing on the window.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[+-]?\d+(?:\.\d+)?(?:\s*[-–—−]\s*\d+(?:\.\d+)?)?\s*[A-Za-z°Ω%μµ·*/\-−\^0-9]{1,12}")
        .unwrap()
});

// A "unit" that is just a long lowercase word is narrative text.
static WORDISH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{5,}$").unwrap());

/// Ambiguous one-letter units that only count when a property cue backs them.
const AMBIGUOUS_UNITS: [&str; 4] = ["m", "M", "s", "h"];

/// Extract candidate records from one filtered text block.
pub fn extract_from_text_block(
    block: &TextBlock,
    doc_id: &str,
    default_material: &str,
) -> Vec<Record> {
    let text = &block.text;
    let mut records = Vec::new();

    let method = detect_method(text);
    let material = first_material(text)
        .map(|m| m.to_string())
        .unwrap_or_else(|| default_material.to_string());

    for m in TOKEN_RE.find_iter(text) {
        let w0 = step_back(text, m.start(), CONTEXT_RADIUS);
        let w1 = step_forward(text, m.end(), CONTEXT_RADIUS);
        let window = &text[w0..w1];

        let (vmin, vmax, unit) = parse_value_and_unit(window);
        let (vmin, unit) = match (vmin, unit) {
            (Some(v), Some(u)) => (v, u),
            _ => continue,
        };
        let vmax = vmax.unwrap_or(vmin);

        let unit_norm = canonicalize_unit(&unit);
        let prop = infer_property(window);
        let category = property_category(prop);

        // Narrative false positives: unknown property and a word-like token
        // that is not in the unit table.
        if prop == "unknown" && unit_lookup(&unit_norm).is_none() && WORDISH_RE.is_match(&unit_norm)
        {
            continue;
        }
        if prop == "unknown" && AMBIGUOUS_UNITS.contains(&unit_norm.as_str()) {
            continue;
        }

        let si = to_si(vmin, &unit_norm);
        let (v_si_min, si_unit, dim) = match si {
            Some((v, u, d)) => (Some(v), Some(u), Some(d)),
            None => (None, None, None),
        };
        let v_si_max = to_si(vmax, &unit_norm).map(|(v, _, _)| v);

        let (origin, rationale) = classify_origin_near_value(text, m.start(), m.end(), None);

        let mut conf: f64 = 0.50;
        if prop != "unknown" {
            conf += 0.20;
        }
        if si_unit.is_some() {
            conf += 0.15;
        }
        if origin.is_resolved() {
            conf += 0.05;
        }
        let conf = round3(conf.min(0.99));

        let trace = NormalizationTrace::build(
            vmin,
            Some(vmax),
            &unit_norm,
            v_si_min,
            v_si_max,
            si_unit,
            dim,
        );

        records.push(Record {
            doc_id: doc_id.to_string(),
            source_type: SourceType::Text,
            material: material.clone(),
            property: prop.to_string(),
            category: category.to_string(),
            value_min: vmin,
            value_max: vmax,
            unit_original: unit_norm,
            value_si_min: v_si_min,
            value_si_max: v_si_max,
            unit_si: si_unit.map(|s| s.to_string()),
            dimension: dim.map(|s| s.to_string()),
            method: method.map(|s| s.to_string()),
            origin,
            citations: rationale.citations.clone(),
            origin_rationale: rationale,
            confidence: conf,
            provenance: Provenance {
                page: Some(block.page),
                bbox: Some(block.bbox),
                snippet: collapse_whitespace(window),
                table_caption: None,
            },
            normalization_traces: trace.into_iter().collect(),
            constraints: Default::default(),
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::BBox;
    use crate::origin::Origin;

    fn block(text: &str) -> TextBlock {
        TextBlock {
            page: 2,
            bbox: BBox::new(50.0, 100.0, 400.0, 140.0),
            text: text.into(),
        }
    }

    #[test]
    fn test_conductivity_mention() {
        let b = block("In this work the PEO electrolyte reached an ionic conductivity of 1.2 mS/cm at 25 °C.");
        let recs = extract_from_text_block(&b, "doc1", "UNKNOWN");
        let cond: Vec<_> = recs
            .iter()
            .filter(|r| r.property == "ionic_conductivity")
            .collect();
        assert!(!cond.is_empty());
        let r = cond[0];
        assert_eq!(r.material, "PEO");
        assert_eq!(r.unit_original, "mS/cm");
        assert_eq!(r.unit_si.as_deref(), Some("S/m"));
        assert!((r.value_si_min.unwrap() - 0.12).abs() < 1e-9);
        assert_eq!(r.origin, Origin::ThisWork);
        assert_eq!(r.source_type, SourceType::Text);
    }

    #[test]
    fn test_confidence_components() {
        let b = block("in this work the glass transition temperature was 65 °C");
        let recs = extract_from_text_block(&b, "doc1", "PEO");
        let r = recs
            .iter()
            .find(|r| r.property == "glass_transition_temperature")
            .unwrap();
        // 0.50 base + 0.20 property + 0.15 SI + 0.05 resolved origin
        assert!((r.confidence - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_narrative_number_skipped() {
        let b = block("we repeated the procedure 12 times before analysis");
        let recs = extract_from_text_block(&b, "doc1", "UNKNOWN");
        assert!(recs.is_empty());
    }

    #[test]
    fn test_ambiguous_unit_without_property_skipped() {
        let b = block("heated for 3 h prior to casting");
        let recs = extract_from_text_block(&b, "doc1", "UNKNOWN");
        assert!(recs.iter().all(|r| r.unit_original != "h"));
    }

    #[test]
    fn test_method_and_citation() {
        let b = block("Tg of 60 °C was determined by DSC, as reported previously [7].");
        let recs = extract_from_text_block(&b, "doc1", "UNKNOWN");
        let r = recs
            .iter()
            .find(|r| r.property == "glass_transition_temperature")
            .unwrap();
        assert_eq!(r.method.as_deref(), Some("DSC"));
        assert_eq!(r.origin, Origin::Literature);
        assert!(r.citations.contains(&"[7]".to_string()));
    }

    #[test]
    fn test_normalization_trace_recorded() {
        let b = block("the activation energy was 0.35 eV for the dry film");
        let recs = extract_from_text_block(&b, "doc1", "UNKNOWN");
        let r = recs.iter().find(|r| r.property == "activation_energy").unwrap();
        assert_eq!(r.normalization_traces.len(), 1);
        assert_eq!(r.normalization_traces[0].dimension, "energy");
    }
}
