//! Domain ontology for polymer rheology and battery electrolytes.
//!
//! A compact, editable knowledge base:
//! - canonical property names and their recognition patterns
//! - property -> category and property -> expected-dimension tables
//! - measurement-method lexicon
//! - material lexicon for row/document material inference
//!
//! All tables are compiled once as process-wide immutable configuration and
//! never mutated at run time. Pattern declaration order is significant: it is
//! the documented tie-break for equal-length property matches and the scan
//! order for methods.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("invalid ontology pattern")
}

/// Canonical property key -> compiled recognition patterns, in declaration
/// order.
static PROPERTY_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        // Electrolytes / battery
        (
            "ionic_conductivity",
            vec![
                ci(r"\bionic conductivity\b"),
                ci(r"\bconductivity\b"),
                ci(r"\bσ\b"),
                ci(r"\bsigma\b"),
            ],
        ),
        (
            "li_transference_number",
            vec![
                ci(r"\btransference number\b"),
                ci(r"\bt\+"),
                ci(r"\btLi\+?\b"),
                ci(r"\bt\s*_\s*Li\+?\b"),
            ],
        ),
        (
            "electrochemical_stability_window",
            vec![
                ci(r"\bstability window\b"),
                ci(r"\belectrochemical stability\b"),
                ci(r"\bESW\b"),
            ],
        ),
        (
            "activation_energy",
            vec![ci(r"\bactivation energy\b"), ci(r"\bE_a\b")],
        ),
        (
            "interfacial_resistance",
            vec![
                ci(r"\binterfacial resistance\b"),
                ci(r"\bR_ct\b"),
                ci(r"\bcharge transfer resistance\b"),
            ],
        ),
        (
            "concentration",
            vec![ci(r"\bconcentration\b"), ci(r"\bmolarity\b")],
        ),
        // Polymer thermal
        (
            "glass_transition_temperature",
            vec![
                ci(r"\bglass transition temperature\b"),
                ci(r"\bglass transition\b"),
                ci(r"\bTg\b"),
                ci(r"\bT_g\b"),
            ],
        ),
        (
            "melting_temperature",
            vec![
                ci(r"\bmelting temperature\b"),
                ci(r"\bTm\b"),
                ci(r"\bT_m\b"),
            ],
        ),
        // Polymer molecular weights
        (
            "number_average_molecular_weight",
            vec![
                ci(r"\bnumber[-\s]average molecular weight\b"),
                ci(r"\bM_n\b"),
                ci(r"\bMn\b"),
            ],
        ),
        (
            "weight_average_molecular_weight",
            vec![
                ci(r"\bweight[-\s]average molecular weight\b"),
                ci(r"\bM_w\b"),
                ci(r"\bMw\b"),
            ],
        ),
        (
            "z_average_molecular_weight",
            vec![
                ci(r"\bz[-\s]average molecular weight\b"),
                ci(r"\bM_z\b"),
                ci(r"\bMz\b"),
            ],
        ),
        (
            "viscosity_average_molecular_weight",
            vec![
                ci(r"\bviscosity[-\s]average molecular weight\b"),
                ci(r"\bM_v\b"),
                ci(r"\bMv\b"),
            ],
        ),
        (
            "dispersity",
            vec![
                ci(r"\bdispersity\b"),
                ci(r"\bpolydispersity\b"),
                ci(r"\bĐ\b"),
                ci(r"\bPDI\b"),
            ],
        ),
        // Polymer mechanical + rheology
        (
            "youngs_modulus",
            vec![
                ci(r"\byoung'?s modulus\b"),
                ci(r"\bmodulus\b"),
                ci(r"\bE\b"),
            ],
        ),
        (
            "storage_modulus",
            vec![ci(r"\bstorage modulus\b"), ci(r"\bG'"), ci(r"\bG\s*′")],
        ),
        (
            "loss_modulus",
            vec![ci(r"\bloss modulus\b"), ci(r"\bG''"), ci(r"\bG\s*″")],
        ),
        (
            "complex_modulus",
            vec![ci(r"\bcomplex modulus\b"), ci(r"\bG\*")],
        ),
        ("viscosity", vec![ci(r"\bviscosity\b"), ci(r"\bη\b"), ci(r"\beta\b")]),
        (
            "complex_viscosity",
            vec![ci(r"\bcomplex viscosity\b"), ci(r"\|η\*\|"), ci(r"\bη\*")],
        ),
        (
            "zero_shear_viscosity",
            vec![
                ci(r"\bzero[-\s]shear viscosity\b"),
                ci(r"\bη_0\b"),
                ci(r"\beta_0\b"),
            ],
        ),
        (
            "shear_rate",
            vec![ci(r"\bshear rate\b"), ci(r"\bγ̇"), ci(r"\bgamma dot\b")],
        ),
        (
            "frequency",
            vec![ci(r"\bfrequency\b"), ci(r"\bω\b"), ci(r"\bangular frequency\b")],
        ),
        ("strain_rate", vec![ci(r"\bstrain rate\b")]),
        ("stress", vec![ci(r"\bstress\b"), ci(r"\bσ\b")]),
        ("strain", vec![ci(r"\bstrain\b"), ci(r"\bε\b")]),
    ]
});

/// Category for a canonical property key ("Other" if unmapped).
pub fn property_category(property: &str) -> &'static str {
    match property {
        "ionic_conductivity"
        | "li_transference_number"
        | "electrochemical_stability_window"
        | "activation_energy"
        | "interfacial_resistance" => "Electrochemical",
        "glass_transition_temperature" | "melting_temperature" => "Thermal",
        "concentration"
        | "number_average_molecular_weight"
        | "weight_average_molecular_weight"
        | "z_average_molecular_weight"
        | "viscosity_average_molecular_weight"
        | "dispersity" => "Chemical",
        "youngs_modulus" | "strain_rate" | "stress" | "strain" => "Mechanical",
        "storage_modulus"
        | "loss_modulus"
        | "complex_modulus"
        | "viscosity"
        | "complex_viscosity"
        | "zero_shear_viscosity"
        | "shear_rate"
        | "frequency" => "Rheology",
        _ => "Other",
    }
}

/// Expected dimension class for a canonical property key, used for unit
/// compatibility checks.
pub fn expected_dimension(property: &str) -> Option<&'static str> {
    let dim = match property {
        "ionic_conductivity" => "conductivity",
        "li_transference_number" => "dimensionless",
        "electrochemical_stability_window" => "voltage",
        "activation_energy" => "energy",
        "interfacial_resistance" => "resistance",
        "glass_transition_temperature" | "melting_temperature" => "temperature",
        "concentration" => "concentration",
        "number_average_molecular_weight"
        | "weight_average_molecular_weight"
        | "z_average_molecular_weight"
        | "viscosity_average_molecular_weight" => "molecular_weight",
        "dispersity" => "dimensionless",
        "youngs_modulus" | "storage_modulus" | "loss_modulus" | "complex_modulus" | "stress" => {
            "pressure"
        }
        "viscosity" | "complex_viscosity" | "zero_shear_viscosity" => "viscosity",
        "shear_rate" | "strain_rate" => "rate",
        "frequency" => "frequency",
        "strain" => "dimensionless",
        _ => return None,
    };
    Some(dim)
}

/// Measurement-method lexicon, scanned in declaration order.
static METHOD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        // Thermal / polymers
        ("DSC", ci(r"\bDSC\b")),
        ("DMA", ci(r"\bDMA\b")),
        ("TGA", ci(r"\bTGA\b")),
        ("GPC", ci(r"\bGPC\b")),
        ("SEC", ci(r"\bSEC\b")),
        // Electrochemistry
        ("EIS", ci(r"\bEIS\b")),
        ("EIS", ci(r"\belectrochemical impedance\b")),
        ("LSV", ci(r"\bLSV\b")),
        ("CV", ci(r"\bCV\b")),
        // Spectroscopy / structure
        ("NMR", ci(r"\bNMR\b")),
        ("FTIR", ci(r"\bFTIR\b")),
        ("Raman", ci(r"\bRaman\b")),
        ("XRD", ci(r"\bXRD\b")),
        ("SEM", ci(r"\bSEM\b")),
        ("TEM", ci(r"\bTEM\b")),
        ("AFM", ci(r"\bAFM\b")),
        // Rheology
        ("rheometry", ci(r"\brheometer\b")),
        ("rheometry", ci(r"\brheology\b")),
        ("oscillatory shear", ci(r"\bosc?illatory\b")),
    ]
});

/// Lightweight material lexicon (extend as new systems are added).
pub const MATERIAL_LEXICON: [&str; 19] = [
    "PEO", "PEG", "PVDF", "PAN", "PMMA", "PS", "PLA", "PCL", "PVA", "PAA", "LiTFSI", "LiPF6",
    "LiFSI", "LiClO4", "LiBF4", "ZnO", "SiO2", "Al2O3", "TiO2",
];

static MATERIAL_RE: Lazy<Regex> = Lazy::new(|| {
    let alts = MATERIAL_LEXICON
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b({alts})\b")).unwrap()
});

/// Infer the canonical property mentioned in a context window.
///
/// Ranked-match selection: the pattern with the longest matched substring
/// wins; equal lengths resolve to the earliest declaration. Returns
/// `"unknown"` when nothing matches.
pub fn infer_property(context: &str) -> &'static str {
    let mut best: (&'static str, usize) = ("unknown", 0);
    for (prop, pats) in PROPERTY_PATTERNS.iter() {
        for pat in pats {
            if let Some(m) = pat.find(context) {
                let score = m.as_str().len();
                if score > best.1 {
                    best = (prop, score);
                }
            }
        }
    }
    best.0
}

/// First method mentioned in the text, in lexicon declaration order.
pub fn detect_method(text: &str) -> Option<&'static str> {
    METHOD_PATTERNS
        .iter()
        .find(|(_, pat)| pat.is_match(text))
        .map(|(name, _)| *name)
}

/// First lexicon material mentioned in the text.
pub fn first_material(text: &str) -> Option<&str> {
    MATERIAL_RE.find(text).map(|m| m.as_str())
}

/// Document-wide default material: the most frequent lexicon hit.
///
/// Ties resolve to the material seen first.
pub fn document_material(text: &str) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for m in MATERIAL_RE.find_iter(text) {
        let name = m.as_str();
        if !counts.contains_key(name) {
            order.push(name);
        }
        *counts.entry(name).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for name in order {
        let n = counts[name];
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((name, n));
        }
    }
    best.map(|(s, _)| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_property_longest_match_wins() {
        // "ionic conductivity" (18 chars) beats "conductivity" (12 chars).
        assert_eq!(
            infer_property("the ionic conductivity reached 1 mS/cm"),
            "ionic_conductivity"
        );
        assert_eq!(infer_property("Tg of the film"), "glass_transition_temperature");
        assert_eq!(
            infer_property("glass transition temperature was high"),
            "glass_transition_temperature"
        );
    }

    #[test]
    fn test_infer_property_unknown() {
        assert_eq!(infer_property("nothing relevant here"), "unknown");
    }

    #[test]
    fn test_molecular_weight_symbols() {
        assert_eq!(infer_property("Mn = 67000"), "number_average_molecular_weight");
        assert_eq!(infer_property("Mw = 80000"), "weight_average_molecular_weight");
        assert_eq!(infer_property("PDI of 1.2"), "dispersity");
    }

    #[test]
    fn test_category_and_dimension() {
        assert_eq!(property_category("ionic_conductivity"), "Electrochemical");
        assert_eq!(property_category("dispersity"), "Chemical");
        assert_eq!(property_category("nonexistent"), "Other");
        assert_eq!(expected_dimension("ionic_conductivity"), Some("conductivity"));
        assert_eq!(expected_dimension("dispersity"), Some("dimensionless"));
        assert_eq!(expected_dimension("nonexistent"), None);
    }

    #[test]
    fn test_detect_method_first_in_order() {
        assert_eq!(detect_method("measured by DSC and GPC"), Some("DSC"));
        assert_eq!(
            detect_method("electrochemical impedance spectroscopy"),
            Some("EIS")
        );
        assert_eq!(detect_method("no instruments"), None);
    }

    #[test]
    fn test_document_material_frequency() {
        let text = "PEO with LiTFSI. PEO films. PEO electrolytes with LiTFSI.";
        assert_eq!(document_material(text).as_deref(), Some("PEO"));
        assert_eq!(document_material("no polymers"), None);
    }

    #[test]
    fn test_document_material_tie_goes_to_first_seen() {
        // PVDF and PEO appear twice each; PVDF was seen first.
        let text = "PVDF blended with PEO. The PVDF phase dominates; PEO is minor.";
        assert_eq!(document_material(text).as_deref(), Some("PVDF"));
    }

    #[test]
    fn test_first_material() {
        assert_eq!(first_material("LiTFSI in PEO"), Some("LiTFSI"));
        assert_eq!(first_material("plain text"), None);
    }
}
