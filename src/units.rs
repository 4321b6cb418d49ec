//! Unit parsing and canonical-unit normalization.
//!
//! Every conversion is explicit (factor/offset) so normalization stays
//! auditable. The target unit per dimension class is the standard reporting
//! unit, which is not always strict SI: molecular weight normalizes to g/mol
//! and concentration to mol/L.
//!
//! Numeric parsing tolerates common PDF text-layer artifacts:
//! - spaced or comma thousands ("67 732" -> 67732)
//! - broken scientific notation ("2.88 × 1010" meaning 2.88×10^10)
//! - typography variants (µ/μ, −/–/—, superscript exponents)

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Conversion entry for one recognized unit string.
#[derive(Debug, Clone, Copy)]
pub struct UnitInfo {
    /// Dimension class ("temperature", "conductivity", ...).
    pub dimension: &'static str,
    /// Canonical target unit for the dimension class.
    pub si_unit: &'static str,
    /// Multiplicative factor applied after the offset.
    pub factor: f64,
    /// Additive offset, used only for affine units (°C -> K).
    pub offset: f64,
}

const fn unit(dimension: &'static str, si_unit: &'static str, factor: f64, offset: f64) -> UnitInfo {
    UnitInfo {
        dimension,
        si_unit,
        factor,
        offset,
    }
}

/// Canonical unit string -> conversion info.
///
/// Loaded once as process-wide immutable configuration; keys are already in
/// canonical form (see [`canonicalize_unit`]).
static UNIT_TABLE: Lazy<HashMap<&'static str, UnitInfo>> = Lazy::new(|| {
    HashMap::from([
        // Temperature
        ("K", unit("temperature", "K", 1.0, 0.0)),
        ("°C", unit("temperature", "K", 1.0, 273.15)),
        ("C", unit("temperature", "K", 1.0, 273.15)),
        // Pressure / modulus
        ("Pa", unit("pressure", "Pa", 1.0, 0.0)),
        ("kPa", unit("pressure", "Pa", 1e3, 0.0)),
        ("MPa", unit("pressure", "Pa", 1e6, 0.0)),
        ("GPa", unit("pressure", "Pa", 1e9, 0.0)),
        // Viscosity
        ("Pa·s", unit("viscosity", "Pa·s", 1.0, 0.0)),
        ("Pa*s", unit("viscosity", "Pa·s", 1.0, 0.0)),
        ("mPa·s", unit("viscosity", "Pa·s", 1e-3, 0.0)),
        ("mPa*s", unit("viscosity", "Pa·s", 1e-3, 0.0)),
        ("cP", unit("viscosity", "Pa·s", 1e-3, 0.0)),
        // Conductivity
        ("S/m", unit("conductivity", "S/m", 1.0, 0.0)),
        ("S/cm", unit("conductivity", "S/m", 100.0, 0.0)),
        ("mS/cm", unit("conductivity", "S/m", 0.1, 0.0)),
        ("µS/cm", unit("conductivity", "S/m", 1e-4, 0.0)),
        // Frequency
        ("Hz", unit("frequency", "Hz", 1.0, 0.0)),
        ("kHz", unit("frequency", "Hz", 1e3, 0.0)),
        ("MHz", unit("frequency", "Hz", 1e6, 0.0)),
        ("GHz", unit("frequency", "Hz", 1e9, 0.0)),
        ("rad/s", unit("frequency", "rad/s", 1.0, 0.0)),
        // Voltage
        ("V", unit("voltage", "V", 1.0, 0.0)),
        ("kV", unit("voltage", "V", 1e3, 0.0)),
        // Resistance
        ("Ω", unit("resistance", "Ω", 1.0, 0.0)),
        ("kΩ", unit("resistance", "Ω", 1e3, 0.0)),
        ("MΩ", unit("resistance", "Ω", 1e6, 0.0)),
        // Energy
        ("J", unit("energy", "J", 1.0, 0.0)),
        ("J/mol", unit("energy", "J/mol", 1.0, 0.0)),
        ("kJ/mol", unit("energy", "J/mol", 1e3, 0.0)),
        ("eV", unit("energy", "J", 1.602176634e-19, 0.0)),
        ("meV", unit("energy", "J", 1.602176634e-22, 0.0)),
        // Molecular weight (canonical in g/mol; 1 Da ≈ 1 g/mol)
        ("g/mol", unit("molecular_weight", "g/mol", 1.0, 0.0)),
        ("kg/mol", unit("molecular_weight", "g/mol", 1e3, 0.0)),
        ("Da", unit("molecular_weight", "g/mol", 1.0, 0.0)),
        ("kDa", unit("molecular_weight", "g/mol", 1e3, 0.0)),
        // Time
        ("s", unit("time", "s", 1.0, 0.0)),
        ("min", unit("time", "s", 60.0, 0.0)),
        ("h", unit("time", "s", 3600.0, 0.0)),
        // Rate
        ("s−1", unit("rate", "s^-1", 1.0, 0.0)),
        ("s^-1", unit("rate", "s^-1", 1.0, 0.0)),
        ("min−1", unit("rate", "s^-1", 1.0 / 60.0, 0.0)),
        ("min^-1", unit("rate", "s^-1", 1.0 / 60.0, 0.0)),
        // Concentration (molar)
        ("M", unit("concentration", "mol/L", 1.0, 0.0)),
        ("mM", unit("concentration", "mol/L", 1e-3, 0.0)),
        ("mol/L", unit("concentration", "mol/L", 1.0, 0.0)),
        // Length
        ("m", unit("length", "m", 1.0, 0.0)),
        ("cm", unit("length", "m", 1e-2, 0.0)),
        ("mm", unit("length", "m", 1e-3, 0.0)),
        ("µm", unit("length", "m", 1e-6, 0.0)),
        ("um", unit("length", "m", 1e-6, 0.0)),
        ("nm", unit("length", "m", 1e-9, 0.0)),
        // Process / misc
        ("rpm", unit("rotation_rate", "rpm", 1.0, 0.0)),
        ("W", unit("power", "W", 1.0, 0.0)),
        ("%", unit("dimensionless", "%", 1.0, 0.0)),
        ("1", unit("dimensionless", "1", 1.0, 0.0)),
    ])
});

/// Read-only view of the full unit table.
pub fn unit_table() -> &'static HashMap<&'static str, UnitInfo> {
    &UNIT_TABLE
}

/// Minus-sign variants folded to U+2212 during canonicalization.
const MINUS_CHARS: [char; 3] = ['−', '–', '—'];

/// Canonicalize a unit string before table lookup.
///
/// NFKC folding maps superscript exponents ("S·cm⁻¹") into plain digits, then
/// typography variants and a fixed table of textual equivalences are applied.
/// Idempotent: canonicalizing a canonical string returns it unchanged.
pub fn canonicalize_unit(u: &str) -> String {
    let mut u: String = u.trim().nfkc().collect();

    // NFKC turns the micro sign into Greek mu; fold back to one glyph.
    u = u.replace('μ', "µ");

    for mc in MINUS_CHARS {
        if mc != '−' {
            u = u.replace(mc, "−");
        }
    }

    u.retain(|c| !c.is_whitespace());

    // Common textual equivalences
    u = u.replace("S·cm−1", "S/cm");
    u = u.replace("S·m−1", "S/m");
    u = u.replace("mPa.s", "mPa·s");
    u = u.replace("Pa.s", "Pa·s");
    u = u.replace("Ohm", "Ω").replace("ohm", "Ω");

    // Viscosity shorthand in many experimental papers
    if u.eq_ignore_ascii_case("cps") {
        u = "cP".to_string();
    }

    // Concentration typography
    if u == "molL−1" || u == "molL-1" || u == "mol·L−1" {
        u = "mol/L".to_string();
    }

    u
}

/// Look up a unit, canonicalizing first.
pub fn unit_lookup(u: &str) -> Option<&'static UnitInfo> {
    let canon = canonicalize_unit(u);
    UNIT_TABLE.get(canon.as_str()).or_else(|| UNIT_TABLE.get(u))
}

/// Convert a value to the canonical unit of its dimension class.
///
/// Returns `(value_si, si_unit, dimension)`, or `None` when the unit is not
/// recognized. Callers must retain the record either way; an unresolved unit
/// only leaves the SI fields empty.
pub fn to_si(value: f64, unit: &str) -> Option<(f64, &'static str, &'static str)> {
    let info = unit_lookup(unit)?;
    let v_si = (value + info.offset) * info.factor;
    Some((v_si, info.si_unit, info.dimension))
}

// ---------------------------------------------------------------------------
// Numeric parsing
// ---------------------------------------------------------------------------

static THOUSANDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)[\s,](\d{3})\b").unwrap());

static SCI_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"×\s*10\s*\^?\s*([+-]?\d+)").unwrap());

/// Value followed by a unit-like token. The value supports decimal,
/// `× 10^n` (including the broken "× 10n" artifact), and e-notation.
static VALUE_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<val>[+-]?\d+(?:\.\d+)?(?:\s*×\s*10\s*\^?\s*[+-]?\d+)?(?:[eE][+-]?\d+)?)\s*(?P<unit>[A-Za-z0-9°Ω%μµ·*/^−-]+)",
    )
    .unwrap()
});

/// Hyphen/dash-separated range with an optional trailing unit.
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<min>[+-]?\d+(?:\.\d+)?)\s*[-–—−]\s*(?P<max>[+-]?\d+(?:\.\d+)?)\s*(?P<unit>[A-Za-z0-9°Ω%μµ·*/^−-]+)?",
    )
    .unwrap()
});

/// Bare numeric token: plain, spaced/comma thousands, ×10 marker, e-notation.
static NUM_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[+-]?(?:\d{1,3}(?:[\s,]\d{3})+|\d+)(?:\.\d+)?(?:\s*×\s*10\s*\^?\s*[+-]?\d+)?(?:[eE][+-]?\d+)?",
    )
    .unwrap()
});

/// Parse a float from PDF-extracted text.
///
/// Handles spaced/comma thousands ("67 732" -> 67732), the broken scientific
/// notation artifact ("2.88 × 1010" -> 2.88e10), and unicode minus.
pub fn parse_float(s: &str) -> Option<f64> {
    let mut s = s.trim().replace('−', "-");
    if s.is_empty() {
        return None;
    }

    // Thousands separators between digit groups; loop because replace_all
    // does not rescan replaced text ("1 234 567").
    while THOUSANDS_RE.is_match(&s) {
        s = THOUSANDS_RE.replace_all(&s, "${1}${2}").into_owned();
    }

    if let Some(caps) = SCI_MARKER_RE.captures(&s) {
        let exp: i32 = caps[1].parse().ok()?;
        let base_txt = SCI_MARKER_RE.replace(&s, "").trim().to_string();
        let base = if base_txt.is_empty() {
            1.0
        } else {
            base_txt.parse::<f64>().ok()?
        };
        return Some(base * 10f64.powi(exp));
    }

    s.parse::<f64>().ok()
}

/// Parse a numeric value or range with no explicit unit.
///
/// Returns `(min, max)`; equal for a point value.
pub fn parse_numeric_only(text: &str) -> (Option<f64>, Option<f64>) {
    let t = collapse_whitespace(text);

    if let Some(caps) = RANGE_RE.captures(&t) {
        if caps.name("unit").is_none() {
            let vmin = caps.name("min").and_then(|m| parse_float(m.as_str()));
            let vmax = caps.name("max").and_then(|m| parse_float(m.as_str()));
            return (vmin, vmax);
        }
    }

    if let Some(m) = NUM_TOKEN_RE.find(&t) {
        let v = parse_float(m.as_str());
        return (v, v);
    }

    (None, None)
}

/// Scan text for a value (or range) with a trailing unit.
///
/// Attempts range-with-unit first, then single-value-with-unit, then gives
/// up. A "unit" consisting purely of digits is a spaced-thousands artifact;
/// the scan falls back to numeric-only parsing and reports no unit.
pub fn parse_value_and_unit(text: &str) -> (Option<f64>, Option<f64>, Option<String>) {
    let t = collapse_whitespace(text);

    if let Some(caps) = RANGE_RE.captures(&t) {
        if let Some(u) = caps.name("unit") {
            let unit = u.as_str().trim();
            if !unit.is_empty() && unit.chars().all(|c| c.is_ascii_digit()) {
                let (vmin, vmax) = parse_numeric_only(&t);
                return (vmin, vmax, None);
            }
            let vmin = caps.name("min").and_then(|m| parse_float(m.as_str()));
            let vmax = caps.name("max").and_then(|m| parse_float(m.as_str()));
            if let (Some(vmin), Some(vmax)) = (vmin, vmax) {
                return (Some(vmin), Some(vmax), Some(unit.to_string()));
            }
        }
    }

    if let Some(caps) = VALUE_UNIT_RE.captures(&t) {
        let unit = caps
            .name("unit")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if !unit.is_empty() && unit.chars().all(|c| c.is_ascii_digit()) {
            let (vmin, vmax) = parse_numeric_only(&t);
            return (vmin, vmax, None);
        }
        if let Some(v) = caps.name("val").and_then(|m| parse_float(m.as_str())) {
            if !unit.is_empty() {
                return (Some(v), Some(v), Some(unit));
            }
        }
    }

    (None, None, None)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
