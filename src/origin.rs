//! Origin classification: does an extracted value belong to "this work" or to
//! cited literature?
//!
//! Numbers in a paper appear in distinct rhetorical roles: values measured by
//! the authors, values quoted from prior work (usually with citations), and
//! ambiguous mentions. The classifier is deterministic and auditable, built
//! from explicit citation markers, rhetorical cue phrases, and an optional
//! section prior.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::units::collapse_whitespace;

/// Rhetorical provenance of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Measured/reported by the paper's authors.
    ThisWork,
    /// Quoted from prior work.
    Literature,
    /// Both this-work and literature cues present.
    Mixed,
    /// No explicit cues.
    #[default]
    Unclear,
}

impl Origin {
    /// True for the two resolved labels that raise extraction confidence.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Origin::ThisWork | Origin::Literature)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::ThisWork => "this_work",
            Origin::Literature => "literature",
            Origin::Mixed => "mixed",
            Origin::Unclear => "unclear",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Numeric citation styles: [12], [12,13], [12-15]
static CIT_NUM_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*\d+(?:\s*[-,]\s*\d+)*\s*\]").unwrap());
// Parenthetical numeric citations: (12) or (12,13)
static CIT_NUM_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\d+(?:\s*[-,]\s*\d+)*\s*\)").unwrap());
// Author-year citations: (Smith et al., 2020) / (Smith, 2020)
static CIT_AUTHOR_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*[A-Z][A-Za-z\-]+(?:\s+et\s+al\.)?(?:,\s*)?\d{4}\s*\)").unwrap()
});
// "Ref. 12", "Refs. 12-14"
static CIT_REF: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\bRefs?\.?\s*\d+(?:\s*[-,]\s*\d+)*")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static LIT_CUES: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\b(previously|reported|literature|in\s+the\s+literature|has\s+been\s+reported|as\s+reported|according\s+to|as\s+shown\s+in|consistent\s+with|similar\s+to|in\s+Refs?\.?)\b",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

static THISWORK_CUES: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\b(this\s+work|in\s+this\s+work|herein|in\s+this\s+study|we\s+report|we\s+measured|we\s+observe|our\s+results|the\s+present\s+work|this\s+study\s+demonstrates)\b",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

const LIT_SECTIONS: [&str; 4] = ["introduction", "background", "related work", "literature review"];
const THIS_SECTIONS: [&str; 6] = [
    "experimental",
    "materials and methods",
    "methods",
    "results",
    "discussion",
    "results and discussion",
];

/// Evidence backing an origin decision, attached to each record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginRationale {
    pub citations: Vec<String>,
    pub has_citation: bool,
    pub has_lit_cue: bool,
    pub has_thiswork_cue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_vote: Option<Origin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity: Option<ProximityEvidence>,
}

/// Near-window evidence used by the value-proximity override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProximityEvidence {
    pub pre_near: String,
    pub post_near: String,
    pub pre_citations: Vec<String>,
    pub post_citations: Vec<String>,
    pub has_lit_cue_near: bool,
    pub has_thiswork_cue_near: bool,
}

/// Detect citation markers, deduplicated in first-seen order.
pub fn detect_citations(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for pat in [&*CIT_NUM_BRACKETS, &*CIT_NUM_PARENS, &*CIT_AUTHOR_YEAR, &*CIT_REF] {
        for m in pat.find_iter(text) {
            let c = m.as_str().to_string();
            if !out.contains(&c) {
                out.push(c);
            }
        }
    }
    out
}

/// Classify the origin of a text window.
///
/// Decision table, in priority order:
/// 1. this-work cue AND (citation OR literature cue) -> mixed
/// 2. citation OR literature cue -> literature
/// 3. this-work cue alone -> this_work
/// 4. section prior if provided, else unclear
pub fn classify_origin(text: &str, section_hint: Option<&str>) -> (Origin, OriginRationale) {
    let t = collapse_whitespace(text);

    let citations = detect_citations(&t);
    let has_cit = !citations.is_empty();
    let has_lit_cue = LIT_CUES.is_match(&t);
    let has_this_cue = THISWORK_CUES.is_match(&t);

    let section_vote = section_hint.and_then(|s| {
        let s = s.trim().to_lowercase();
        if LIT_SECTIONS.contains(&s.as_str()) {
            Some(Origin::Literature)
        } else if THIS_SECTIONS.contains(&s.as_str()) {
            Some(Origin::ThisWork)
        } else {
            None
        }
    });

    let label = if has_this_cue && (has_cit || has_lit_cue) {
        Origin::Mixed
    } else if has_cit || has_lit_cue {
        Origin::Literature
    } else if has_this_cue {
        Origin::ThisWork
    } else {
        section_vote.unwrap_or(Origin::Unclear)
    };

    let rationale = OriginRationale {
        citations,
        has_citation: has_cit,
        has_lit_cue,
        has_thiswork_cue: has_this_cue,
        section_hint: section_hint.map(|s| s.to_string()),
        section_vote,
        proximity: None,
    };
    (label, rationale)
}

/// Classify origin for a specific numeric mention at byte range `start..end`.
///
/// The generic window classification is computed over ±80 chars, then a
/// proximity override is applied over ±45-char near windows:
/// - citation immediately after the value, or citation before plus a nearby
///   literature cue -> literature
/// - this-work cue before the value with no nearby citation or literature
///   cue -> this_work
pub fn classify_origin_near_value(
    text: &str,
    start: usize,
    end: usize,
    section_hint: Option<&str>,
) -> (Origin, OriginRationale) {
    let pre_start = step_back(text, start, 80);
    let post_end = step_forward(text, end, 80);
    let pre_near_start = step_back(text, start, 45);
    let post_near_end = step_forward(text, end, 45);

    let pre = &text[pre_start..start];
    let post_near = &text[end..post_near_end];
    let pre_near = &text[pre_near_start..start];

    let post_cits = detect_citations(post_near);
    let pre_cits = detect_citations(pre_near);
    let has_post_cit = !post_cits.is_empty();
    let has_pre_cit = !pre_cits.is_empty();

    let has_lit_near = LIT_CUES.is_match(pre_near) || LIT_CUES.is_match(post_near);
    let has_this_near = THISWORK_CUES.is_match(pre) || THISWORK_CUES.is_match(pre_near);

    let window = &text[pre_start..post_end];
    let (mut label, mut rationale) = classify_origin(window, section_hint);
    rationale.proximity = Some(ProximityEvidence {
        pre_near: pre_near.trim().to_string(),
        post_near: post_near.trim().to_string(),
        pre_citations: pre_cits,
        post_citations: post_cits,
        has_lit_cue_near: has_lit_near,
        has_thiswork_cue_near: has_this_near,
    });

    if has_post_cit || (has_pre_cit && has_lit_near) {
        label = Origin::Literature;
    } else if has_this_near && !has_lit_near {
        label = Origin::ThisWork;
    }

    (label, rationale)
}

/// Byte index `chars` characters before `idx` (clamped to the string start).
pub(crate) fn step_back(text: &str, idx: usize, chars: usize) -> usize {
    let mut i = idx;
    for _ in 0..chars {
        match text[..i].char_indices().next_back() {
            Some((j, _)) => i = j,
            None => break,
        }
    }
    i
}

/// Byte index `chars` characters after `idx` (clamped to the string end).
pub(crate) fn step_forward(text: &str, idx: usize, chars: usize) -> usize {
    match text[idx..].char_indices().nth(chars) {
        Some((j, _)) => idx + j,
        None => text.len(),
    }
}
