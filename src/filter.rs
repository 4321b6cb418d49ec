//! Text block filtering.
//!
//! Drops the page furniture that pollutes extraction: running headers and
//! footers, DOI lines, and fragments too short to carry a measurement.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::access::{PdfAccess, RawBlock};
use crate::error::Result;
use crate::units::collapse_whitespace;

/// Header/footer exclusion band, in PDF points from either page edge.
pub const HEADER_FOOTER_MARGIN: f32 = 60.0;

/// Minimum block length, in chars after whitespace collapsing.
pub const MIN_BLOCK_LEN: usize = 3;

static DOI_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\bdoi\b|10\.\d{4,9}/")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// A filtered text block with page provenance.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// 1-based page number.
    pub page: u32,
    pub bbox: crate::access::BBox,
    pub text: String,
}

/// Collect all text blocks in the document that survive filtering.
///
/// A block is kept when, after collapsing internal whitespace, it is at least
/// [`MIN_BLOCK_LEN`] chars long, lies fully outside the header/footer bands,
/// and contains no DOI marker.
pub fn filtered_text_blocks(doc: &dyn PdfAccess) -> Result<Vec<TextBlock>> {
    let mut out = Vec::new();
    for page in 1..=doc.page_count() {
        let (_, page_h) = doc.page_size(page)?;
        for block in doc.text_blocks(page)? {
            if let Some(tb) = keep_block(&block, page, page_h) {
                out.push(tb);
            }
        }
    }
    log::debug!("kept {} text blocks after filtering", out.len());
    Ok(out)
}

fn keep_block(block: &RawBlock, page: u32, page_h: f32) -> Option<TextBlock> {
    let text = collapse_whitespace(&block.text);
    if text.chars().count() < MIN_BLOCK_LEN {
        return None;
    }
    if block.bbox.y0 < HEADER_FOOTER_MARGIN || block.bbox.y1 > page_h - HEADER_FOOTER_MARGIN {
        return None;
    }
    if DOI_RE.is_match(&text) {
        return None;
    }
    Some(TextBlock {
        page,
        bbox: block.bbox,
        text,
    })
}
