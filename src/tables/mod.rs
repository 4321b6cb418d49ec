//! Table reconstruction cascade.
//!
//! Three tiers, in order of trust: caption-anchored parsing of the text layer,
//! an OCR or vision-model fallback for image-based tables (still anchored to a
//! caption), and a layout heuristic over span positions when no caption-based
//! table was found at all.

mod caption;
mod layout;
pub mod ocr;
pub mod vlm;

pub use caption::extract_caption_tables;
pub use layout::extract_layout_tables;
pub use ocr::{OcrEngine, OcrWord};
pub use vlm::VisionClient;

use crate::access::PdfAccess;
use crate::error::Result;
use crate::model::Table;

/// Fallback tier for caption-anchored regions that fail text-layer parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFallback {
    #[default]
    None,
    Ocr,
    Vlm,
}

/// Fallback configuration: which tier, and the capabilities backing it.
pub struct FallbackOptions<'a> {
    pub mode: TableFallback,
    pub ocr: Option<&'a dyn OcrEngine>,
    pub vlm: Option<&'a dyn VisionClient>,
    pub vlm_model: &'a str,
    /// Raster resolution for region rendering.
    pub dpi: u32,
}

impl Default for FallbackOptions<'_> {
    fn default() -> Self {
        Self {
            mode: TableFallback::None,
            ocr: None,
            vlm: None,
            vlm_model: "gpt-4o-mini",
            dpi: 200,
        }
    }
}

/// Run the full cascade: caption-anchored first (with the configured
/// fallback), then the layout heuristic when no caption produced a table.
pub fn reconstruct_tables(
    doc: &dyn PdfAccess,
    fallback: &FallbackOptions<'_>,
) -> Result<Vec<Table>> {
    let tables = extract_caption_tables(doc, fallback)?;
    if !tables.is_empty() {
        return Ok(tables);
    }
    log::debug!("caption-anchored extraction found no tables; trying layout heuristic");
    extract_layout_tables(doc)
}
