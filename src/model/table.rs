//! Reconstructed table representation.

use serde::{Deserialize, Serialize};

use crate::access::BBox;

/// Which reconstruction tier produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSource {
    /// Caption-anchored parse of the text layer.
    CaptionText,
    /// Caption-anchored region, recovered via OCR.
    CaptionOcr,
    /// Caption-anchored region, recovered via a vision model.
    CaptionVlm,
    /// Layout heuristic over span x-positions.
    Layout,
}

impl TableSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableSource::CaptionText => "caption_text",
            TableSource::CaptionOcr => "caption_ocr",
            TableSource::CaptionVlm => "caption_vlm",
            TableSource::Layout => "layout",
        }
    }
}

/// OCR diagnostics recorded when a table was recovered from a raster region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrStats {
    pub words: usize,
    pub row_groups: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub column_x: Vec<f32>,
    pub row_tol: f32,
    pub gap_tol: f32,
    pub col_tol: f32,
    pub conf_mean: f32,
}

/// Diagnostics from a vision-model table parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VlmStats {
    pub model: String,
    pub raw_len: usize,
}

/// Table-level metadata: caption, reconstruction source, and comparison cues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TableSource>,
    /// Region rasterized for the OCR/VLM fallback, in page points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_this_work_column: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_literature_column: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub likely_contains_citations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlm: Option<VlmStats>,
}

/// A reconstructed table: header plus data rows with page provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// 1-based page number.
    pub page: u32,
    pub bbox: BBox,
    pub rows: Vec<Vec<String>>,
    /// Representative column x-positions; empty for caption-derived tables.
    pub column_x: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<String>>,
    #[serde(default)]
    pub meta: TableMeta,
}

impl Table {
    /// Effective header: the explicit one, or the first row when none.
    pub fn effective_header(&self) -> Option<&[String]> {
        match &self.header {
            Some(h) => Some(h.as_slice()),
            None => self.rows.first().map(|r| r.as_slice()),
        }
    }

    /// Data rows, excluding the first row when it serves as the header.
    pub fn data_rows(&self) -> &[Vec<String>] {
        if self.header.is_some() {
            &self.rows
        } else if self.rows.is_empty() {
            &self.rows
        } else {
            &self.rows[1..]
        }
    }
}
