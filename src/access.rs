//! PDF access capability abstraction.
//!
//! Provides a trait-based interface for low-level document access, isolating
//! the concrete PDF library from the extraction logic. Rendering, glyph
//! decoding, and layout reconstruction are supplied capabilities; everything
//! downstream of this trait works on plain text, spans, and bounding boxes.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An axis-aligned bounding box in page-point space.
///
/// `(x0, y0)` is the top-left corner, `(x1, y1)` the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// A raw text block as emitted by the layout source, before filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    pub bbox: BBox,
    pub text: String,
}

/// A text span with font metadata, the finest layout granularity we consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bbox: BBox,
    pub font_size: f32,
    pub font_name: String,
}

/// A layout line: the union bbox of its spans, in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub bbox: BBox,
    pub spans: Vec<Span>,
}

impl Line {
    /// Concatenated span text, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for sp in &self.spans {
            out.push_str(&sp.text);
        }
        out.trim().to_string()
    }
}

/// An embedded raster image extracted from the document.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// 1-based page number.
    pub page: u32,
    /// Placement bbox on the page, if the layout source reports one.
    pub bbox: Option<BBox>,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// File extension of the encoded bytes ("png", "jpeg", ...).
    pub ext: String,
}

/// Abstract interface for document access.
///
/// Implementations wrap a concrete PDF library. Pages are 1-based everywhere
/// in this crate. Methods may be called repeatedly for the same page; results
/// must be deterministic for an unchanged document.
pub trait PdfAccess {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Text blocks for a page, in the layout source's emission order.
    fn text_blocks(&self, page: u32) -> Result<Vec<RawBlock>>;

    /// Span-level layout lines for a page.
    fn layout_lines(&self, page: u32) -> Result<Vec<Line>>;

    /// All embedded images in the document.
    fn extract_images(&self) -> Result<Vec<EmbeddedImage>>;

    /// Page size as (width, height) in points.
    fn page_size(&self, page: u32) -> Result<(f32, f32)>;

    /// Rasterize a page region at the given dpi.
    fn render_region(&self, page: u32, bbox: BBox, dpi: u32) -> Result<DynamicImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_union() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 20.0, 15.0);
        let u = a.union(&b);
        assert_eq!(u, BBox::new(0.0, 0.0, 20.0, 15.0));
    }

    #[test]
    fn test_bbox_area() {
        let b = BBox::new(2.0, 3.0, 12.0, 8.0);
        assert_eq!(b.width(), 10.0);
        assert_eq!(b.height(), 5.0);
        assert_eq!(b.area(), 50.0);
    }

    #[test]
    fn test_degenerate_bbox() {
        let b = BBox::new(10.0, 10.0, 5.0, 5.0);
        assert_eq!(b.area(), 0.0);
    }

    #[test]
    fn test_line_text() {
        let line = Line {
            bbox: BBox::default(),
            spans: vec![
                Span {
                    text: "Table ".into(),
                    bbox: BBox::default(),
                    font_size: 10.0,
                    font_name: "Helvetica".into(),
                },
                Span {
                    text: "1".into(),
                    bbox: BBox::default(),
                    font_size: 10.0,
                    font_name: "Helvetica".into(),
                },
            ],
        };
        assert_eq!(line.text(), "Table 1");
    }
}
