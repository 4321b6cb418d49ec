//! Figure extraction and caption linking.
//!
//! Embedded images are pulled from the document and linked to "Figure N"
//! captions by page proximity. Captions drive a coarse figure-type label
//! (plot vs micrograph vs schematic); plot digitization is a hook for later.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::access::{BBox, PdfAccess};
use crate::error::Result;
use crate::filter::{filtered_text_blocks, TextBlock};

static CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\b(Fig\.?|Figure)\s*\d+\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static PLOT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\b(viscosity|modulus|nyquist|cole-cole|conductivity|tauc|stress[-\s]strain|frequency|shear rate|arrhenius|impedance|EIS|G'|G''|tan\s*δ)\b",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

static MICRO_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\b(SEM|TEM|AFM|micrograph|morphology|cross-section|cross section)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Coarse figure classification from caption keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureType {
    Plot,
    Micrograph,
    Schematic,
    Unknown,
}

/// A detected figure caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureCaption {
    pub page: u32,
    pub bbox: BBox,
    pub text: String,
}

/// An extracted figure image with its linked caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureImage {
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    pub width: u32,
    pub height: u32,
    pub ext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_page: Option<u32>,
    pub figure_type: FigureType,
    pub plot_like: bool,
    /// Where the image was written, when the pipeline saved it to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Encoded image bytes; not serialized into the manifest.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Figure manifest: images with linked captions, plus all detected captions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FigureManifest {
    pub images: Vec<FigureImage>,
    pub captions: Vec<FigureCaption>,
}

/// Extract embedded images and link each to the best caption on or near its
/// page.
pub fn extract_figures_and_captions(doc: &dyn PdfAccess) -> Result<FigureManifest> {
    let captions = find_figure_captions(doc)?;

    let mut images = Vec::new();
    for img in doc.extract_images()? {
        let cap = best_caption_for_page(&captions, img.page);
        let caption_text = cap.map(|c| c.text.clone());
        let figure_type = infer_figure_type(caption_text.as_deref().unwrap_or(""));
        images.push(FigureImage {
            page: img.page,
            bbox: img.bbox,
            width: img.width,
            height: img.height,
            ext: img.ext,
            plot_like: caption_text
                .as_deref()
                .is_some_and(|c| PLOT_KEYWORDS.is_match(c)),
            caption: caption_text,
            caption_page: cap.map(|c| c.page),
            figure_type,
            path: None,
            data: img.data,
        });
    }

    log::debug!(
        "extracted {} images, {} figure captions",
        images.len(),
        captions.len()
    );
    Ok(FigureManifest { images, captions })
}

/// All text blocks that contain a "Figure N" marker.
pub fn find_figure_captions(doc: &dyn PdfAccess) -> Result<Vec<FigureCaption>> {
    let blocks = filtered_text_blocks(doc)?;
    Ok(blocks
        .iter()
        .filter(|tb| CAPTION_RE.is_match(&tb.text))
        .map(|tb: &TextBlock| FigureCaption {
            page: tb.page,
            bbox: tb.bbox,
            text: tb.text.clone(),
        })
        .collect())
}

/// Caption on the same page (longest wins), else on an adjacent page.
fn best_caption_for_page(captions: &[FigureCaption], page: u32) -> Option<&FigureCaption> {
    let same = captions
        .iter()
        .filter(|c| c.page == page)
        .max_by_key(|c| c.text.chars().count());
    if same.is_some() {
        return same;
    }
    captions
        .iter()
        .filter(|c| c.page.abs_diff(page) == 1)
        .min_by_key(|c| c.page.abs_diff(page))
}

/// Label a figure from its caption keywords. Micrograph cues win over plot
/// cues; SEM captions often mention properties too.
pub fn infer_figure_type(caption: &str) -> FigureType {
    if MICRO_KEYWORDS.is_match(caption) {
        return FigureType::Micrograph;
    }
    if PLOT_KEYWORDS.is_match(caption) {
        return FigureType::Plot;
    }
    let low = caption.to_lowercase();
    if low.contains("scheme") || low.contains("schematic") {
        return FigureType::Schematic;
    }
    FigureType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{EmbeddedImage, Line, RawBlock};
    use image::DynamicImage;

    struct FigDoc {
        blocks: Vec<(u32, String)>,
        images: Vec<EmbeddedImage>,
    }

    impl PdfAccess for FigDoc {
        fn page_count(&self) -> u32 {
            self.blocks.iter().map(|(p, _)| *p).max().unwrap_or(1)
        }
        fn text_blocks(&self, page: u32) -> Result<Vec<RawBlock>> {
            Ok(self
                .blocks
                .iter()
                .filter(|(p, _)| *p == page)
                .map(|(_, t)| RawBlock {
                    bbox: BBox::new(50.0, 300.0, 400.0, 320.0),
                    text: t.clone(),
                })
                .collect())
        }
        fn layout_lines(&self, _page: u32) -> Result<Vec<Line>> {
            Ok(vec![])
        }
        fn extract_images(&self) -> Result<Vec<EmbeddedImage>> {
            Ok(self.images.clone())
        }
        fn page_size(&self, _page: u32) -> Result<(f32, f32)> {
            Ok((612.0, 792.0))
        }
        fn render_region(&self, _page: u32, _bbox: BBox, _dpi: u32) -> Result<DynamicImage> {
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    fn img(page: u32) -> EmbeddedImage {
        EmbeddedImage {
            page,
            bbox: None,
            data: vec![1, 2, 3],
            width: 640,
            height: 480,
            ext: "png".into(),
        }
    }

    #[test]
    fn test_caption_linked_same_page() {
        let doc = FigDoc {
            blocks: vec![(1, "Figure 1. Arrhenius plot of ionic conductivity.".into())],
            images: vec![img(1)],
        };
        let manifest = extract_figures_and_captions(&doc).unwrap();
        assert_eq!(manifest.images.len(), 1);
        let f = &manifest.images[0];
        assert!(f.caption.as_deref().unwrap().contains("Arrhenius"));
        assert_eq!(f.caption_page, Some(1));
        assert_eq!(f.figure_type, FigureType::Plot);
        assert!(f.plot_like);
    }

    #[test]
    fn test_adjacent_page_caption() {
        let doc = FigDoc {
            blocks: vec![(2, "Figure 3. SEM micrograph of the membrane surface.".into())],
            images: vec![img(1)],
        };
        let manifest = extract_figures_and_captions(&doc).unwrap();
        let f = &manifest.images[0];
        assert_eq!(f.caption_page, Some(2));
        assert_eq!(f.figure_type, FigureType::Micrograph);
        assert!(!f.plot_like);
    }

    #[test]
    fn test_no_caption() {
        let doc = FigDoc {
            blocks: vec![(1, "No figures are discussed in this block of text.".into())],
            images: vec![img(1)],
        };
        let manifest = extract_figures_and_captions(&doc).unwrap();
        assert!(manifest.images[0].caption.is_none());
        assert_eq!(manifest.images[0].figure_type, FigureType::Unknown);
    }

    #[test]
    fn test_figure_type_priority() {
        assert_eq!(
            infer_figure_type("Figure 2. SEM images and conductivity plots."),
            FigureType::Micrograph
        );
        assert_eq!(
            infer_figure_type("Figure 4. Schematic of the cell assembly."),
            FigureType::Schematic
        );
    }
}
