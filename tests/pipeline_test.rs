//! End-to-end pipeline tests against a synthetic document.

use image::DynamicImage;

use litmine::pipeline::{run, Capabilities, PipelineOptions};
use litmine::tables::ocr::{OcrEngine, OcrWord};
use litmine::tables::{reconstruct_tables, FallbackOptions, TableFallback, VisionClient};
use litmine::{
    BBox, EmbeddedImage, Line, Novelty, Origin, PdfAccess, RawBlock, Result, SourceType, Span,
    TableSource,
};

struct PageData {
    blocks: Vec<RawBlock>,
    lines: Vec<Line>,
}

struct StubDoc {
    pages: Vec<PageData>,
    images: Vec<EmbeddedImage>,
}

impl PdfAccess for StubDoc {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn text_blocks(&self, page: u32) -> Result<Vec<RawBlock>> {
        Ok(self.pages[page as usize - 1].blocks.clone())
    }

    fn layout_lines(&self, page: u32) -> Result<Vec<Line>> {
        Ok(self.pages[page as usize - 1].lines.clone())
    }

    fn extract_images(&self) -> Result<Vec<EmbeddedImage>> {
        Ok(self.images.clone())
    }

    fn page_size(&self, _page: u32) -> Result<(f32, f32)> {
        Ok((612.0, 792.0))
    }

    fn render_region(&self, _page: u32, _bbox: BBox, _dpi: u32) -> Result<DynamicImage> {
        Ok(DynamicImage::new_rgb8(8, 8))
    }
}

fn block(text: &str, y: f32) -> RawBlock {
    RawBlock {
        bbox: BBox::new(50.0, y, 550.0, y + 30.0),
        text: text.into(),
    }
}

fn line(text: &str, y: f32) -> Line {
    let bbox = BBox::new(50.0, y, 550.0, y + 12.0);
    Line {
        bbox,
        spans: vec![Span {
            text: text.into(),
            bbox,
            font_size: 9.0,
            font_name: "Helvetica".into(),
        }],
    }
}

fn paper() -> StubDoc {
    let blocks = vec![
        block("Journal of Polymer Science", 20.0),
        block("https://doi.org/10.1021/acs.macromol.6b01234", 200.0),
        block(
            "In this work the PEO electrolyte reached an ionic conductivity of 1.2 mS/cm.",
            240.0,
        ),
        block("Figure 1. Arrhenius plot of ionic conductivity.", 600.0),
    ];
    let table_lines: Vec<Line> = [
        "Table 1. Conductivity of the polymer electrolytes.",
        "sample",
        "Conductivity",
        "(mS/cm)",
        "PEO-10",
        "1.2",
        "PEO-20",
        "2.5",
        "Figure 1. Arrhenius plot of ionic conductivity.",
    ]
    .iter()
    .enumerate()
    .map(|(i, t)| line(t, 100.0 + 14.0 * i as f32))
    .collect();

    StubDoc {
        pages: vec![PageData {
            blocks,
            lines: table_lines,
        }],
        images: vec![EmbeddedImage {
            page: 1,
            bbox: None,
            data: vec![0x89, 0x50, 0x4e, 0x47],
            width: 640,
            height: 480,
            ext: "png".into(),
        }],
    }
}

#[test]
fn test_end_to_end_run() {
    let doc = paper();
    let dir = tempfile::tempdir().unwrap();
    let baseline = dir.path().join("baseline.csv");
    std::fs::write(
        &baseline,
        "material,property,value,unit\nPEO,ionic_conductivity,1.0,mS/cm\n",
    )
    .unwrap();

    let options = PipelineOptions::new("doc-001").with_baseline_path(&baseline);
    let out = run(&doc, dir.path(), &options, &Capabilities::default()).unwrap();

    // Text record: this-work conductivity with full confidence stack.
    let text_rec = out
        .records
        .iter()
        .find(|r| r.source_type == SourceType::Text && r.property == "ionic_conductivity")
        .expect("text conductivity record");
    assert_eq!(text_rec.material, "PEO");
    assert_eq!(text_rec.origin, Origin::ThisWork);
    assert_eq!(text_rec.unit_si.as_deref(), Some("S/m"));
    assert!((text_rec.confidence - 0.90).abs() < 1e-9);
    assert_eq!(text_rec.provenance.page, Some(1));

    // Caption-anchored table plus its records.
    assert_eq!(out.tables.len(), 1);
    assert_eq!(out.tables[0].meta.source, Some(TableSource::CaptionText));
    assert_eq!(out.tables[0].meta.table_number, Some(1));
    let table_recs: Vec<_> = out
        .records
        .iter()
        .filter(|r| r.source_type == SourceType::Table)
        .collect();
    assert_eq!(table_recs.len(), 2);
    assert!(table_recs.iter().any(|r| r.material == "PEO-10"));
    assert!(table_recs.iter().all(|r| r.origin == Origin::ThisWork));

    // Constraints ran: conductivity unit is dimension-compatible.
    assert!(text_rec
        .constraints
        .hard_pass
        .contains(&"unit_dimension_compatible".to_string()));

    // Comparison: this work lies above the baseline range.
    let row = out
        .comparison
        .iter()
        .find(|r| r.material == "PEO" && r.property == "ionic_conductivity")
        .expect("comparison row");
    assert!(!row.this_work.is_empty());
    assert!(!row.external_baseline.is_empty());
    assert_eq!(row.novelty_flag, Some(Novelty::NewRegimeVsBaseline));

    // Figures linked to the caption block.
    assert_eq!(out.figures.images.len(), 1);
    assert!(out.figures.images[0]
        .caption
        .as_deref()
        .unwrap()
        .contains("Arrhenius"));
    assert!(out.figures.images[0].path.is_some());

    // Persisted outputs.
    assert!(out.output_json.exists());
    assert!(out.output_csv.exists());
    assert!(out.output_comparison_csv.exists());
    let payload: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out.output_json).unwrap()).unwrap();
    assert_eq!(payload["doc_id"], "doc-001");
    assert_eq!(payload["tables"][0]["table_id"], "T1");
    let summary = std::fs::read_to_string(&out.output_csv).unwrap();
    assert!(summary.lines().count() > 1);
}

#[test]
fn test_missing_baseline_is_empty_not_fatal() {
    let doc = paper();
    let dir = tempfile::tempdir().unwrap();
    let options =
        PipelineOptions::new("doc-002").with_baseline_path("/nonexistent/baseline.json");
    let out = run(&doc, dir.path(), &options, &Capabilities::default()).unwrap();
    for row in &out.comparison {
        assert!(row.external_baseline.is_empty());
    }
}

#[test]
fn test_header_footer_and_doi_blocks_excluded() {
    let doc = paper();
    let dir = tempfile::tempdir().unwrap();
    let options = PipelineOptions::new("doc-003");
    let out = run(&doc, dir.path(), &options, &Capabilities::default()).unwrap();
    for r in &out.records {
        assert!(!r.provenance.snippet.contains("doi.org"));
        assert!(!r.provenance.snippet.contains("Journal of Polymer Science"));
    }
}

struct GridOcr;

impl OcrEngine for GridOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrWord>> {
        let word = |text: &str, left: i32, top: i32, width: i32| OcrWord {
            text: text.into(),
            left,
            top,
            width,
            height: 12,
            conf: 92.0,
        };
        Ok(vec![
            word("sample", 10, 10, 50),
            word("Tg", 250, 10, 20),
            word("PEO-1", 10, 40, 45),
            word("210", 250, 40, 30),
            word("PEO-2", 10, 70, 45),
            word("195", 250, 70, 30),
        ])
    }
}

fn image_table_doc() -> StubDoc {
    // Caption with no parseable text-layer body: the grid is rasterized.
    let lines = vec![
        line("Table 2. Thermal properties of the membranes.", 100.0),
        line("Figure 3. DSC thermograms.", 400.0),
    ];
    StubDoc {
        pages: vec![PageData {
            blocks: vec![],
            lines,
        }],
        images: vec![EmbeddedImage {
            page: 1,
            bbox: Some(BBox::new(60.0, 130.0, 500.0, 350.0)),
            data: vec![0x89, 0x50, 0x4e, 0x47],
            width: 880,
            height: 440,
            ext: "png".into(),
        }],
    }
}

#[test]
fn test_ocr_fallback_in_cascade() {
    let doc = image_table_doc();
    let engine = GridOcr;
    let fallback = FallbackOptions {
        mode: TableFallback::Ocr,
        ocr: Some(&engine),
        ..Default::default()
    };
    let tables = reconstruct_tables(&doc, &fallback).unwrap();
    assert_eq!(tables.len(), 1);
    let t = &tables[0];
    assert_eq!(t.meta.source, Some(TableSource::CaptionOcr));
    assert_eq!(t.meta.table_number, Some(2));
    assert_eq!(t.header.as_ref().unwrap(), &vec!["sample".to_string(), "Tg".to_string()]);
    assert_eq!(t.rows.len(), 2);
    assert!(t.meta.ocr.is_some());
    // The crop follows the embedded image bbox, padded, not the full page.
    let crop = t.meta.crop_bbox.unwrap();
    assert!(crop.x0 > 0.0 && crop.x1 < 612.0);
    assert!(crop.y0 >= 100.0 && crop.y1 <= 400.0);
}

struct CannedVision;

impl VisionClient for CannedVision {
    fn complete(&self, _png: &[u8], _system: &str, _user: &str, _model: &str) -> Result<String> {
        Ok(r#"{"header": ["sample", "Tg (°C)"], "rows": [["PEO-1", "210"]]}"#.to_string())
    }
}

#[test]
fn test_vlm_fallback_in_cascade() {
    let doc = image_table_doc();
    let client = CannedVision;
    let fallback = FallbackOptions {
        mode: TableFallback::Vlm,
        vlm: Some(&client),
        vlm_model: "test-model",
        ..Default::default()
    };
    let tables = reconstruct_tables(&doc, &fallback).unwrap();
    assert_eq!(tables.len(), 1);
    let t = &tables[0];
    assert_eq!(t.meta.source, Some(TableSource::CaptionVlm));
    assert_eq!(t.meta.vlm.as_ref().unwrap().model, "test-model");
    assert_eq!(t.rows[0][1], "210");
}

#[test]
fn test_fallback_without_capability_degrades() {
    let doc = image_table_doc();
    let fallback = FallbackOptions {
        mode: TableFallback::Ocr,
        ..Default::default()
    };
    // No engine supplied: the caption tier yields nothing; the layout tier
    // has no aligned lines either, so the cascade returns no tables.
    let tables = reconstruct_tables(&doc, &fallback).unwrap();
    assert!(tables.is_empty());
}

#[test]
fn test_layout_tier_when_no_caption() {
    let cells = |y: f32, a: &str, b: &str, c: &str| {
        let mk = |x: f32, t: &str| Span {
            text: t.to_string(),
            bbox: BBox::new(x, y, x + 40.0, y + 10.0),
            font_size: 9.0,
            font_name: "Helvetica".into(),
        };
        let spans = vec![mk(50.0, a), mk(250.0, b), mk(450.0, c)];
        let bbox = spans
            .iter()
            .map(|s| s.bbox)
            .reduce(|p, q| p.union(&q))
            .unwrap();
        Line { bbox, spans }
    };
    let doc = StubDoc {
        pages: vec![PageData {
            blocks: vec![],
            lines: vec![
                cells(100.0, "sample", "Tg", "Mn"),
                cells(120.0, "PEO-1", "210", "35000"),
                cells(140.0, "PEO-2", "195", "52000"),
                cells(160.0, "PEO-3", "188", "61000"),
            ],
        }],
        images: vec![],
    };
    let tables = reconstruct_tables(&doc, &FallbackOptions::default()).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].meta.source, Some(TableSource::Layout));
    assert_eq!(tables[0].column_x.len(), 3);
}
