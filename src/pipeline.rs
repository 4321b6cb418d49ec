//! End-to-end extraction pipeline.
//!
//! Orchestrates the full run over one document: block filtering, text and
//! table record extraction, figure extraction, constraint evaluation,
//! baseline loading, and the comparison table, then persists the JSON/CSV
//! outputs. Heuristic stages degrade; only document access failures abort.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::access::PdfAccess;
use crate::baseline::load_baseline;
use crate::compare::build_comparison_table;
use crate::constraints::evaluate_constraints;
use crate::error::{Error, Result};
use crate::extract::{extract_from_text_block, records_from_tables};
use crate::figures::{extract_figures_and_captions, FigureManifest};
use crate::filter::filtered_text_blocks;
use crate::model::{ComparisonRow, Record, Table};
use crate::ontology::document_material;
use crate::tables::{reconstruct_tables, FallbackOptions, OcrEngine, TableFallback, VisionClient};

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub doc_id: String,
    pub extract_images: bool,
    pub reconstruct_tables: bool,
    pub extract_table_records: bool,
    pub baseline_path: Option<PathBuf>,
    pub table_fallback: TableFallback,
    pub vlm_model: String,
    pub render_dpi: u32,
}

impl PipelineOptions {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            extract_images: true,
            reconstruct_tables: true,
            extract_table_records: true,
            baseline_path: None,
            table_fallback: TableFallback::None,
            vlm_model: "gpt-4o-mini".to_string(),
            render_dpi: 200,
        }
    }

    pub fn with_extract_images(mut self, yes: bool) -> Self {
        self.extract_images = yes;
        self
    }

    pub fn with_reconstruct_tables(mut self, yes: bool) -> Self {
        self.reconstruct_tables = yes;
        self
    }

    pub fn with_extract_table_records(mut self, yes: bool) -> Self {
        self.extract_table_records = yes;
        self
    }

    pub fn with_baseline_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline_path = Some(path.into());
        self
    }

    pub fn with_table_fallback(mut self, mode: TableFallback) -> Self {
        self.table_fallback = mode;
        self
    }

    pub fn with_vlm_model(mut self, model: impl Into<String>) -> Self {
        self.vlm_model = model.into();
        self
    }
}

/// External capabilities a run may use. All optional; a missing capability
/// downgrades the corresponding fallback instead of failing the run.
#[derive(Default)]
pub struct Capabilities<'a> {
    pub ocr: Option<&'a dyn OcrEngine>,
    pub vlm: Option<&'a dyn VisionClient>,
}

/// Everything a run produced, plus where it was persisted.
pub struct RunOutput {
    pub records: Vec<Record>,
    pub tables: Vec<Table>,
    pub figures: FigureManifest,
    pub comparison: Vec<ComparisonRow>,
    pub logs: Vec<String>,
    pub output_json: PathBuf,
    pub output_csv: PathBuf,
    pub output_comparison_csv: PathBuf,
}

#[derive(Serialize)]
struct TableExport<'a> {
    table_id: String,
    #[serde(flatten)]
    table: &'a Table,
}

#[derive(Serialize)]
struct OutputPayload<'a> {
    doc_id: &'a str,
    records: &'a [Record],
    tables: Vec<TableExport<'a>>,
    figures: &'a FigureManifest,
    comparison: &'a [ComparisonRow],
    logs: &'a [String],
}

#[derive(Serialize)]
struct SummaryCsvRow<'a> {
    material: &'a str,
    property: &'a str,
    category: &'a str,
    value_min: f64,
    value_max: f64,
    unit: &'a str,
    page: String,
    origin: &'a str,
    citations: String,
    confidence: f64,
    hard_fail: String,
}

#[derive(Serialize)]
struct ComparisonCsvRow<'a> {
    material: &'a str,
    property: &'a str,
    category: &'a str,
    this_work: &'a str,
    paper_cited_literature: &'a str,
    external_baseline: &'a str,
    novelty_flag: String,
    paper_citations: &'a str,
}

/// Run the full pipeline and persist outputs under `out_dir`.
pub fn run(
    doc: &dyn PdfAccess,
    out_dir: &Path,
    options: &PipelineOptions,
    caps: &Capabilities<'_>,
) -> Result<RunOutput> {
    let t0 = Instant::now();
    fs::create_dir_all(out_dir)?;

    let mut logs: Vec<String> = Vec::new();
    logs.push(format!(
        "run started: doc_id={} at {}",
        options.doc_id,
        chrono::Utc::now().to_rfc3339()
    ));
    logs.push(format!("output dir: {}", out_dir.display()));

    // Filtered text blocks (headers/footers and DOI noise excluded).
    let blocks = filtered_text_blocks(doc)?;
    logs.push(format!(
        "parsed {} text blocks after header/footer filtering",
        blocks.len()
    ));

    let doc_text = blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let default_material = document_material(&doc_text).unwrap_or_else(|| "UNKNOWN".to_string());
    logs.push(format!("default material guess: {default_material}"));

    // Text extraction.
    let mut records: Vec<Record> = Vec::new();
    for tb in &blocks {
        records.extend(extract_from_text_block(tb, &options.doc_id, &default_material));
    }
    logs.push(format!(
        "extracted {} text-derived candidate records",
        records.len()
    ));

    // Table reconstruction cascade.
    let mut tables: Vec<Table> = Vec::new();
    if options.reconstruct_tables {
        if options.table_fallback == TableFallback::Ocr && caps.ocr.is_none() {
            logs.push(
                "table fallback=OCR selected, but no OCR engine was supplied; \
                 caption parsing will not fall back"
                    .to_string(),
            );
        }
        if options.table_fallback == TableFallback::Vlm && caps.vlm.is_none() {
            logs.push(
                "table fallback=VLM selected, but no vision client was supplied; \
                 caption parsing will not fall back"
                    .to_string(),
            );
        }

        let fallback = FallbackOptions {
            mode: options.table_fallback,
            ocr: caps.ocr,
            vlm: caps.vlm,
            vlm_model: &options.vlm_model,
            dpi: options.render_dpi,
        };
        tables = reconstruct_tables(doc, &fallback)?;
        logs.push(format!("detected {} tables", tables.len()));

        if options.extract_table_records && !tables.is_empty() {
            let t_recs = records_from_tables(&tables, &options.doc_id, &default_material);
            logs.push(format!("extracted {} table-derived records", t_recs.len()));
            records.extend(t_recs);
        }
    }

    // Figures.
    let mut figures = FigureManifest::default();
    if options.extract_images {
        figures = extract_figures_and_captions(doc)?;
        let img_dir = out_dir.join("images");
        if !figures.images.is_empty() {
            fs::create_dir_all(&img_dir)?;
        }
        for (i, img) in figures.images.iter_mut().enumerate() {
            let fname = format!("fig_p{}_{}.{}", img.page, i, img.ext);
            let fpath = img_dir.join(fname);
            fs::write(&fpath, &img.data)?;
            img.path = Some(fpath.to_string_lossy().into_owned());
        }
        logs.push(format!("extracted {} embedded images", figures.images.len()));
    }

    // Constraints.
    let records = evaluate_constraints(records);
    let hard_fail_count = records.iter().filter(|r| r.constraints.is_hard_fail()).count();
    logs.push(format!(
        "constraint evaluation done; records with hard-fails: {hard_fail_count}"
    ));

    // External baseline.
    let baseline_records = match &options.baseline_path {
        Some(p) => {
            let b = load_baseline(p)?;
            logs.push(format!("loaded {} baseline records from {}", b.len(), p.display()));
            b
        }
        None => vec![],
    };

    // Comparison table.
    let comparison = build_comparison_table(&records, &baseline_records);
    logs.push(format!("built comparison table with {} rows", comparison.len()));

    logs.push(format!("run finished in {:.2} s", t0.elapsed().as_secs_f64()));

    // Persist outputs.
    let output_json = out_dir.join("litmine_output.json");
    let output_csv = out_dir.join("litmine_summary.csv");
    let output_comparison_csv = out_dir.join("litmine_comparison.csv");

    let payload = OutputPayload {
        doc_id: &options.doc_id,
        records: &records,
        tables: table_exports(&tables),
        figures: &figures,
        comparison: &comparison,
        logs: &logs,
    };
    write_json(&output_json, &payload)?;
    write_summary_csv(&output_csv, &records)?;
    write_comparison_csv(&output_comparison_csv, &comparison)?;

    if !tables.is_empty() {
        write_json(&out_dir.join("litmine_tables.json"), &table_exports(&tables))?;
    }
    if !figures.images.is_empty() || !figures.captions.is_empty() {
        write_json(&out_dir.join("litmine_figures.json"), &figures)?;
    }

    Ok(RunOutput {
        records,
        tables,
        figures,
        comparison,
        logs,
        output_json,
        output_csv,
        output_comparison_csv,
    })
}

fn table_exports(tables: &[Table]) -> Vec<TableExport<'_>> {
    tables
        .iter()
        .enumerate()
        .map(|(i, t)| TableExport {
            table_id: match t.meta.table_number {
                Some(n) => format!("T{n}"),
                None => format!("T{}", i + 1),
            },
            table: t,
        })
        .collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| Error::Output(format!("{}: {e}", path.display())))
}

fn write_summary_csv(path: &Path, records: &[Record]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for r in records {
        w.serialize(SummaryCsvRow {
            material: &r.material,
            property: &r.property,
            category: &r.category,
            value_min: r.value_min,
            value_max: r.value_max,
            unit: &r.unit_original,
            page: r
                .provenance
                .page
                .map(|p| p.to_string())
                .unwrap_or_default(),
            origin: r.origin.as_str(),
            citations: r.citations.join(";"),
            confidence: r.confidence,
            hard_fail: r.constraints.hard_fail.join(";"),
        })?;
    }
    w.flush()?;
    Ok(())
}

fn write_comparison_csv(path: &Path, rows: &[ComparisonRow]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for row in rows {
        w.serialize(ComparisonCsvRow {
            material: &row.material,
            property: &row.property,
            category: &row.category,
            this_work: &row.this_work,
            paper_cited_literature: &row.paper_cited_literature,
            external_baseline: &row.external_baseline,
            novelty_flag: row
                .novelty_flag
                .map(|n| n.as_str().to_string())
                .unwrap_or_default(),
            paper_citations: &row.paper_citations,
        })?;
    }
    w.flush()?;
    Ok(())
}
