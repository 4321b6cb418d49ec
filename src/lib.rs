//! # litmine
//!
//! Provenance-first extraction of measurement records from scientific PDFs,
//! aimed at polymer and electrolyte papers.
//!
//! Every extracted claim carries page/bbox provenance, an explicit origin
//! label (this work vs cited literature), unit normalization traces, and
//! constraint verdicts. Tables are reconstructed by a three-tier cascade
//! (caption-anchored text parsing, OCR or vision-model fallback, layout
//! heuristic), and a comparison table lines the paper's own measurements up
//! against cited literature and an optional external baseline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use litmine::{pipeline, Capabilities, PipelineOptions};
//!
//! fn main() -> litmine::Result<()> {
//!     // `doc` is any PdfAccess implementation wrapping a PDF library.
//!     # let doc: Box<dyn litmine::PdfAccess> = unimplemented!();
//!     let options = PipelineOptions::new("paper-2026-001")
//!         .with_baseline_path("baseline.csv");
//!     let output = pipeline::run(&*doc, Path::new("out"), &options, &Capabilities::default())?;
//!     println!("{} records, {} tables", output.records.len(), output.tables.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Design notes
//!
//! - Document access, OCR, and vision parsing are supplied capabilities
//!   behind traits ([`PdfAccess`], [`tables::OcrEngine`],
//!   [`tables::VisionClient`]); the extraction logic is backend-agnostic.
//! - Heuristic stages never abort a run: unparseable units, failed table
//!   parses, and missing capabilities degrade to partial, flagged output.
//! - Extraction is deterministic for an unchanged document and baseline.

pub mod access;
pub mod baseline;
pub mod compare;
pub mod constraints;
pub mod error;
pub mod extract;
pub mod figures;
pub mod filter;
pub mod model;
pub mod ontology;
pub mod origin;
pub mod pipeline;
pub mod tables;
pub mod units;

// Re-export commonly used types
pub use access::{BBox, EmbeddedImage, Line, PdfAccess, RawBlock, Span};
pub use baseline::{load_baseline, BaselineRecord};
pub use compare::build_comparison_table;
pub use constraints::evaluate_constraints;
pub use error::{Error, Result};
pub use figures::{FigureCaption, FigureImage, FigureManifest, FigureType};
pub use filter::TextBlock;
pub use model::{
    ComparisonRow, Constraints, NormalizationTrace, Novelty, Provenance, RangeSummary, Record,
    SourceType, Table, TableMeta, TableSource,
};
pub use origin::{classify_origin, detect_citations, Origin, OriginRationale};
pub use pipeline::{Capabilities, PipelineOptions, RunOutput};
pub use tables::{reconstruct_tables, TableFallback};
pub use units::{canonicalize_unit, parse_value_and_unit, to_si};
