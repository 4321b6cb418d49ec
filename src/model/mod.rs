//! Record and table types produced by extraction.
//!
//! Everything here is serde-serializable; the JSON payload written at the end
//! of a run is a direct serialization of these types.

mod comparison;
pub(crate) mod record;
mod table;

pub use comparison::{ComparisonRow, Novelty, RangeSummary};
pub use record::{Constraints, NormalizationTrace, Provenance, Record, SourceType};
pub use table::{OcrStats, Table, TableMeta, TableSource, VlmStats};
