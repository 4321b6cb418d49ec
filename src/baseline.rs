//! External baseline database loading.
//!
//! A baseline is an optional literature database the comparison table is
//! checked against. Three formats are accepted by extension: `.json` (an
//! array), `.jsonl` (one object per line), and `.csv` (columns `material`,
//! `property`, `value`, `unit`; others optional). A missing file is an empty
//! baseline, not an error.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One baseline literature value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineRecord {
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub property: String,
    #[serde(default, alias = "value")]
    pub value_min: Option<f64>,
    #[serde(default)]
    pub value_max: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub value_si_min: Option<f64>,
    #[serde(default)]
    pub value_si_max: Option<f64>,
    #[serde(default)]
    pub unit_si: Option<String>,
}

/// Load a baseline database. A nonexistent path yields an empty baseline;
/// a file that exists but cannot be parsed is an error.
pub fn load_baseline(path: &Path) -> Result<Vec<BaselineRecord>> {
    if !path.exists() {
        log::debug!("baseline path {} does not exist; using empty baseline", path.display());
        return Ok(vec![]);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut records = match ext.as_str() {
        "json" => {
            let file = fs::File::open(path)?;
            serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::Baseline(format!("{}: {e}", path.display())))?
        }
        "jsonl" => {
            let text = fs::read_to_string(path)?;
            let mut out = Vec::new();
            for (lineno, line) in text.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let rec: BaselineRecord = serde_json::from_str(line).map_err(|e| {
                    Error::Baseline(format!("{} line {}: {e}", path.display(), lineno + 1))
                })?;
                out.push(rec);
            }
            out
        }
        "csv" => {
            let mut reader = csv::Reader::from_path(path)
                .map_err(|e| Error::Baseline(format!("{}: {e}", path.display())))?;
            let mut out = Vec::new();
            for row in reader.deserialize() {
                let rec: BaselineRecord =
                    row.map_err(|e| Error::Baseline(format!("{}: {e}", path.display())))?;
                out.push(rec);
            }
            out
        }
        other => {
            log::warn!("unsupported baseline format '.{other}'; using empty baseline");
            vec![]
        }
    };

    for r in &mut records {
        if r.material.is_empty() {
            r.material = "UNKNOWN".to_string();
        }
        if r.property.is_empty() {
            r.property = "unknown".to_string();
        }
    }
    Ok(records)
}
