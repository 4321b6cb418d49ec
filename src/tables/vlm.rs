//! Vision-model fallback for image-based tables.
//!
//! OCR struggles with merged cells, multi-line headers, and super/subscript
//! typography. A vision-capable model can recover those, at the cost of an
//! external call. The client is a supplied capability; this module owns the
//! prompt and the strict-JSON post-validation.

use serde::Deserialize;

use crate::error::Result;
use crate::model::VlmStats;

/// A vision-model client capability. The implementation handles transport and
/// authentication; it receives an encoded PNG plus the prompts.
pub trait VisionClient {
    /// Ask the model to read a table image. Returns the raw model text.
    fn complete(&self, png: &[u8], system: &str, user: &str, model: &str) -> Result<String>;
}

const SYSTEM_PROMPT: &str = "You are a scientific table extraction assistant. \
Return ONLY valid JSON; no commentary. \
Preserve minus signs, Greek letters, and units exactly as seen. \
If a header is not explicit, invent short column names (col1, col2, ...).";

#[derive(Deserialize)]
struct VlmTable {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

/// Parse a table image with a vision model.
///
/// The model is asked for a strict JSON object `{"header": [...], "rows":
/// [[...], ...]}`. Malformed model output yields `Ok(None)` so the caller can
/// degrade; transport failures surface as `Err`.
pub fn parse_table_with_vision(
    client: &dyn VisionClient,
    png: &[u8],
    caption: &str,
    model: &str,
) -> Result<Option<(Option<Vec<String>>, Vec<Vec<String>>, VlmStats)>> {
    let user = format!(
        "Extract the table into a JSON object with keys 'header' and 'rows'. \
         Header must be a list of strings. Rows must be a list of equal-length lists. \
         Do not merge distinct columns.\n\nCaption (if any): {}",
        caption.trim()
    );

    let raw = client.complete(png, SYSTEM_PROMPT, &user, model)?;
    let raw = raw.trim();

    let parsed: VlmTable = match serde_json::from_str(raw) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("vision model returned unparseable JSON ({e})");
            return Ok(None);
        }
    };

    if parsed.rows.is_empty() {
        return Ok(None);
    }

    let stats = VlmStats {
        model: model.to_string(),
        raw_len: raw.len(),
    };
    Ok(Some((parsed.header, parsed.rows, stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl VisionClient for Canned {
        fn complete(&self, _png: &[u8], _system: &str, _user: &str, _model: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_valid_json_parsed() {
        let client =
            Canned(r#"{"header": ["sample", "Tg (°C)"], "rows": [["PEO-1", "−40"], ["PEO-2", "−38"]]}"#);
        let (header, rows, stats) = parse_table_with_vision(&client, &[], "Table 1.", "test-model")
            .unwrap()
            .unwrap();
        assert_eq!(header.unwrap()[1], "Tg (°C)");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "−40");
        assert_eq!(stats.model, "test-model");
    }

    #[test]
    fn test_missing_header_allowed() {
        let client = Canned(r#"{"header": null, "rows": [["a", "1"], ["b", "2"]]}"#);
        let (header, rows, _) = parse_table_with_vision(&client, &[], "", "m")
            .unwrap()
            .unwrap();
        assert!(header.is_none());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_commentary_rejected() {
        let client = Canned("Sure! Here is the table:\n{\"header\": [], \"rows\": []}");
        assert!(parse_table_with_vision(&client, &[], "", "m").unwrap().is_none());
    }

    #[test]
    fn test_empty_rows_rejected() {
        let client = Canned(r#"{"header": ["a"], "rows": []}"#);
        assert!(parse_table_with_vision(&client, &[], "", "m").unwrap().is_none());
    }
}
