//! Caption-anchored table reconstruction.
//!
//! The primary reconstruction tier. Many journal PDFs carry explicit
//! "Table N" captions in the text layer even when the grid itself is drawn or
//! rasterized. The strategy:
//!
//! 1. scan page lines for "Table N" captions;
//! 2. collect body lines until a stop marker (next Table/Figure/Scheme) or
//!    footer noise;
//! 3. reconstruct header + rows with deterministic heuristics;
//! 4. when the text-layer parse fails and a fallback is configured, rasterize
//!    the region below the caption and hand it to OCR or a vision model.
//!
//! Intentionally conservative: a failed parse yields no table.

use std::io::Cursor;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::access::{BBox, PdfAccess};
use crate::error::{Error, Result};
use crate::model::{Table, TableMeta, TableSource};
use crate::tables::ocr::{ocr_table_from_image, DEFAULT_MIN_CONF};
use crate::tables::vlm::parse_table_with_vision;
use crate::tables::FallbackOptions;
use crate::tables::TableFallback;

static CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^\s*Table\s+(\d+)\s*\.?\s*(.*)$")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static STOP_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^\s*(Figure|Scheme|Table)\s+\d+\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

// Common journal footer/header artifacts that leak into the text layer.
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"(pubs\.acs\.org|https?://doi\.org|Ind\.\s*Eng\.\s*Chem\.\s*Res\.|Industrial\s*&\s*Engineering\s*Chemistry\s*Research)")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static PAGE_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4,}$").unwrap());
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

const HEADER_STOPWORDS: [&str; 22] = [
    "sample", "samples", "electrolyte", "electrolytes", "property", "value", "unit",
    "viscosity", "conductivity", "concentration", "ref", "reference", "literature",
    "this work", "present work", "mn", "mw", "mz", "mv", "pdi", "dispersity", "trial",
];

const CAPTION_VERBS: [&str; 7] =
    ["shows", "presents", "summarizes", "lists", "reports", "depicts", "discloses"];

const CAPTION_TAILS: [&str; 6] = ["and", "or", "of", "for", "with", "in"];

/// Extract tables anchored by explicit "Table N" captions.
pub fn extract_caption_tables(
    doc: &dyn PdfAccess,
    fallback: &FallbackOptions<'_>,
) -> Result<Vec<Table>> {
    let mut tables = Vec::new();

    for page in 1..=doc.page_count() {
        let page_lines = doc.layout_lines(page)?;
        let lines: Vec<(String, BBox)> =
            page_lines.iter().map(|l| (l.text(), l.bbox)).collect();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].0.trim().to_string();
            let caps = match CAPTION_RE.captures(&line) {
                Some(c) => c,
                None => {
                    i += 1;
                    continue;
                }
            };

            // In-prose references ("Table 2 shows ...") are not captions.
            let rest = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            if !rest.is_empty() {
                let first_word = rest.split_whitespace().next().unwrap_or("").to_lowercase();
                let starts_lower = rest.chars().next().is_some_and(|c| c.is_lowercase());
                if starts_lower || CAPTION_VERBS.contains(&first_word.as_str()) {
                    i += 1;
                    continue;
                }
            }

            let table_number: Option<u32> = caps[1].parse().ok();
            let cap_bbox = lines[i].1;
            let mut caption = line;

            // Captions wrap; join a few continuation lines until something
            // that looks like a column header or the first data row.
            let mut j = i + 1;
            let mut cont = 0;
            while j < lines.len() && cont < 3 {
                let nxt = lines[j].0.trim().to_string();
                if nxt.is_empty() {
                    j += 1;
                    continue;
                }
                if STOP_RE.is_match(&nxt) {
                    break;
                }
                let tail = caption
                    .split_whitespace()
                    .next_back()
                    .unwrap_or("")
                    .to_lowercase();
                if CAPTION_TAILS.contains(&tail.as_str()) {
                    caption.push(' ');
                    caption.push_str(&nxt);
                    cont += 1;
                    j += 1;
                    continue;
                }
                if looks_like_header_or_data_start(&nxt) {
                    break;
                }
                caption.push(' ');
                caption.push_str(&nxt);
                cont += 1;
                j += 1;
            }

            // Collect body lines.
            let mut body: Vec<String> = Vec::new();
            let mut k = j;
            while k < lines.len() {
                let cur = lines[k].0.trim().to_string();
                if cur.is_empty() {
                    k += 1;
                    continue;
                }
                if STOP_RE.is_match(&cur) {
                    break;
                }
                if NOISE_RE.is_match(&cur) {
                    if !body.is_empty() {
                        break;
                    }
                    k += 1;
                    continue;
                }
                if !body.is_empty() && PAGE_NUM_RE.is_match(&cur) {
                    break;
                }
                body.push(cur);
                k += 1;
            }

            let mut parsed: Option<(Vec<String>, Vec<Vec<String>>, BBox, TableMeta)> =
                parse_table_from_lines(&body).map(|(header, rows)| {
                    let meta = TableMeta {
                        source: Some(TableSource::CaptionText),
                        ..Default::default()
                    };
                    (header, rows, BBox::default(), meta)
                });

            if parsed.is_none() && fallback.mode != TableFallback::None {
                let stop_y = find_stop_y(doc, page, &lines, cap_bbox)?;
                parsed = fallback_table_parse(
                    doc,
                    page,
                    &caption,
                    cap_bbox,
                    stop_y,
                    fallback,
                )?;
            }

            if let Some((header, rows, bbox, mut meta)) = parsed {
                if !rows.is_empty() {
                    meta.caption = Some(caption);
                    meta.table_number = table_number;
                    tables.push(Table {
                        page,
                        bbox,
                        rows,
                        column_x: vec![],
                        header: Some(header),
                        meta,
                    });
                }
            }

            i = k;
        }
    }

    Ok(tables)
}

/// Lower bound of the caption-anchored region: the next stop-marker line
/// below the caption, or near the page bottom.
fn find_stop_y(
    doc: &dyn PdfAccess,
    page: u32,
    lines: &[(String, BBox)],
    cap_bbox: BBox,
) -> Result<f32> {
    let y_start = cap_bbox.y1;
    let stop = lines
        .iter()
        .filter(|(t, b)| STOP_RE.is_match(t.trim()) && b.y0 > y_start + 10.0)
        .map(|(_, b)| b.y0)
        .fold(f32::INFINITY, f32::min);
    if stop.is_finite() {
        return Ok(stop);
    }
    let (_, page_h) = doc.page_size(page)?;
    Ok(page_h - 20.0)
}

/// OCR/VLM fallback for a caption whose body failed text-layer parsing.
fn fallback_table_parse(
    doc: &dyn PdfAccess,
    page: u32,
    caption: &str,
    cap_bbox: BBox,
    stop_y: f32,
    fb: &FallbackOptions<'_>,
) -> Result<Option<(Vec<String>, Vec<Vec<String>>, BBox, TableMeta)>> {
    let (page_w, page_h) = doc.page_size(page)?;
    let y0 = cap_bbox.y1;

    // Prefer the largest embedded image placed below the caption.
    let mut clip = BBox::new(0.0, y0, page_w, stop_y);
    let mut best_area = 0.0f32;
    for img in doc.extract_images()? {
        if img.page != page {
            continue;
        }
        let Some(b) = img.bbox else { continue };
        if b.y0 < y0 - 5.0 || b.y0 > stop_y {
            continue;
        }
        if b.area() > best_area {
            best_area = b.area();
            clip = BBox::new(
                (b.x0 - 8.0).max(0.0),
                (b.y0 - 6.0).max(0.0),
                (b.x1 + 8.0).min(page_w),
                (b.y1 + 6.0).min(page_h),
            );
        }
    }

    let rendered = match doc.render_region(page, clip, fb.dpi) {
        Ok(img) => img,
        Err(e) => {
            log::warn!("region render failed for table fallback on page {page}: {e}");
            return Ok(None);
        }
    };

    match fb.mode {
        TableFallback::Ocr => {
            let Some(engine) = fb.ocr else {
                log::warn!("OCR fallback selected but no OCR engine supplied");
                return Ok(None);
            };
            match ocr_table_from_image(engine, &rendered, DEFAULT_MIN_CONF) {
                Ok(Some((header, rows, stats))) => {
                    let header = header.unwrap_or_else(|| generic_header(&rows));
                    let meta = TableMeta {
                        source: Some(TableSource::CaptionOcr),
                        crop_bbox: Some(clip),
                        ocr: Some(stats),
                        ..Default::default()
                    };
                    Ok(Some((header, rows, clip, meta)))
                }
                Ok(None) => Ok(None),
                Err(Error::Capability(msg)) => {
                    log::warn!("OCR fallback unavailable: {msg}");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
        TableFallback::Vlm => {
            let Some(client) = fb.vlm else {
                log::warn!("VLM fallback selected but no vision client supplied");
                return Ok(None);
            };
            let mut png: Vec<u8> = Vec::new();
            rendered
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| Error::Capability(format!("png encode: {e}")))?;
            match parse_table_with_vision(client, &png, caption, fb.vlm_model) {
                Ok(Some((header, rows, stats))) => {
                    let header = header.unwrap_or_else(|| generic_header(&rows));
                    let meta = TableMeta {
                        source: Some(TableSource::CaptionVlm),
                        crop_bbox: Some(clip),
                        vlm: Some(stats),
                        ..Default::default()
                    };
                    Ok(Some((header, rows, clip, meta)))
                }
                Ok(None) => Ok(None),
                Err(Error::Capability(msg)) => {
                    log::warn!("vision fallback unavailable: {msg}");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
        TableFallback::None => Ok(None),
    }
}

fn generic_header(rows: &[Vec<String>]) -> Vec<String> {
    let n = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    (1..=n).map(|i| format!("col{i}")).collect()
}

fn looks_like_header_or_data_start(line: &str) -> bool {
    let l = line.trim();
    if l.is_empty() {
        return false;
    }
    // Column headers are short tokens (Mn, Mw, PDI) or carry units (g/mol).
    if l.contains('(') && l.contains(')') {
        return true;
    }
    if l.chars().count() <= 6 && l.chars().any(|c| c.is_alphabetic()) {
        return true;
    }
    if INT_RE.is_match(l) {
        return true;
    }
    if is_token_like_name(l) {
        // Stronger signal for a data-row label.
        if l.chars().any(|c| c.is_ascii_digit())
            || l.contains('-')
            || l.contains('−')
            || l.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
                && l.chars().any(|c| c.is_alphabetic())
        {
            return true;
        }
    }
    false
}

fn is_token_like_name(s: &str) -> bool {
    let ss = s.trim();
    let low = ss.to_lowercase();
    if HEADER_STOPWORDS.contains(&low.as_str()) {
        return false;
    }
    if ss.contains('(') || ss.contains(')') {
        return false;
    }
    if ss.chars().count() > 35 {
        return false;
    }
    if ss.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    if ss.contains('-') || ss.contains('−') {
        return true;
    }
    ss.chars().any(|c| c.is_uppercase()) && ss.chars().any(|c| c.is_alphabetic())
}

/// Heuristically reconstruct header + rows from a caption's body lines.
///
/// Lines before the first data-row label form the header (with stacked unit
/// lines merged); data rows are parsed strictly as label + fixed cell count.
fn parse_table_from_lines(lines: &[String]) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    if lines.len() < 3 {
        return None;
    }

    let first_data_idx = lines
        .iter()
        .position(|ln| is_token_like_name(ln) || INT_RE.is_match(ln.trim()))?;
    if first_data_idx == 0 {
        return None;
    }

    let header_lines: Vec<String> = lines[..first_data_idx]
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    let data_lines: Vec<String> = lines[first_data_idx..]
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if header_lines.is_empty() || data_lines.is_empty() {
        return None;
    }

    let mut header = merge_header_lines(&header_lines);

    // Ensure there is a label column.
    let joined = header.join(" ").to_lowercase();
    if !(joined.contains("sample") || joined.contains("electrolyte") || joined.contains("trial")) {
        header.insert(0, "sample".to_string());
    }

    let n_cols = header.len();
    let n_vals = n_cols - 1;

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut i = 0;
    while i < data_lines.len() {
        let label = &data_lines[i];
        if STOP_RE.is_match(label) || NOISE_RE.is_match(label) {
            break;
        }
        let mut row = vec![label.clone()];
        for _ in 0..n_vals {
            i += 1;
            if i >= data_lines.len() {
                break;
            }
            row.push(data_lines[i].clone());
        }
        if row.len() == n_cols {
            rows.push(row);
        }
        i += 1;
    }

    if rows.is_empty() {
        return None;
    }
    Some((header, rows))
}

/// Merge stacked header tokens into column labels, e.g.
/// `["Mn", "(g/mol)", "PDI"]` -> `["Mn (g/mol)", "PDI"]`.
fn merge_header_lines(header_lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ln in header_lines {
        if ln.starts_with('(') && ln.ends_with(')') && !out.is_empty() {
            let last = out.last_mut().unwrap();
            last.push(' ');
            last.push_str(ln);
            continue;
        }
        out.push(ln.trim().to_string());
    }
    out.into_iter()
        .map(|c| {
            let low = c.to_lowercase();
            if low == "sample" || low == "samples" {
                "sample".to_string()
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Line, RawBlock, Span};
    use crate::error::Result;
    use image::DynamicImage;

    fn mkline(text: &str, y: f32) -> Line {
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

    struct TextDoc(Vec<Line>);

    impl PdfAccess for TextDoc {
        fn page_count(&self) -> u32 {
            1
        }
        fn text_blocks(&self, _page: u32) -> Result<Vec<RawBlock>> {
            Ok(vec![])
        }
        fn layout_lines(&self, _page: u32) -> Result<Vec<Line>> {
            Ok(self.0.clone())
        }
        fn extract_images(&self) -> Result<Vec<crate::access::EmbeddedImage>> {
            Ok(vec![])
        }
        fn page_size(&self, _page: u32) -> Result<(f32, f32)> {
            Ok((612.0, 792.0))
        }
        fn render_region(&self, _page: u32, _bbox: BBox, _dpi: u32) -> Result<DynamicImage> {
            Ok(DynamicImage::new_rgb8(2, 2))
        }
    }

    fn no_fallback() -> FallbackOptions<'static> {
        FallbackOptions::default()
    }

    fn stacked_table_lines() -> Vec<Line> {
        let texts = [
            "Table 1. Molecular weights of the synthesized polymers.",
            "sample",
            "Mn",
            "(kg/mol)",
            "PDI",
            "PEO-1",
            "35.2",
            "1.4",
            "PEO-2",
            "52.1",
            "1.6",
            "Figure 1. DSC thermograms.",
        ];
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| mkline(t, 100.0 + 14.0 * i as f32))
            .collect()
    }

    #[test]
    fn test_caption_table_reconstructed() {
        let doc = TextDoc(stacked_table_lines());
        let tables = extract_caption_tables(&doc, &no_fallback()).unwrap();
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.meta.table_number, Some(1));
        assert_eq!(t.meta.source, Some(TableSource::CaptionText));
        assert_eq!(
            t.header.as_ref().unwrap(),
            &vec!["sample".to_string(), "Mn (kg/mol)".to_string(), "PDI".to_string()]
        );
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0], vec!["PEO-1", "35.2", "1.4"]);
    }

    #[test]
    fn test_prose_table_mention_ignored() {
        let doc = TextDoc(vec![
            mkline("Table 2 shows the conductivity trend across samples.", 100.0),
            mkline("The values increase with salt content.", 120.0),
        ]);
        let tables = extract_caption_tables(&doc, &no_fallback()).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn test_body_stops_at_next_caption() {
        let mut lines = stacked_table_lines();
        lines.push(mkline("Table 2. Another table.", 300.0));
        let doc = TextDoc(lines);
        let tables = extract_caption_tables(&doc, &no_fallback()).unwrap();
        // second caption has no parseable body
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_bare_page_number_stops_body() {
        // A bare >=4-digit line reads as a page number once the body has
        // started; the truncated body no longer parses as a table.
        let texts = [
            "Table 1. Molecular weights of the synthesized polymers.",
            "sample",
            "Mn",
            "(g/mol)",
            "PEO-1",
            "35000",
            "PEO-2",
            "52000",
        ];
        let lines: Vec<Line> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| mkline(t, 100.0 + 14.0 * i as f32))
            .collect();
        let doc = TextDoc(lines);
        let tables = extract_caption_tables(&doc, &no_fallback()).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn test_merge_header_lines() {
        let merged = merge_header_lines(&[
            "Mn".to_string(),
            "(g/mol)".to_string(),
            "Mw".to_string(),
            "(g/mol)".to_string(),
            "PDI".to_string(),
        ]);
        assert_eq!(merged, vec!["Mn (g/mol)", "Mw (g/mol)", "PDI"]);
    }

    #[test]
    fn test_token_like_names() {
        assert!(is_token_like_name("PEO-10"));
        assert!(is_token_like_name("WBPU7"));
        assert!(!is_token_like_name("sample"));
        assert!(!is_token_like_name("Mn (g/mol)"));
    }

    #[test]
    fn test_parse_needs_header_before_data() {
        let lines: Vec<String> = ["PEO-1", "35000", "1.4"].iter().map(|s| s.to_string()).collect();
        assert!(parse_table_from_lines(&lines).is_none());
    }
}
