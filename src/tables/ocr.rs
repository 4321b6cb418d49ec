//! OCR fallback for image-based tables.
//!
//! Caption-anchored parsing works when the table lives in the PDF text layer.
//! Scanned or rasterized tables need OCR: the engine returns words with
//! bounding boxes, and this module reconstructs a row/column grid from the
//! geometry alone. No table-structure model is involved; every tolerance is
//! derived from the median glyph size and reported in the diagnostics.

use image::DynamicImage;

use crate::error::Result;
use crate::model::OcrStats;

/// Default word confidence cutoff.
pub const DEFAULT_MIN_CONF: f32 = 35.0;

/// One OCR word with its pixel bounding box.
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// Engine confidence in [0, 100].
    pub conf: f32,
}

impl OcrWord {
    fn x0(&self) -> f32 {
        self.left as f32
    }

    fn x1(&self) -> f32 {
        (self.left + self.width) as f32
    }

    fn y_center(&self) -> f32 {
        self.top as f32 + 0.5 * self.height as f32
    }
}

/// An OCR engine capability. Implementations wrap an external engine such as
/// Tesseract; tests supply synthetic word lists.
pub trait OcrEngine {
    /// Recognize words with bounding boxes in a rendered region.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrWord>>;
}

/// OCR an image region and reconstruct a `(header, rows)` grid.
///
/// Returns `Ok(None)` when OCR output is too sparse or unstructured to form a
/// table; hard engine failures surface as `Err`.
pub fn ocr_table_from_image(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    min_conf: f32,
) -> Result<Option<(Option<Vec<String>>, Vec<Vec<String>>, OcrStats)>> {
    let words: Vec<OcrWord> = engine
        .recognize(image)?
        .into_iter()
        .filter(|w| !w.text.trim().is_empty() && w.conf >= min_conf)
        .collect();

    if words.is_empty() {
        log::debug!("ocr: no words above confidence {min_conf}");
        return Ok(None);
    }

    Ok(grid_from_words(&words))
}

/// Reconstruct a grid from positioned words.
///
/// Tolerances scale with the median glyph size:
/// - rows: words whose y-centers differ by at most max(6, 0.7·median height)
/// - cells: split a row at x-gaps above max(18, 1.8·median width)
/// - columns: cluster cell x-origins with max(20, 2.2·median width)
pub fn grid_from_words(words: &[OcrWord]) -> Option<(Option<Vec<String>>, Vec<Vec<String>>, OcrStats)> {
    let med_h = median(words.iter().map(|w| w.height as f32)).unwrap_or(10.0);
    let med_w = median(words.iter().map(|w| w.width as f32)).unwrap_or(10.0);

    let row_tol = (0.7 * med_h).max(6.0);
    let gap_tol = (1.8 * med_w).max(18.0);
    let col_tol = (2.2 * med_w).max(20.0);

    // Group words into rows by y-center proximity, tracking a running mean.
    let mut sorted: Vec<&OcrWord> = words.iter().collect();
    sorted.sort_by(|a, b| {
        (a.y_center(), a.x0())
            .partial_cmp(&(b.y_center(), b.x0()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut row_groups: Vec<Vec<&OcrWord>> = Vec::new();
    let mut cur: Vec<&OcrWord> = Vec::new();
    let mut cur_y = 0.0f32;
    for w in sorted {
        if cur.is_empty() {
            cur_y = w.y_center();
            cur.push(w);
        } else if (w.y_center() - cur_y).abs() <= row_tol {
            cur.push(w);
            cur_y = (cur_y * (cur.len() - 1) as f32 + w.y_center()) / cur.len() as f32;
        } else {
            row_groups.push(std::mem::take(&mut cur));
            cur_y = w.y_center();
            cur.push(w);
        }
    }
    if !cur.is_empty() {
        row_groups.push(cur);
    }

    // Split each row into cells at large x-gaps.
    let mut rows_cells: Vec<Vec<(f32, String)>> = Vec::new();
    for rg in &row_groups {
        let mut rg: Vec<&OcrWord> = rg.clone();
        rg.sort_by(|a, b| a.x0().partial_cmp(&b.x0()).unwrap_or(std::cmp::Ordering::Equal));

        let mut cells: Vec<(f32, String)> = Vec::new();
        let mut buf: Vec<&OcrWord> = vec![rg[0]];
        for w in &rg[1..] {
            let prev = buf.last().unwrap();
            if w.x0() - prev.x1() > gap_tol {
                push_cell(&mut cells, &buf);
                buf = vec![w];
            } else {
                buf.push(w);
            }
        }
        push_cell(&mut cells, &buf);

        // Single-cell lines are almost never table rows.
        if cells.len() >= 2 {
            rows_cells.push(cells);
        }
    }

    if rows_cells.len() < 2 {
        log::debug!("ocr: too few structured rows ({})", rows_cells.len());
        return None;
    }

    // Cluster cell x-origins into global columns.
    let mut xs: Vec<f32> = rows_cells
        .iter()
        .flat_map(|r| r.iter().map(|(x, _)| (x * 10.0).round() / 10.0))
        .collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    xs.dedup();
    let mut col_x: Vec<f32> = Vec::new();
    for x in xs {
        if col_x.last().map_or(true, |last| (x - last).abs() > col_tol) {
            col_x.push(x);
        }
    }

    // Align rows to columns.
    let mut grid: Vec<Vec<String>> = Vec::new();
    for row in &rows_cells {
        let mut out = vec![String::new(); col_x.len()];
        for (x, txt) in row {
            let j = nearest_column(&col_x, *x);
            if out[j].is_empty() {
                out[j] = txt.clone();
            } else {
                out[j].push(' ');
                out[j].push_str(txt);
            }
        }
        while out.last().is_some_and(|c| c.is_empty()) {
            out.pop();
        }
        if !out.is_empty() {
            grid.push(out);
        }
    }

    if grid.len() < 2 {
        log::debug!("ocr: grid alignment failed");
        return None;
    }

    // Header detection: a first row dominated by alphabetic cells followed by
    // a row at least as numeric.
    let (a0, d0) = row_stats(&grid[0]);
    let (_, d1) = row_stats(&grid[1]);
    let (header, data_rows) = if a0 >= 2 && d0 <= a0.max(1) && d1 >= d0 {
        (Some(grid[0].clone()), grid[1..].to_vec())
    } else {
        (None, grid.clone())
    };

    let stats = OcrStats {
        words: words.len(),
        row_groups: row_groups.len(),
        grid_rows: grid.len(),
        grid_cols: col_x.len(),
        column_x: col_x,
        row_tol,
        gap_tol,
        col_tol,
        conf_mean: words.iter().map(|w| w.conf).sum::<f32>() / words.len() as f32,
    };

    Some((header, data_rows, stats))
}

fn push_cell(cells: &mut Vec<(f32, String)>, buf: &[&OcrWord]) {
    let text = buf
        .iter()
        .map(|w| w.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !text.is_empty() {
        let x0 = buf
            .iter()
            .map(|w| w.x0())
            .fold(f32::INFINITY, f32::min);
        cells.push((x0, text));
    }
}

fn nearest_column(col_x: &[f32], x: f32) -> usize {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (j, cx) in col_x.iter().enumerate() {
        let d = (x - cx).abs();
        if d < best_d {
            best_d = d;
            best = j;
        }
    }
    best
}

fn row_stats(row: &[String]) -> (usize, usize) {
    let alpha = row
        .iter()
        .filter(|c| c.chars().any(|ch| ch.is_alphabetic()))
        .count();
    let digit = row
        .iter()
        .filter(|c| c.chars().any(|ch| ch.is_ascii_digit()))
        .count();
    (alpha, digit)
}

fn median(vals: impl Iterator<Item = f32>) -> Option<f32> {
    let mut v: Vec<f32> = vals.collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = v.len();
    if n % 2 == 1 {
        Some(v[n / 2])
    } else {
        Some((v[n / 2 - 1] + v[n / 2]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: i32, top: i32, width: i32) -> OcrWord {
        OcrWord {
            text: text.into(),
            left,
            top,
            width,
            height: 12,
            conf: 90.0,
        }
    }

    fn sample_words() -> Vec<OcrWord> {
        vec![
            // header row
            word("sample", 10, 10, 50),
            word("Tg", 200, 11, 20),
            word("Mn", 400, 10, 25),
            // data row 1
            word("PEO-1", 10, 40, 45),
            word("210", 200, 41, 30),
            word("35000", 400, 40, 45),
            // data row 2
            word("PEO-2", 10, 70, 45),
            word("195", 200, 70, 30),
            word("52000", 400, 71, 45),
        ]
    }

    #[test]
    fn test_grid_reconstruction() {
        let (header, rows, stats) = grid_from_words(&sample_words()).unwrap();
        let header = header.unwrap();
        assert_eq!(header, vec!["sample", "Tg", "Mn"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["PEO-1", "210", "35000"]);
        assert_eq!(stats.grid_cols, 3);
        assert_eq!(stats.grid_rows, 3);
    }

    #[test]
    fn test_multiword_cell_joined() {
        let mut words = sample_words();
        // "this work" split into two adjacent words in the last column
        words.push(word("this", 400, 100, 30));
        words.push(word("work", 435, 100, 32));
        words.push(word("PEO-3", 10, 100, 45));
        let (_, rows, _) = grid_from_words(&words).unwrap();
        let last = rows.last().unwrap();
        assert!(last.contains(&"this work".to_string()));
    }

    #[test]
    fn test_sparse_words_rejected() {
        let words = vec![word("lonely", 10, 10, 40)];
        assert!(grid_from_words(&words).is_none());
    }

    #[test]
    fn test_numeric_first_row_means_no_header() {
        let words = vec![
            word("1.2", 10, 10, 30),
            word("3.4", 200, 10, 30),
            word("5.6", 10, 40, 30),
            word("7.8", 200, 40, 30),
        ];
        let (header, rows, _) = grid_from_words(&words).unwrap();
        assert!(header.is_none());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_low_confidence_words_dropped() {
        struct Fixed(Vec<OcrWord>);
        impl OcrEngine for Fixed {
            fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrWord>> {
                Ok(self.0.clone())
            }
        }
        let mut words = sample_words();
        for w in &mut words {
            w.conf = 10.0;
        }
        let engine = Fixed(words);
        let img = DynamicImage::new_rgb8(4, 4);
        let out = ocr_table_from_image(&engine, &img, DEFAULT_MIN_CONF).unwrap();
        assert!(out.is_none());
    }
}
