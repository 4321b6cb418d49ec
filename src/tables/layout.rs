//! Layout-heuristic table reconstruction.
//!
//! The second reconstruction tier: when no usable "Table N" caption exists,
//! look for runs of lines whose spans align into columns. Cells are rebuilt
//! from span x-positions alone.

use crate::access::{Line, PdfAccess};
use crate::error::Result;
use crate::model::{Table, TableMeta, TableSource};

/// Minimum consecutive table-like lines to accept a region.
const MIN_GROUP_LINES: usize = 4;

/// Column merge threshold, in PDF points.
const COLUMN_MERGE_TOL: f32 = 18.0;

/// Reconstruct tables from span layout across the whole document.
pub fn extract_layout_tables(doc: &dyn PdfAccess) -> Result<Vec<Table>> {
    let mut tables = Vec::new();
    for page in 1..=doc.page_count() {
        let lines = doc.layout_lines(page)?;

        let mut groups: Vec<Vec<&Line>> = Vec::new();
        let mut current: Vec<&Line> = Vec::new();
        for line in &lines {
            if is_table_like(&line_cells(line)) {
                current.push(line);
            } else {
                if current.len() >= MIN_GROUP_LINES {
                    groups.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
        if current.len() >= MIN_GROUP_LINES {
            groups.push(current);
        }

        for grp in groups {
            if let Some(t) = table_from_group(page, &grp) {
                tables.push(t);
            }
        }
    }
    log::debug!("layout heuristic found {} tables", tables.len());
    Ok(tables)
}

fn line_cells(line: &Line) -> Vec<(f32, String)> {
    let mut spans: Vec<_> = line.spans.iter().collect();
    spans.sort_by(|a, b| {
        a.bbox
            .x0
            .partial_cmp(&b.bbox.x0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    spans
        .into_iter()
        .filter_map(|sp| {
            let t = sp.text.trim();
            (!t.is_empty()).then(|| (sp.bbox.x0, t.to_string()))
        })
        .collect()
}

/// Multiple short-ish tokens in aligned positions.
fn is_table_like(cells: &[(f32, String)]) -> bool {
    if cells.len() < 3 {
        return false;
    }
    let mean_len =
        cells.iter().map(|(_, t)| t.chars().count()).sum::<usize>() as f32 / cells.len() as f32;
    mean_len <= 80.0
}

fn table_from_group(page: u32, grp: &[&Line]) -> Option<Table> {
    let row_cells: Vec<Vec<(f32, String)>> = grp.iter().map(|l| line_cells(l)).collect();

    let bbox = grp
        .iter()
        .map(|l| l.bbox)
        .reduce(|a, b| a.union(&b))?;

    // Cluster x-positions into global columns.
    let mut xs: Vec<f32> = row_cells
        .iter()
        .flat_map(|r| r.iter().map(|(x, _)| (x * 10.0).round() / 10.0))
        .collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    xs.dedup();
    let mut col_x: Vec<f32> = Vec::new();
    for x in xs {
        if col_x.last().map_or(true, |last| (x - last).abs() > COLUMN_MERGE_TOL) {
            col_x.push(x);
        }
    }
    if col_x.is_empty() {
        return None;
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for cells in &row_cells {
        let mut out = vec![String::new(); col_x.len()];
        for (x, txt) in cells {
            let j = nearest(&col_x, *x);
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
        rows.push(out);
    }

    let header = rows.first().cloned();
    let meta = infer_table_meta(header.as_deref(), &rows);
    Some(Table {
        page,
        bbox,
        rows,
        column_x: col_x,
        header,
        meta,
    })
}

fn nearest(col_x: &[f32], x: f32) -> usize {
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

/// Comparison-table cues from the header and early body rows.
fn infer_table_meta(header: Option<&[String]>, rows: &[Vec<String>]) -> TableMeta {
    let mut meta = TableMeta {
        source: Some(TableSource::Layout),
        ..Default::default()
    };
    let htxt = header.map(|h| h.join(" ").to_lowercase()).unwrap_or_default();
    if htxt.contains("this work") || htxt.contains("present work") {
        meta.has_this_work_column = true;
    }
    if htxt.contains("literature") || htxt.contains("ref") || htxt.contains("reference") {
        meta.has_literature_column = true;
    }
    let ref_hits = rows
        .iter()
        .take(8)
        .flat_map(|r| r.iter())
        .filter(|c| c.contains('[') && c.contains(']'))
        .count();
    if ref_hits >= 2 {
        meta.likely_contains_citations = true;
    }
    meta
}
