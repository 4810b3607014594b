//! Raw grid cleanup: header deduplication and table construction.
//!
//! A raw grid is what geometric detection (or a spreadsheet range) hands
//! over: rows of optional strings, untrimmed, with empty rows and columns
//! still present. [`build_table`] turns one of those into a [`Table`] with
//! unique non-empty headers and no fully-empty row or column.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::text::normalize_cell;

/// An absent cell is distinct from an empty string on the way in; both
/// normalize to an empty value downstream.
pub type RawCell = Option<String>;
pub type RawRow = Vec<RawCell>;
pub type RawGrid = Vec<RawRow>;

/// Placeholder label for a header cell that is empty after trimming.
pub const UNNAMED_HEADER: &str = "Unnamed";

/// Delimiter used when a table is rendered into the serialized context.
const CONTEXT_DELIMITER: char = ',';

/// A cleaned table: unique, non-empty column identifiers plus data rows
/// aligned to them. Every cell has passed the normalizer exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Look up a cell by row index and column identifier.
    #[must_use]
    pub fn value(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Render as delimited rows: header line first, then one line per data
    /// row. This is the flat form embedded in the serialized session
    /// context.
    #[must_use]
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        push_delimited_row(&mut out, &self.headers);
        for row in &self.rows {
            push_delimited_row(&mut out, row);
        }
        out
    }

    /// Render in the ` | `-separated display form used for sheet flat text.
    #[must_use]
    pub fn to_display(&self) -> String {
        let mut out = self.headers.join(" | ");
        for row in &self.rows {
            out.push('\n');
            out.push_str(&row.join(" | "));
        }
        out
    }
}

fn push_delimited_row(out: &mut String, cells: &[String]) {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            out.push(CONTEXT_DELIMITER);
        }
        if cell.contains(CONTEXT_DELIMITER) || cell.contains('\n') || cell.contains('"') {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

/// Produce unique, non-empty column identifiers from a raw header row.
///
/// Each header is trimmed; an empty result becomes [`UNNAMED_HEADER`]. The
/// first occurrence of a label is emitted unchanged, the n-th repeat gets a
/// `_{n}` suffix starting at `_1`. Output length always equals input
/// length.
///
/// Known limitation: an incoming header that already looks like `label_1`
/// can collide with a generated suffix; no second-level check is made.
#[must_use]
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::with_capacity(headers.len());

    for header in headers {
        let mut label = header.trim().to_string();
        if label.is_empty() {
            label = UNNAMED_HEADER.to_string();
        }
        match counts.get_mut(&label) {
            Some(count) => {
                *count += 1;
                unique.push(format!("{label}_{count}"));
            }
            None => {
                counts.insert(label.clone(), 0);
                unique.push(label);
            }
        }
    }

    unique
}

/// Build a [`Table`] from a raw grid.
///
/// Cells are normalized and trimmed, all-empty rows dropped. The first
/// surviving row becomes the header row (deduplicated); the rest are data
/// rows aligned to the header count — short rows are padded with empty
/// cells, long rows truncated (best-effort alignment, not a failure).
/// Columns empty in every data row are removed, then row emptiness is
/// re-checked against the surviving columns.
///
/// Returns `None` when no rows survive the initial filter.
#[must_use]
pub fn build_table(grid: RawGrid) -> Option<Table> {
    let mut rows: Vec<Vec<String>> = grid
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| normalize_cell(cell.as_deref().unwrap_or("")))
                .collect::<Vec<String>>()
        })
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    if rows.is_empty() {
        return None;
    }

    let headers = dedupe_headers(&rows.remove(0));
    let width = headers.len();
    for row in &mut rows {
        row.resize(width, String::new());
    }

    // A header-only grid keeps its headers; the pruning passes below only
    // make sense once there is at least one data row.
    if rows.is_empty() {
        return Some(Table {
            headers,
            rows: Vec::new(),
        });
    }

    let keep: Vec<bool> = (0..width)
        .map(|col| rows.iter().any(|row| !row[col].is_empty()))
        .collect();
    let headers: Vec<String> = headers
        .into_iter()
        .zip(&keep)
        .filter_map(|(header, &kept)| kept.then_some(header))
        .collect();
    if headers.is_empty() {
        return None;
    }

    // Row emptiness is recomputed against the surviving columns, not the
    // original width.
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter_map(|(cell, &kept)| kept.then_some(cell))
                .collect::<Vec<String>>()
        })
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    Some(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> RawGrid {
        rows.iter()
            .map(|row| row.iter().map(|cell| Some((*cell).to_string())).collect())
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn dedupe_policy_exact() {
        let headers = strings(&["Revenue", "Revenue", "", ""]);
        assert_eq!(
            dedupe_headers(&headers),
            strings(&["Revenue", "Revenue_1", "Unnamed", "Unnamed_1"])
        );
    }

    #[test]
    fn dedupe_trims_before_counting() {
        let headers = strings(&[" Net ", "Net", "  "]);
        assert_eq!(dedupe_headers(&headers), strings(&["Net", "Net_1", "Unnamed"]));
    }

    #[test]
    fn dedupe_preserves_length() {
        let headers = strings(&["a", "a", "a", "a"]);
        let unique = dedupe_headers(&headers);
        assert_eq!(unique.len(), headers.len());
        assert_eq!(unique, strings(&["a", "a_1", "a_2", "a_3"]));
    }

    #[test]
    fn all_empty_grid_builds_nothing() {
        let empty: RawGrid = vec![
            vec![None, Some(String::new()), Some("   ".to_string())],
            vec![None, None, None],
        ];
        assert!(build_table(empty).is_none());
        assert!(build_table(RawGrid::new()).is_none());
    }

    #[test]
    fn builds_and_normalizes_cells() {
        let table = build_table(grid(&[
            &["Item", "Amount"],
            &[" Fees ", "\u{FFFD}100!"],
        ]))
        .expect("table");
        assert_eq!(table.headers(), strings(&["Item", "Amount"]).as_slice());
        assert_eq!(table.rows(), &[strings(&["Fees", "$100"])]);
        assert_eq!(table.value(0, "Amount"), Some("$100"));
    }

    #[test]
    fn short_rows_pad_and_long_rows_truncate() {
        let table = build_table(grid(&[
            &["A", "B", "C"],
            &["1", "2"],
            &["4", "5", "6", "7"],
        ]))
        .expect("table");
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows()[0], strings(&["1", "2", ""]));
        assert_eq!(table.rows()[1], strings(&["4", "5", "6"]));
    }

    #[test]
    fn drops_empty_columns_from_data_rows() {
        let table = build_table(grid(&[
            &["Name", "Notes", "Total"],
            &["Alice", "", "10"],
            &["Bob", "", "20"],
        ]))
        .expect("table");
        assert_eq!(table.headers(), strings(&["Name", "Total"]).as_slice());
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1], strings(&["Bob", "20"]));
    }

    #[test]
    fn row_emptiness_rechecked_after_alignment() {
        // The second data row only had content beyond the header width;
        // after truncation it is empty and must not be retained.
        let table = build_table(grid(&[
            &["A", "B"],
            &["1", "2"],
            &["", "", "overflow"],
        ]))
        .expect("table");
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows()[0], strings(&["1", "2"]));
    }

    #[test]
    fn no_empty_columns_or_rows_survive() {
        let table = build_table(grid(&[
            &["A", "", "C"],
            &["1", "", "3"],
            &["", "", ""],
            &["7", "", "9"],
        ]))
        .expect("table");
        for col in 0..table.column_count() {
            assert!(table.rows().iter().any(|row| !row[col].is_empty()));
        }
        for row in table.rows() {
            assert!(row.iter().any(|cell| !cell.is_empty()));
        }
    }

    #[test]
    fn header_only_grid_keeps_headers() {
        let table = build_table(grid(&[&["A", "B"]])).expect("table");
        assert_eq!(table.headers(), strings(&["A", "B"]).as_slice());
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn blank_and_duplicate_headers_resolve_unique() {
        let table = build_table(grid(&[
            &["Revenue", ""],
            &["100", "200"],
        ]))
        .expect("table");
        assert_eq!(table.headers(), strings(&["Revenue", "Unnamed"]).as_slice());
        let unique: std::collections::HashSet<&String> = table.headers().iter().collect();
        assert_eq!(unique.len(), 2);
        assert!(table.headers().iter().all(|h| !h.is_empty()));
    }

    #[test]
    fn delimited_rendering_escapes_embedded_delimiters() {
        let table = build_table(grid(&[
            &["Item", "Amount"],
            &["Fees, net", "100"],
        ]))
        .expect("table");
        assert_eq!(table.to_delimited(), "Item,Amount\n\"Fees, net\",100\n");
    }

    #[test]
    fn display_rendering_uses_pipes() {
        let table = build_table(grid(&[
            &["Name", "Score"],
            &["Alice", "95"],
        ]))
        .expect("table");
        assert_eq!(table.to_display(), "Name | Score\nAlice | 95");
    }
}
