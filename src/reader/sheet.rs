use std::io::Cursor;

use calamine::{DataType, Reader as CalamineReader, open_workbook_auto_from_rs};

use crate::error::{FinqaError, Result};
use crate::table::{RawCell, RawGrid};

/// One worksheet: its name and a raw cell grid in row-major order.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub grid: RawGrid,
}

impl Sheet {
    /// Render the sheet as flat text: a name banner followed by
    /// tab-delimited rows. Empty cells render as empty fields.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("Sheet: {}\n", self.name);
        for row in &self.grid {
            let line = row
                .iter()
                .map(|cell| cell.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\t");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// A parsed spreadsheet workbook.
#[derive(Debug, Clone)]
pub struct SheetDocument {
    sheets: Vec<Sheet>,
}

impl SheetDocument {
    /// Parse workbook bytes (XLSX or legacy XLS) into per-sheet grids.
    ///
    /// Sheets are kept in workbook order. A sheet whose range cannot be
    /// read is skipped rather than failing the whole workbook.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook =
            open_workbook_auto_from_rs(cursor).map_err(|err| FinqaError::ExtractionFailed {
                reason: format!("failed to read workbook: {err}"),
            })?;

        let sheet_names: Vec<String> = workbook.sheet_names().clone();
        let mut sheets = Vec::new();
        for sheet_name in &sheet_names {
            let Some(Ok(range)) = workbook.worksheet_range(sheet_name) else {
                tracing::debug!(sheet = %sheet_name, "skipping unreadable worksheet");
                continue;
            };

            let grid: RawGrid = range
                .rows()
                .map(|row| row.iter().map(cell_value).collect())
                .collect();
            sheets.push(Sheet {
                name: sheet_name.clone(),
                grid,
            });
        }

        Ok(Self { sheets })
    }

    /// Build a document from already-materialized sheets.
    #[must_use]
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    #[must_use]
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

/// Map a calamine cell onto a raw cell. Absent cells become `None`;
/// everything else renders as text.
fn cell_value(cell: &DataType) -> RawCell {
    match cell {
        DataType::Empty => None,
        DataType::String(s) => Some(s.clone()),
        DataType::Float(v) | DataType::DateTime(v) | DataType::Duration(v) => {
            Some(format_number(*v))
        }
        DataType::Int(v) => Some(v.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        DataType::DateTimeIso(s) | DataType::DurationIso(s) => Some(s.clone()),
        DataType::Error(e) => Some(format!("#{e:?}")),
    }
}

/// Format a float without a trailing `.0` when it holds an integer value,
/// so `1200.0` reads as `1200` in extracted tables.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
