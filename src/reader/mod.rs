//! Document parsing: byte buffers in, structured documents out.
//!
//! Two families are supported. Paged-layout documents (PDF) carry per-page
//! text plus geometry for table detection; tabular-sheet documents
//! (XLSX/XLS) carry named sheets of raw cells.

mod paged;
mod sheet;

pub use paged::{PagedDocument, PagedPage};
pub use sheet::{Sheet, SheetDocument};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The family a document belongs to, driving which parser and extraction
/// path apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PagedLayout,
    TabularSheet,
}

impl DocumentKind {
    /// Classify by filename extension; `None` for unsupported formats.
    #[must_use]
    pub fn from_extension(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext)?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::PagedLayout),
            "xlsx" | "xls" => Some(Self::TabularSheet),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PagedLayout => "paged-layout",
            Self::TabularSheet => "tabular-sheet",
        }
    }
}

/// A parsed document, tagged by kind.
#[derive(Debug, Clone)]
pub enum Document {
    PagedLayout(PagedDocument),
    TabularSheet(SheetDocument),
}

impl Document {
    /// Parse raw bytes as the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FinqaError::ExtractionFailed`] when the bytes are
    /// not a valid document of that kind.
    pub fn parse(bytes: &[u8], kind: DocumentKind) -> Result<Self> {
        match kind {
            DocumentKind::PagedLayout => PagedDocument::parse(bytes).map(Self::PagedLayout),
            DocumentKind::TabularSheet => SheetDocument::parse(bytes).map(Self::TabularSheet),
        }
    }

    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::PagedLayout(_) => DocumentKind::PagedLayout,
            Self::TabularSheet(_) => DocumentKind::TabularSheet,
        }
    }
}
