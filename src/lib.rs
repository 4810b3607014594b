#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::float_cmp,
        clippy::cast_precision_loss
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal/self-documenting functions don't need
// extensive docs. Public APIs should still carry proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: casts here are bounded by real-world document dimensions
// (page sizes, row counts), where try_into() would add noise not safety.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
//
// Pattern matching: these pedantic lints often reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
//
// Style/complexity: the content-stream interpreter is one long dispatch
// by nature; splitting it would hurt readability.
#![allow(clippy::too_many_lines)]
#![allow(clippy::similar_names)]
// e.g., x0, x1, y0, y1 are intentionally similar
//
// Ergonomics trade-offs:
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::format_push_string)]
#![allow(clippy::map_unwrap_or)]

//! Financial document extraction and question-answering context assembly.
//!
//! The pipeline parses uploaded PDFs and spreadsheets, detects tables via
//! ruling-line geometry, normalizes text and cell values, and accumulates
//! everything into a session context that an [`AnswerProvider`] consumes.

/// The finqa-core crate version (matches `Cargo.toml`).
pub const FINQA_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod answer;
pub mod error;
pub mod extract;
pub mod layout;
pub mod reader;
pub mod session;
pub mod table;
pub mod text;

pub use answer::{AnswerProvider, AskOutcome, AskStats, ask, build_prompt};
pub use error::{FinqaError, Result};
pub use extract::{ExtractionResult, extract};
pub use layout::{
    DetectSettings, Orientation, PageLayout, RectShape, RulingLine, TextSpan, detect_grids,
    page_text,
};
pub use reader::{
    Document, DocumentKind, PagedDocument, PagedPage, Sheet, SheetDocument,
};
pub use session::{BatchReport, FileOutcome, FileReport, SessionContext, UploadedFile};
pub use table::{RawCell, RawGrid, RawRow, Table, UNNAMED_HEADER, build_table, dedupe_headers};
pub use text::{normalize_cell, normalize_text};
