//! Crate-wide error type and result alias.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FinqaError>;

#[derive(Debug, Error)]
pub enum FinqaError {
    /// The document byte stream could not be read or decoded. Extraction of
    /// this document fails as a whole; other documents in the same batch are
    /// unaffected.
    #[error("document extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    /// The document kind is outside the supported set (paged layout,
    /// tabular sheet). The document is skipped, not fatal for a batch.
    #[error("unsupported document format: {label}")]
    UnsupportedFormat { label: String },

    /// `SessionContext::serialize` was called before any document was
    /// appended (or after a reset with nothing appended since).
    #[error("session context is empty; append at least one document before serializing")]
    EmptyContext,

    /// The external answering capability reported a failure. Surfaced to the
    /// caller verbatim; never retried here.
    #[error("answer synthesis failed: {reason}")]
    AnswerFailed { reason: String },
}
