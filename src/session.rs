//! Session-scoped context assembly: extracted documents accumulate into
//! one merged text-plus-tables context that can be serialized for an
//! answering provider.

use std::path::Path;

use serde::Serialize;

use crate::error::{FinqaError, Result};
use crate::extract::{ExtractionResult, extract};
use crate::layout::DetectSettings;
use crate::reader::{Document, DocumentKind};
use crate::table::Table;

/// The accumulated context for one question-answering session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    text: String,
    tables: Vec<Table>,
    documents: usize,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one document's extraction, prefixed with a source marker so
    /// the provider can attribute passages to files.
    pub fn append(&mut self, filename: &str, result: ExtractionResult) {
        self.text
            .push_str(&format!("\n\n--- Content from {filename} ---\n\n"));
        self.text.push_str(&result.text);
        self.tables.extend(result.tables);
        self.documents += 1;
        tracing::debug!(
            file = %filename,
            total_documents = self.documents,
            total_tables = self.tables.len(),
            "appended document to session"
        );
    }

    /// Render the full context: accumulated text, then each table in
    /// accumulation order as a delimited block.
    ///
    /// # Errors
    ///
    /// Returns [`FinqaError::EmptyContext`] when no document has been
    /// appended since construction or the last [`reset`](Self::reset).
    pub fn serialize(&self) -> Result<String> {
        if self.documents == 0 {
            return Err(FinqaError::EmptyContext);
        }
        let mut out = self.text.clone();
        for table in &self.tables {
            out.push('\n');
            out.push_str(&table.to_delimited());
        }
        Ok(out)
    }

    /// Drop all accumulated state, returning to the freshly-constructed
    /// empty session.
    pub fn reset(&mut self) {
        self.text.clear();
        self.tables.clear();
        self.documents = 0;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Extract a batch of uploaded files into the session.
    ///
    /// Files are processed in upload order. Unsupported and failed files
    /// are recorded in the report and never touch the session; each
    /// successful file is appended only after its own extraction fully
    /// succeeded, so a failure midway leaves earlier appends intact.
    pub fn process_batch(
        &mut self,
        files: &[UploadedFile],
        settings: &DetectSettings,
    ) -> BatchReport {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let outcome = match file.kind {
                None => {
                    tracing::warn!(file = %file.name, "skipping unsupported document format");
                    FileOutcome::Skipped {
                        reason: FinqaError::UnsupportedFormat {
                            label: file.name.clone(),
                        }
                        .to_string(),
                    }
                }
                Some(kind) => match Document::parse(&file.bytes, kind) {
                    Err(err) => {
                        tracing::warn!(file = %file.name, error = %err, "document extraction failed");
                        FileOutcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                    Ok(document) => {
                        let result = extract(&document, settings);
                        let tables = result.tables.len();
                        let chars = result.text.chars().count();
                        self.append(&file.name, result);
                        FileOutcome::Extracted { tables, chars }
                    }
                },
            };
            outcomes.push(FileReport {
                file: file.name.clone(),
                outcome,
            });
        }
        BatchReport { files: outcomes }
    }
}

/// An uploaded file: its name (used for kind classification and the
/// context marker) and raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub kind: Option<DocumentKind>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = DocumentKind::from_extension(&name);
        Self { name, kind, bytes }
    }

    /// Read a file from disk, classifying by its filename.
    ///
    /// # Errors
    ///
    /// Returns [`FinqaError::ExtractionFailed`] when the file cannot be
    /// read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|err| FinqaError::ExtractionFailed {
            reason: format!("failed to read {}: {err}", path.display()),
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }
}

/// Per-file result of a batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Extracted { tables: usize, chars: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub outcome: FileOutcome,
}

/// Summary of one [`SessionContext::process_batch`] run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    #[must_use]
    pub fn extracted_count(&self) -> usize {
        self.files
            .iter()
            .filter(|report| matches!(report.outcome, FileOutcome::Extracted { .. }))
            .count()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.files
            .iter()
            .any(|report| matches!(report.outcome, FileOutcome::Failed { .. }))
    }
}
