//! Answering seam: the session context is handed to an external provider
//! that synthesizes an answer. The provider itself (HTTP client, local
//! model, test stub) lives outside this crate.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{FinqaError, Result};
use crate::session::SessionContext;

/// An answer synthesizer over an assembled document context.
pub trait AnswerProvider {
    /// Produce an answer to `question` grounded in `context`.
    ///
    /// # Errors
    ///
    /// Implementations return their own failure as an error; `ask` wraps
    /// it in [`FinqaError::AnswerFailed`] without retrying.
    fn answer(&self, context: &str, question: &str) -> Result<String>;
}

/// Render the prompt sent to the provider: context first, then the
/// question, then the answering instruction.
#[must_use]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Context from financial documents:\n{context}\n\nUser question: {question}\n\nAnswer based on the context:"
    )
}

/// Timings for one `ask` invocation, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskStats {
    /// Time spent serializing the session context.
    pub serialize_ms: u128,
    /// Time spent inside the provider.
    pub synthesis_ms: u128,
    /// End-to-end latency.
    pub latency_ms: u128,
}

/// The provider's answer plus timing stats.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub answer: String,
    pub context_chars: usize,
    pub stats: AskStats,
}

/// Serialize the session and ask the provider one question.
///
/// # Errors
///
/// Returns [`FinqaError::EmptyContext`] when the session holds no
/// documents, and [`FinqaError::AnswerFailed`] when the provider errors.
pub fn ask(
    session: &SessionContext,
    provider: &dyn AnswerProvider,
    question: &str,
) -> Result<AskOutcome> {
    let start = Instant::now();
    let context = session.serialize()?;
    let serialize_ms = start.elapsed().as_millis();

    let synthesis_start = Instant::now();
    let answer = provider.answer(&context, question).map_err(|err| match err {
        FinqaError::AnswerFailed { .. } => err,
        other => FinqaError::AnswerFailed {
            reason: other.to_string(),
        },
    })?;
    let synthesis_ms = synthesis_start.elapsed().as_millis();

    let stats = AskStats {
        serialize_ms,
        synthesis_ms,
        latency_ms: start.elapsed().as_millis(),
    };
    tracing::debug!(
        context_chars = context.chars().count(),
        latency_ms = stats.latency_ms,
        "answer synthesized"
    );

    Ok(AskOutcome {
        answer,
        context_chars: context.chars().count(),
        stats,
    })
}
