use std::fmt;

use fdk_engine::EngineError;

/// Orchestrator-level error split.
///
/// `Invalid` carries the typed calculator errors (configuration /
/// data-integrity) so the boundary can show the offending field or fall back
/// to last-known persisted state. `Storage` is infrastructure failure; the
/// boundary owns retry/backoff policy — the engine performs no retries.
///
/// A lost optimistic-transition race is deliberately NOT an error: it is a
/// successful idempotent no-op (see [`crate::TransitionOutcome`]).
#[derive(Debug)]
pub enum EvaluatorError {
    Invalid(EngineError),
    Storage(anyhow::Error),
}

impl fmt::Display for EvaluatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatorError::Invalid(e) => write!(f, "{e}"),
            EvaluatorError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EvaluatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvaluatorError::Invalid(e) => Some(e),
            EvaluatorError::Storage(e) => Some(e.as_ref()),
        }
    }
}

impl From<EngineError> for EvaluatorError {
    fn from(e: EngineError) -> Self {
        EvaluatorError::Invalid(e)
    }
}
