use std::fmt;

/// Errors the pure calculators may return.
///
/// These are returned as values up through the orchestrator; the boundary
/// layer decides user-visible behavior. The calculators never panic on bad
/// input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A phase configuration value is invalid (negative percent, zero
    /// account size, inverted payout bounds). Names the offending field.
    Configuration {
        field: &'static str,
        message: String,
    },
    /// Trade data cannot be evaluated as-is (missing timestamps, unordered
    /// input). The caller must fix the data, not retry.
    DataIntegrity(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Configuration { field, message } => {
                write!(f, "invalid phase config: {field}: {message}")
            }
            EngineError::DataIntegrity(msg) => write!(f, "data integrity error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
