//! Error types for psp-core

use thiserror::Error;

use crate::types::ParameterVector;

/// A configuration value that violates the run contract.
///
/// Always raised before the first oracle call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A vector option has the wrong number of entries
    #[error("{field} has length {actual}, expected {expected}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A parameter box is inverted
    #[error("lower[{index}] = {lower} exceeds upper[{index}] = {upper}")]
    InvertedBounds { index: usize, lower: f64, upper: f64 },

    /// Neither stopping criterion is finite
    #[error("a finite threshold must be set for either iterations or population")]
    Unbounded,

    /// A numeric option is outside its allowed range
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The run file could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Failure of the model or discretizer contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// The model callback could not be reached
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model returned a continuous response but no discretizer is configured
    #[error("model returned a continuous response but no discretizer is configured")]
    MissingDiscretizer,

    /// The continuous response has the wrong length
    #[error("response has length {actual}, expected {expected} responses")]
    ResponseLength { expected: usize, actual: usize },

    /// The pattern is not dimensionality × dimensionality
    #[error("pattern has shape {rows}x{cols}, expected {expected}x{expected}")]
    PatternShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    /// The response contains NaN or infinite values
    #[error("response contains non-finite values")]
    NonFinite,

    /// The callback itself reported a failure
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Error type for exploration runs
#[derive(Debug, Error)]
pub enum PspError {
    /// Rejected configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Oracle failure while evaluating a specific candidate
    #[error("Oracle error at iteration {iteration}, candidate {candidate} {point:?}: {source}")]
    Oracle {
        iteration: u32,
        candidate: usize,
        point: Vec<f64>,
        #[source]
        source: OracleError,
    },

    /// IO operation failed (recorder streams)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An earlier error already aborted this run
    #[error("Exploration aborted by an earlier error")]
    Aborted,
}

impl PspError {
    /// Attach the iteration and candidate position to an oracle failure.
    pub fn oracle(
        iteration: u32,
        candidate: usize,
        point: &ParameterVector,
        source: OracleError,
    ) -> Self {
        Self::Oracle {
            iteration,
            candidate,
            point: point.to_vec(),
            source,
        }
    }
}

/// Result type alias for psp operations
pub type Result<T> = std::result::Result<T, PspError>;
