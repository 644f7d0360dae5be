//! Model and discretizer capabilities
//!
//! The model is an opaque oracle injected at construction. It returns either a
//! continuous response vector, which a [`Discretizer`] turns into a pattern, or
//! a pattern directly. [`Evaluator`] composes the two and enforces the shape
//! contract (`responses` long, `dimensionality` square).

use ndarray::Array1;

use crate::error::OracleError;
use crate::types::{ParameterVector, Pattern, ordinal_pattern};

/// What the model returns for one parameter vector
#[derive(Debug, Clone)]
pub enum Response {
    /// Continuous predictions, discretized afterwards
    Continuous(Array1<f64>),
    /// An already discretized pattern
    Pattern(Pattern),
}

/// The model under study
pub trait ModelOracle {
    /// Evaluate the model at `point`. Called synchronously, once per candidate.
    fn evaluate(&mut self, point: &ParameterVector) -> Result<Response, OracleError>;
}

impl<F> ModelOracle for F
where
    F: FnMut(&ParameterVector) -> Result<Response, OracleError>,
{
    fn evaluate(&mut self, point: &ParameterVector) -> Result<Response, OracleError> {
        self(point)
    }
}

/// Turns a continuous response into an ordinal pattern
pub trait Discretizer {
    fn discretize(&mut self, response: &Array1<f64>) -> Result<Pattern, OracleError>;
}

impl<F> Discretizer for F
where
    F: FnMut(&Array1<f64>) -> Result<Pattern, OracleError>,
{
    fn discretize(&mut self, response: &Array1<f64>) -> Result<Pattern, OracleError> {
        self(response)
    }
}

/// Pin a closure's signature to the model contract.
///
/// Lets the compiler infer argument and error types for inline closures.
pub fn model_fn<F>(f: F) -> F
where
    F: FnMut(&ParameterVector) -> Result<Response, OracleError>,
{
    f
}

/// Pin a closure's signature to the discretizer contract.
pub fn discretizer_fn<F>(f: F) -> F
where
    F: FnMut(&Array1<f64>) -> Result<Pattern, OracleError>,
{
    f
}

/// Pairwise-sign discretizer, see [`ordinal_pattern`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalDiscretizer;

impl Discretizer for OrdinalDiscretizer {
    fn discretize(&mut self, response: &Array1<f64>) -> Result<Pattern, OracleError> {
        Ok(ordinal_pattern(response))
    }
}

/// A fully evaluated candidate
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// The continuous response, if the model produced one
    pub response: Option<Array1<f64>>,
    pub pattern: Pattern,
}

/// Model plus optional discretizer, with shape checks
pub struct Evaluator {
    model: Box<dyn ModelOracle + Send>,
    discretizer: Option<Box<dyn Discretizer + Send>>,
    responses: usize,
    dimensionality: usize,
}

impl Evaluator {
    pub fn new(
        model: impl ModelOracle + Send + 'static,
        responses: usize,
        dimensionality: usize,
    ) -> Self {
        Self {
            model: Box::new(model),
            discretizer: None,
            responses,
            dimensionality,
        }
    }

    /// Attach a discretizer for continuous responses.
    #[must_use]
    pub fn with_discretizer(mut self, discretizer: impl Discretizer + Send + 'static) -> Self {
        self.discretizer = Some(Box::new(discretizer));
        self
    }

    pub fn has_discretizer(&self) -> bool {
        self.discretizer.is_some()
    }

    /// Evaluate and discretize one point.
    pub fn evaluate(&mut self, point: &ParameterVector) -> Result<Evaluation, OracleError> {
        match self.model.evaluate(point)? {
            Response::Pattern(pattern) => {
                self.check_pattern(&pattern)?;
                Ok(Evaluation {
                    response: None,
                    pattern,
                })
            }
            Response::Continuous(response) => {
                self.check_response(&response)?;
                let discretizer = self
                    .discretizer
                    .as_mut()
                    .ok_or(OracleError::MissingDiscretizer)?;
                let pattern = discretizer.discretize(&response)?;
                self.check_pattern(&pattern)?;
                Ok(Evaluation {
                    response: Some(response),
                    pattern,
                })
            }
        }
    }

    fn check_response(&self, response: &Array1<f64>) -> Result<(), OracleError> {
        if response.len() != self.responses {
            return Err(OracleError::ResponseLength {
                expected: self.responses,
                actual: response.len(),
            });
        }
        if response.iter().any(|v| !v.is_finite()) {
            return Err(OracleError::NonFinite);
        }
        Ok(())
    }

    fn check_pattern(&self, pattern: &Pattern) -> Result<(), OracleError> {
        let (rows, cols) = pattern.as_array().dim();
        if rows != self.dimensionality || cols != self.dimensionality {
            return Err(OracleError::PatternShape {
                expected: self.dimensionality,
                rows,
                cols,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("responses", &self.responses)
            .field("dimensionality", &self.dimensionality)
            .field("has_discretizer", &self.has_discretizer())
            .finish()
    }
}
