//! Run configuration
//!
//! [`PspConfig`] is the complete description of one exploration run. It is
//! usually read from a TOML run file:
//!
//! ```toml
//! iterations = 500          # omit for no iteration limit
//! population = 50           # omit for no population threshold
//! radius = 0.5
//! init = [5.0, 5.0]         # or a list of rows: [[5.0, 5.0], [1.0, 9.0]]
//! lower = [0.0, 0.0]
//! upper = [10.0, 10.0]
//! parameter_names = ["alpha", "beta"]
//! dimensionality = 3        # pattern side length S
//! responses = 3             # continuous response length, defaults to S
//! seed = 42                 # optional master seed
//! ```
//!
//! [`PspConfig::validate`] enforces every constraint before any oracle call.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundsClamper;
use crate::error::ConfigError;
use crate::types::ParameterVector;

/// Initial parameter vector(s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialPoints {
    /// A single starting vector
    Single(Vec<f64>),
    /// One starting vector per row.
    ///
    /// Rows are matched like the candidates of a pass: rows producing the same
    /// pattern seed a single region, and every row after the first adds one
    /// to its population.
    Rows(Vec<Vec<f64>>),
}

impl InitialPoints {
    pub fn rows(&self) -> Vec<&[f64]> {
        match self {
            Self::Single(row) => vec![row.as_slice()],
            Self::Rows(rows) => rows.iter().map(Vec::as_slice).collect(),
        }
    }
}

/// Configuration for one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PspConfig {
    /// Maximum number of loop passes. `None` means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Samples each region needs before it stops being explored. `None` means no threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u32>,
    /// Maximum jump length around a representative.
    pub radius: f64,
    /// Starting point(s) of the exploration.
    pub init: InitialPoints,
    /// Lower corner of the parameter box.
    pub lower: Vec<f64>,
    /// Upper corner of the parameter box.
    pub upper: Vec<f64>,
    /// Column labels for the parameters; generated when empty.
    #[serde(default)]
    pub parameter_names: Vec<String>,
    /// Labels for the stimuli, one per pattern row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimuli_names: Option<Vec<String>>,
    /// Side length S of every pattern matrix.
    pub dimensionality: usize,
    /// Length of the continuous response; defaults to `dimensionality`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<usize>,
    /// Master seed for reproducible runs; drawn from entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Candidates drawn around each underpopulated region per pass.
    #[serde(default = "default_samples_per_region")]
    pub samples_per_region: usize,
    /// Suppress per-iteration progress notices.
    #[serde(default)]
    pub quiet: bool,
}

fn default_samples_per_region() -> usize {
    1
}

impl PspConfig {
    /// Create a configuration with one starting point and no stopping criteria yet.
    pub fn new(
        init: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        radius: f64,
        dimensionality: usize,
    ) -> Self {
        Self {
            iterations: None,
            population: None,
            radius,
            init: InitialPoints::Single(init),
            lower,
            upper,
            parameter_names: Vec::new(),
            stimuli_names: None,
            dimensionality,
            responses: None,
            seed: None,
            samples_per_region: default_samples_per_region(),
            quiet: false,
        }
    }

    /// Parse a TOML run file.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    #[must_use]
    pub fn with_population(mut self, population: u32) -> Self {
        self.population = Some(population);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_responses(mut self, responses: usize) -> Self {
        self.responses = Some(responses);
        self
    }

    #[must_use]
    pub fn with_parameter_names(mut self, names: Vec<String>) -> Self {
        self.parameter_names = names;
        self
    }

    #[must_use]
    pub fn with_stimuli_names(mut self, names: Vec<String>) -> Self {
        self.stimuli_names = Some(names);
        self
    }

    /// Replace the starting point with several rows.
    #[must_use]
    pub fn with_init_rows(mut self, rows: Vec<Vec<f64>>) -> Self {
        self.init = InitialPoints::Rows(rows);
        self
    }

    #[must_use]
    pub fn with_samples_per_region(mut self, count: usize) -> Self {
        self.samples_per_region = count;
        self
    }

    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Number of parameters D.
    pub fn dimensions(&self) -> usize {
        self.lower.len()
    }

    /// Continuous response length.
    pub fn response_len(&self) -> usize {
        self.responses.unwrap_or(self.dimensionality)
    }

    pub fn initial_points(&self) -> Vec<ParameterVector> {
        self.init
            .rows()
            .into_iter()
            .map(|row| Array1::from(row.to_vec()))
            .collect()
    }

    pub fn lower_bounds(&self) -> Array1<f64> {
        Array1::from(self.lower.clone())
    }

    pub fn upper_bounds(&self) -> Array1<f64> {
        Array1::from(self.upper.clone())
    }

    /// Parameter column labels, generating `p1..pD` when none are configured.
    pub fn parameter_labels(&self) -> Vec<String> {
        if self.parameter_names.is_empty() {
            (1..=self.dimensions()).map(|i| format!("p{i}")).collect()
        } else {
            self.parameter_names.clone()
        }
    }

    /// Response column labels: the stimuli names when they cover every
    /// response, otherwise `response_1..response_n`.
    pub fn response_labels(&self) -> Vec<String> {
        match &self.stimuli_names {
            Some(names) if names.len() == self.response_len() => names.clone(),
            _ => (1..=self.response_len())
                .map(|i| format!("response_{i}"))
                .collect(),
        }
    }

    /// Check every constraint of the run contract.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = self.dimensions();
        if dims == 0 {
            return Err(invalid("lower", "at least one parameter is required"));
        }
        check_len("upper", dims, self.upper.len())?;
        if !self.parameter_names.is_empty() {
            check_len("parameter_names", dims, self.parameter_names.len())?;
        }

        let rows = self.init.rows();
        if rows.is_empty() {
            return Err(invalid("init", "at least one starting point is required"));
        }
        for row in &rows {
            check_len("init", dims, row.len())?;
        }

        for (index, (&lower, &upper)) in self.lower.iter().zip(&self.upper).enumerate() {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(invalid("lower/upper", format!("bound {index} is not finite")));
            }
            if lower > upper {
                return Err(ConfigError::InvertedBounds {
                    index,
                    lower,
                    upper,
                });
            }
        }

        let bounds = BoundsClamper::new(self.lower_bounds(), self.upper_bounds());
        for row in &rows {
            if !bounds.contains(row) {
                return Err(invalid("init", format!("{row:?} lies outside the parameter box")));
            }
        }

        match (self.iterations, self.population) {
            (None, None) => return Err(ConfigError::Unbounded),
            (Some(0), _) => return Err(invalid("iterations", "must be positive")),
            (_, Some(0)) => return Err(invalid("population", "must be positive")),
            _ => {}
        }

        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(invalid("radius", format!("{} is not a positive number", self.radius)));
        }
        if self.dimensionality == 0 {
            return Err(invalid("dimensionality", "must be positive"));
        }
        if self.responses == Some(0) {
            return Err(invalid("responses", "must be positive"));
        }
        if let Some(names) = &self.stimuli_names {
            check_len("stimuli_names", self.dimensionality, names.len())?;
        }
        if self.samples_per_region == 0 {
            return Err(invalid("samples_per_region", "must be positive"));
        }

        Ok(())
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), ConfigError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConfigError::DimensionMismatch {
            field,
            expected,
            actual,
        })
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}
