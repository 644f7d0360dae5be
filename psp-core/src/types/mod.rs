//! Types for psp-core

mod pattern;
mod region;

pub use pattern::*;
pub use region::*;

use ndarray::Array1;

/// A point in the D-dimensional parameter space.
pub type ParameterVector = Array1<f64>;
