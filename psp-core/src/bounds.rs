//! Parameter box clamping

use ndarray::{Array1, Array2, Axis};

/// Projects candidate points into the `[lower, upper]` box, per dimension
#[derive(Debug, Clone)]
pub struct BoundsClamper {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl BoundsClamper {
    /// Create a clamper. Bounds are validated by configuration beforehand.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Self {
        Self { lower, upper }
    }

    /// Clamp every row of `points` in place.
    pub fn clamp(&self, points: &mut Array2<f64>) {
        for (dim, mut column) in points.axis_iter_mut(Axis(1)).enumerate() {
            let (lo, hi) = (self.lower[dim], self.upper[dim]);
            column.mapv_inplace(|v| v.clamp(lo, hi));
        }
    }

    /// Whether `point` lies inside the box. Non-finite components never do.
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.lower.len()
            && point
                .iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(&v, (&lo, &hi))| lo <= v && v <= hi)
    }
}
