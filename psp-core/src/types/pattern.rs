//! Ordinal patterns
//!
//! A pattern is an S×S relation matrix. Only the strict upper triangle
//! (row < column) takes part in comparison and hashing; the diagonal and the
//! lower triangle are carried along but never compared.

use std::hash::{Hash, Hasher};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Discretized relation matrix summarizing one model response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i32>>", into = "Vec<Vec<i32>>")]
pub struct Pattern {
    matrix: Array2<i32>,
}

impl Pattern {
    /// Wrap a square matrix.
    pub fn new(matrix: Array2<i32>) -> Result<Self, OracleError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(OracleError::PatternShape {
                expected: rows,
                rows,
                cols,
            });
        }
        Ok(Self { matrix })
    }

    /// Build a pattern from row-major nested vectors.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, OracleError> {
        let side = rows.len();
        if let Some(bad) = rows.iter().find(|row| row.len() != side) {
            return Err(OracleError::PatternShape {
                expected: side,
                rows: side,
                cols: bad.len(),
            });
        }
        let data: Vec<i32> = rows.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((side, side), data).map_err(|e| {
            OracleError::Evaluation(format!("could not shape pattern matrix: {e}"))
        })?;
        Ok(Self { matrix })
    }

    /// Side length S of the matrix.
    pub fn side(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn as_array(&self) -> &Array2<i32> {
        &self.matrix
    }

    /// Strict upper-triangular entries in row-major order.
    ///
    /// This is the canonical identity of the pattern.
    pub fn upper_triangle(&self) -> Vec<i32> {
        let side = self.side();
        let mut entries = Vec::with_capacity(side * side.saturating_sub(1) / 2);
        for row in 0..side {
            for col in (row + 1)..side {
                entries.push(self.matrix[[row, col]]);
            }
        }
        entries
    }

    /// Entry-by-entry comparison of the strict upper triangles.
    ///
    /// Patterns of different sides never match.
    pub fn matches(&self, other: &Pattern) -> bool {
        let side = self.side();
        if side != other.side() {
            return false;
        }
        (0..side).all(|row| {
            ((row + 1)..side).all(|col| self.matrix[[row, col]] == other.matrix[[row, col]])
        })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.side().hash(state);
        self.upper_triangle().hash(state);
    }
}

impl TryFrom<Vec<Vec<i32>>> for Pattern {
    type Error = OracleError;

    fn try_from(rows: Vec<Vec<i32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Pattern> for Vec<Vec<i32>> {
    fn from(pattern: Pattern) -> Self {
        pattern
            .matrix
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self
            .upper_triangle()
            .iter()
            .map(ToString::to_string)
            .collect();
        write!(f, "[{}]", entries.join(" "))
    }
}

/// Standard ordinal discretization of a continuous response.
///
/// Entry `(i, j)` is the sign of `response[i] - response[j]`: `1` when the
/// i-th response dominates, `-1` when it is dominated, `0` on ties.
pub fn ordinal_pattern(response: &Array1<f64>) -> Pattern {
    let side = response.len();
    let matrix = Array2::from_shape_fn((side, side), |(i, j)| {
        match response[i].partial_cmp(&response[j]) {
            Some(std::cmp::Ordering::Greater) => 1,
            Some(std::cmp::Ordering::Less) => -1,
            _ => 0,
        }
    });
    Pattern { matrix }
}
