//! Discovered regions of the parameter space

use serde::{Deserialize, Serialize};

use super::{ParameterVector, Pattern};

/// Stable identity of a region, assigned in discovery order starting at 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

impl RegionId {
    /// Position of the region in the registry arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The subset of parameter space mapping to one ordinal pattern
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    pattern: Pattern,
    population: u32,
    representative: ParameterVector,
}

impl Region {
    /// Create a freshly discovered region with population 1.
    pub(crate) fn discovered(id: RegionId, pattern: Pattern, point: ParameterVector) -> Self {
        Self {
            id,
            pattern,
            population: 1,
            representative: point,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Number of accepted samples that mapped into this region.
    pub fn population(&self) -> u32 {
        self.population
    }

    /// The point the next local jumps are centered on.
    pub fn representative(&self) -> &ParameterVector {
        &self.representative
    }

    /// Whether the region still needs samples to reach `threshold`.
    ///
    /// `None` means no population threshold: every region stays eligible.
    pub fn is_underpopulated(&self, threshold: Option<u32>) -> bool {
        threshold.is_none_or(|t| self.population < t)
    }

    pub(crate) fn accept(&mut self, point: ParameterVector) {
        self.population += 1;
        self.representative = point;
    }

    pub(crate) fn add_population(&mut self) {
        self.population += 1;
    }
}
