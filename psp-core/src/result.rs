//! Final result of an exploration run

use serde::{Deserialize, Serialize};

use crate::registry::RegionRegistry;
use crate::types::Pattern;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The configured number of passes was executed.
    IterationLimit,
    /// Every region reached the population threshold.
    PopulationReached,
    /// Cancelled between passes.
    Cancelled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IterationLimit => write!(f, "iteration limit"),
            Self::PopulationReached => write!(f, "population reached"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Discovered patterns with their populations, in discovery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exploration {
    /// One pattern per region
    pub patterns: Vec<Pattern>,
    /// Final population of each region, parallel to `patterns`
    pub populations: Vec<u32>,
    /// Final representative point of each region, parallel to `patterns`
    pub representatives: Vec<Vec<f64>>,
    /// Loop passes executed
    pub iterations: u32,
    pub termination: Termination,
}

impl Exploration {
    /// Package the frozen registry.
    pub fn assemble(registry: RegionRegistry, iterations: u32, termination: Termination) -> Self {
        let regions = registry.into_regions();
        let populations = regions.iter().map(|r| r.population()).collect();
        let representatives = regions.iter().map(|r| r.representative().to_vec()).collect();
        let patterns = regions.into_iter().map(|r| r.pattern().clone()).collect();

        Self {
            patterns,
            populations,
            representatives,
            iterations,
            termination,
        }
    }

    /// Number of distinct patterns found.
    pub fn region_count(&self) -> usize {
        self.patterns.len()
    }

    /// Total number of accepted samples across regions.
    pub fn total_population(&self) -> u64 {
        self.populations.iter().map(|&p| u64::from(p)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{Candidate, PatternMatcher};
    use ndarray::array;

    fn pattern(upper: i32) -> Pattern {
        Pattern::from_rows(vec![vec![0, upper], vec![0, 0]]).unwrap()
    }

    #[test]
    fn test_assemble_preserves_discovery_order() {
        let mut registry = RegionRegistry::new();
        PatternMatcher::new().apply(
            &mut registry,
            vec![
                Candidate::new(array![1.0], pattern(1)),
                Candidate::new(array![2.0], pattern(-1)),
                Candidate::new(array![3.0], pattern(1)),
            ],
        );

        let result = Exploration::assemble(registry, 4, Termination::IterationLimit);
        assert_eq!(result.patterns, vec![pattern(1), pattern(-1)]);
        assert_eq!(result.populations, vec![2, 1]);
        assert_eq!(result.representatives, vec![vec![1.0], vec![2.0]]);
        assert_eq!(result.iterations, 4);
        assert_eq!(result.region_count(), 2);
        assert_eq!(result.total_population(), 3);
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::Cancelled.to_string(), "cancelled");
        assert_eq!(Termination::PopulationReached.to_string(), "population reached");
    }

    #[test]
    fn test_exploration_serialization() {
        let mut registry = RegionRegistry::new();
        PatternMatcher::new().apply(&mut registry, vec![Candidate::new(array![1.0], pattern(1))]);
        let result = Exploration::assemble(registry, 1, Termination::PopulationReached);

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"termination\":\"population_reached\""));
        let parsed: Exploration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
