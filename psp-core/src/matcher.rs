//! Pattern matching against the region registry
//!
//! Classifies each newly discretized pattern of a pass as a new region, a
//! match of an existing region, or a within-pass duplicate. Candidates are
//! applied in generation order, so identity assignment is deterministic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::RegionRegistry;
use crate::types::{ParameterVector, Pattern, RegionId};

/// How a candidate was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// No region matched; a new one was created.
    Discovered,
    /// An existing region matched and moved to this candidate.
    Matched,
    /// An earlier candidate of the same pass had the same pattern.
    Duplicate,
}

/// Outcome of matching one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub region: RegionId,
    pub kind: MatchKind,
}

/// A point paired with the pattern it produced
#[derive(Debug, Clone)]
pub struct Candidate {
    pub point: ParameterVector,
    pub pattern: Pattern,
}

impl Candidate {
    pub fn new(point: ParameterVector, pattern: Pattern) -> Self {
        Self { point, pattern }
    }
}

/// Applies one pass worth of candidates to the registry
#[derive(Debug, Default)]
pub struct PatternMatcher {
    seen_this_pass: HashMap<Pattern, RegionId>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match every candidate of a single pass, in order.
    ///
    /// Returns one outcome per candidate, parallel to the input.
    pub fn apply(
        &mut self,
        registry: &mut RegionRegistry,
        candidates: Vec<Candidate>,
    ) -> Vec<MatchOutcome> {
        self.seen_this_pass.clear();
        candidates
            .into_iter()
            .map(|candidate| self.apply_one(registry, candidate))
            .collect()
    }

    fn apply_one(&mut self, registry: &mut RegionRegistry, candidate: Candidate) -> MatchOutcome {
        if let Some(&region) = self.seen_this_pass.get(&candidate.pattern) {
            registry.add_population(region);
            return MatchOutcome {
                region,
                kind: MatchKind::Duplicate,
            };
        }

        let outcome = match registry.find(&candidate.pattern) {
            Some(region) => {
                registry.accept(region, candidate.point);
                MatchOutcome {
                    region,
                    kind: MatchKind::Matched,
                }
            }
            None => {
                let region = registry.discover(candidate.pattern.clone(), candidate.point);
                debug!(%region, pattern = %candidate.pattern, "Discovered region");
                MatchOutcome {
                    region,
                    kind: MatchKind::Discovered,
                }
            }
        };

        self.seen_this_pass.insert(candidate.pattern, outcome.region);
        outcome
    }
}
