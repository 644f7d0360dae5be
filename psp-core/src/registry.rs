//! Region registry
//!
//! Append-only arena of discovered regions addressed by [`RegionId`]. Regions
//! are never removed; only their population and representative change. A
//! pattern index gives O(1) lookup of the region owning a pattern.

use std::collections::HashMap;

use crate::types::{ParameterVector, Pattern, Region, RegionId};

/// Authoritative store of discovered regions
#[derive(Debug, Default)]
pub struct RegionRegistry {
    regions: Vec<Region>,
    index: HashMap<Pattern, RegionId>,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    /// Regions in discovery order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Find the region whose pattern matches `pattern`.
    pub fn find(&self, pattern: &Pattern) -> Option<RegionId> {
        self.index.get(pattern).copied()
    }

    /// Append a new region with population 1.
    ///
    /// Callers check [`find`](Self::find) first; the index holds at most one
    /// region per pattern.
    pub(crate) fn discover(&mut self, pattern: Pattern, point: ParameterVector) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.index.insert(pattern.clone(), id);
        self.regions.push(Region::discovered(id, pattern, point));
        id
    }

    /// Count a sample for `id` and move its representative to `point`.
    pub(crate) fn accept(&mut self, id: RegionId, point: ParameterVector) {
        if let Some(region) = self.regions.get_mut(id.index()) {
            region.accept(point);
        }
    }

    /// Count a sample for `id` without moving its representative.
    pub(crate) fn add_population(&mut self, id: RegionId) {
        if let Some(region) = self.regions.get_mut(id.index()) {
            region.add_population();
        }
    }

    /// Regions below the population threshold, in discovery order.
    pub fn underpopulated(&self, threshold: Option<u32>) -> Vec<RegionId> {
        self.regions
            .iter()
            .filter(|region| region.is_underpopulated(threshold))
            .map(Region::id)
            .collect()
    }

    pub fn populations(&self) -> Vec<u32> {
        self.regions.iter().map(Region::population).collect()
    }

    /// Consume the registry, yielding regions in discovery order.
    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }
}
