use crate::state::ProvinceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Undirected graph of province adjacencies.
///
/// Neighbor sets are ordered so that anything walking the graph visits
/// provinces in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    adjacencies: BTreeMap<ProvinceId, BTreeSet<ProvinceId>>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bidirectional adjacency between two provinces. Self-loops are ignored.
    pub fn add_adjacency(&mut self, p1: ProvinceId, p2: ProvinceId) {
        if p1 == p2 {
            return;
        }
        self.adjacencies.entry(p1).or_default().insert(p2);
        self.adjacencies.entry(p2).or_default().insert(p1);
    }

    /// Neighbors of a province in ascending id order.
    pub fn neighbors(&self, province: ProvinceId) -> impl Iterator<Item = ProvinceId> + '_ {
        self.adjacencies
            .get(&province)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn are_adjacent(&self, p1: ProvinceId, p2: ProvinceId) -> bool {
        self.adjacencies
            .get(&p1)
            .is_some_and(|set| set.contains(&p2))
    }

    /// Every province in `provinces` plus every neighbor of one of them.
    pub fn closed_neighborhood(&self, provinces: &BTreeSet<ProvinceId>) -> BTreeSet<ProvinceId> {
        let mut out = provinces.clone();
        for &p in provinces {
            out.extend(self.neighbors(p));
        }
        out
    }

    pub fn edge_count(&self) -> usize {
        self.adjacencies.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}
