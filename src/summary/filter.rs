use crate::cfg::{ControlFlowGraph, EdgeId, NodeId};
use crate::config::SummaryConfig;
use crate::summary::dependency::StrategyDependency;
use crate::summary::registry::StrategyRegistry;
use crate::summary::strategy::StrategyKind;
use itertools::Itertools;
use std::collections::HashSet;

/// Exploration-time edge restriction.
///
/// Ghost entry nodes carry strategy tags; when a location has several tagged
/// successors (alternative summaries of the same loop), the transfer policy's
/// `filter` decides which of those branches the exploration engine may take.
/// Untagged successors are part of the original program and always pass.
pub struct EdgeFilter {
    policy: Box<dyn StrategyDependency>,
}

impl EdgeFilter {
    pub fn new(policy: Box<dyn StrategyDependency>) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &SummaryConfig) -> Self {
        Self::new(config.transfer_policy.build())
    }

    /// The explorable subset of `node`'s leaving edges.
    pub fn outgoing_edges(
        &self,
        node: NodeId,
        cfg: &ControlFlowGraph,
        registry: &StrategyRegistry,
    ) -> Vec<EdgeId> {
        let leaving = cfg.leaving_edges(node);
        let tags: Vec<StrategyKind> = leaving
            .iter()
            .filter_map(|e| cfg.edge_target(*e))
            .filter_map(|succ| registry.tag_of(succ))
            .unique()
            .collect();
        let admissible: HashSet<StrategyKind> = self.policy.filter(&tags).into_iter().collect();
        leaving
            .into_iter()
            .filter(|e| {
                match cfg.edge_target(*e).and_then(|succ| registry.tag_of(succ)) {
                    Some(kind) => admissible.contains(&kind),
                    None => true,
                }
            })
            .collect()
    }

    /// Restrict an explicit edge list to edges whose targets are tagged with
    /// one of the given strategies. Used when composing with other
    /// exploration-time restrictions.
    pub fn edges_with_strategies(
        &self,
        edges: &[EdgeId],
        allowed: &HashSet<StrategyKind>,
        cfg: &ControlFlowGraph,
        registry: &StrategyRegistry,
    ) -> Vec<EdgeId> {
        edges
            .iter()
            .copied()
            .filter(|e| {
                cfg.edge_target(*e)
                    .and_then(|succ| registry.tag_of(succ))
                    .is_some_and(|kind| allowed.contains(&kind))
            })
            .collect()
    }
}
