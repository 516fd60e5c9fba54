use crate::WispError;
use crate::cfg::NodeId;
use crate::summary::dependency::StrategyDependency;
use crate::summary::strategy::{GhostSubgraph, ParamValue, StrategyKind, StrategyQualifier};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Index of a ghost subgraph in the registry's arena. Ghosts persist for the
/// whole run; a forbidden ghost is excluded from selection, never deleted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GhostId(pub usize);

/// Run-scoped table correlating CFG nodes with assigned strategies and ghost
/// subgraphs. Owned by the driver during construction and consulted (plus
/// parameter-stepped) by refiners afterwards; passed explicitly rather than
/// held in process-wide state.
#[derive(Default)]
pub struct StrategyRegistry {
    tags: HashMap<NodeId, StrategyKind>,
    ghosts: Vec<GhostSubgraph>,
    by_node: HashMap<NodeId, Vec<GhostId>>,
    produced: BTreeMap<StrategyKind, usize>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `node` with `kind`. Repeating an identical assignment is a no-op;
    /// a conflicting one is a fatal contract violation.
    pub fn assign(&mut self, node: NodeId, kind: StrategyKind) -> Result<(), WispError> {
        match self.tags.get(&node) {
            Some(existing) if *existing == kind => Ok(()),
            Some(existing) => Err(WispError::DuplicateStrategyTag {
                node,
                existing: *existing,
                requested: kind,
            }),
            None => {
                self.tags.insert(node, kind);
                Ok(())
            }
        }
    }

    pub fn tag_of(&self, node: NodeId) -> Option<StrategyKind> {
        self.tags.get(&node).copied()
    }

    /// Record a spliced ghost. Its entry node gets the strategy tag the edge
    /// filter reads at exploration time; the ghost itself is indexed under the
    /// loop header it summarizes.
    pub fn add_ghost(&mut self, ghost: GhostSubgraph) -> Result<GhostId, WispError> {
        self.assign(ghost.entry(), ghost.kind())?;
        let id = GhostId(self.ghosts.len());
        self.by_node
            .entry(ghost.original_entry())
            .or_default()
            .push(id);
        *self.produced.entry(ghost.kind()).or_default() += 1;
        self.ghosts.push(ghost);
        Ok(id)
    }

    pub fn ghost(&self, id: GhostId) -> Option<&GhostSubgraph> {
        self.ghosts.get(id.0)
    }

    pub fn qualifier_of(&self, id: GhostId) -> Option<StrategyQualifier> {
        self.ghost(id).map(|g| g.qualifier())
    }

    pub fn ghosts_at(&self, node: NodeId) -> &[GhostId] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ghost_count(&self) -> usize {
        self.ghosts.len()
    }

    /// Ghost subgraphs produced so far, per strategy kind.
    pub fn produced_counts(&self) -> &BTreeMap<StrategyKind, usize> {
        &self.produced
    }

    /// The best remaining summary for the loop at `node`: scan its ghosts in
    /// the policy's priority order and return the first one not in
    /// `forbidden`.
    pub fn best_allowed_strategy(
        &self,
        node: NodeId,
        forbidden: &BTreeSet<GhostId>,
        policy: &dyn StrategyDependency,
    ) -> Option<GhostId> {
        let ids = self.ghosts_at(node);
        let kinds: Vec<StrategyKind> = ids
            .iter()
            .filter_map(|id| self.ghost(*id))
            .map(|g| g.kind())
            .unique()
            .collect();
        for kind in policy.filter(&kinds) {
            let found = ids.iter().copied().find(|id| {
                !forbidden.contains(id)
                    && self.ghost(*id).map(|g| g.kind()) == Some(kind)
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// The single designated parameter update: advance the ghost's parameter
    /// state to the next untried candidate value. `None` when the ghost has no
    /// parameters or the candidate domain is exhausted.
    pub fn advance_params(&mut self, id: GhostId) -> Option<ParamValue> {
        self.ghosts.get_mut(id.0)?.params_mut().advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{ControlFlowGraph, LoopInfo};
    use crate::config::SummaryConfig;
    use crate::summary::dependency::DependencyKind;
    use crate::summary::strategy::Strategy;

    fn looped_cfg() -> (ControlFlowGraph, NodeId) {
        let mut cfg = ControlFlowGraph::new();
        let f = cfg.add_function();
        let entry = cfg.add_node(f);
        let header = cfg.add_node(f);
        let body = cfg.add_node(f);
        let after = cfg.add_node(f);
        cfg.add_edge(entry, header);
        cfg.add_edge(header, body);
        cfg.add_edge(body, header);
        cfg.add_edge(header, after);
        cfg.set_entry(f, entry);
        cfg.set_loop(LoopInfo::new(header, [header, body]));
        (cfg, header)
    }

    fn ghost_of(kind: StrategyKind, cfg: &mut ControlFlowGraph, header: NodeId) -> GhostSubgraph {
        Strategy::new(kind, &SummaryConfig::default())
            .summarize(header, cfg)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn assign_rejects_conflicting_tags() {
        let (_cfg, header) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        registry.assign(header, StrategyKind::Havoc).unwrap();
        // repeating the same tag is fine
        registry.assign(header, StrategyKind::Havoc).unwrap();
        let err = registry
            .assign(header, StrategyKind::NaiveUnrolling)
            .unwrap_err();
        assert!(matches!(err, WispError::DuplicateStrategyTag { .. }));
        assert_eq!(registry.tag_of(header), Some(StrategyKind::Havoc));
    }

    #[test]
    fn best_allowed_skips_forbidden_ghosts() {
        let (mut cfg, header) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        let accel = registry
            .add_ghost(ghost_of(StrategyKind::LoopAcceleration, &mut cfg, header))
            .unwrap();
        let havoc = registry
            .add_ghost(ghost_of(StrategyKind::Havoc, &mut cfg, header))
            .unwrap();
        let policy = DependencyKind::Arbitrating.build();
        let mut forbidden = BTreeSet::new();
        assert_eq!(
            registry.best_allowed_strategy(header, &forbidden, policy.as_ref()),
            Some(accel)
        );
        forbidden.insert(accel);
        assert_eq!(
            registry.best_allowed_strategy(header, &forbidden, policy.as_ref()),
            Some(havoc)
        );
        forbidden.insert(havoc);
        assert_eq!(
            registry.best_allowed_strategy(header, &forbidden, policy.as_ref()),
            None
        );
    }

    #[test]
    fn ghost_entries_carry_their_tag() {
        let (mut cfg, header) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        let ghost = ghost_of(StrategyKind::Havoc, &mut cfg, header);
        let entry = ghost.entry();
        registry.add_ghost(ghost).unwrap();
        assert_eq!(registry.tag_of(entry), Some(StrategyKind::Havoc));
        assert_eq!(registry.produced_counts()[&StrategyKind::Havoc], 1);
    }

    #[test]
    fn advance_params_appends_history() {
        let (mut cfg, header) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        let id = registry
            .add_ghost(ghost_of(
                StrategyKind::NondetBoundConstantExtrapolation,
                &mut cfg,
                header,
            ))
            .unwrap();
        assert_eq!(registry.ghost(id).unwrap().params().tried_count(), 1);
        assert_eq!(registry.advance_params(id), Some(ParamValue::Scalar(1)));
        assert_eq!(registry.ghost(id).unwrap().params().tried_count(), 2);
        // an unparameterized ghost has nothing to step
        let havoc = registry
            .add_ghost(ghost_of(StrategyKind::Havoc, &mut cfg, header))
            .unwrap();
        assert_eq!(registry.advance_params(havoc), None);
    }
}
