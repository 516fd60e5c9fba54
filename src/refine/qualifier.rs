use crate::WispError;
use crate::arg::{ArgNodeId, SearchTree};
use crate::interrupt::Interrupt;
use crate::refine::{RefinementVerdict, Refiner};
use crate::summary::dependency::StrategyDependency;
use crate::summary::registry::{GhostId, StrategyRegistry};
use crate::summary::strategy::StrategyQualifier;
use std::collections::{HashSet, VecDeque};

/// Walk parents from the refinement root until a location is found whose
/// precision carries a current summary of the wanted qualifier.
pub(crate) fn find_ancestor_with_qualifier(
    tree: &SearchTree,
    registry: &StrategyRegistry,
    qualifier: StrategyQualifier,
    interrupt: &Interrupt,
) -> Result<Option<(ArgNodeId, GhostId)>, WispError> {
    let Some(start) = tree.refinement_root() else {
        return Ok(None);
    };
    let mut seen: HashSet<ArgNodeId> = HashSet::from([start]);
    let mut queue: VecDeque<ArgNodeId> = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        interrupt.check()?;
        let Some(node) = tree.node(id) else {
            continue;
        };
        if let Some(ghost) = node.precision.current
            && registry.qualifier_of(ghost) == Some(qualifier)
        {
            return Ok(Some((id, ghost)));
        }
        if let Some(parent) = node.parent
            && seen.insert(parent)
        {
            queue.push_back(parent);
        }
    }
    Ok(None)
}

/// Forbid `current` at `id` and install the best remaining summary there,
/// pruning the subtree that was explored under the old one.
///
/// Nothing is committed unless a replacement exists, so a failed step leaves
/// the tree and every precision exactly as they were.
pub(crate) fn forbid_and_replace(
    tree: &mut SearchTree,
    registry: &StrategyRegistry,
    policy: &dyn StrategyDependency,
    id: ArgNodeId,
    current: GhostId,
) -> RefinementVerdict {
    let Some(node) = tree.node(id) else {
        return RefinementVerdict::Exhausted;
    };
    let location = node.location;
    let mut trial = node.precision.forbidden.clone();
    trial.insert(current);
    match registry.best_allowed_strategy(location, &trial, policy) {
        Some(next) => {
            if let Some(precision) = tree.precision_mut(id) {
                precision.forbidden.insert(current);
                precision.current = Some(next);
            }
            tree.remove_children(id);
            tracing::debug!(
                "replaced summary {current:?} with {next:?} at {location}, subtree pruned"
            );
            RefinementVerdict::Refined
        }
        None => {
            tracing::debug!("no admissible alternative to {current:?} at {location}");
            RefinementVerdict::Exhausted
        }
    }
}

pub(crate) fn refine_by_qualifier(
    tree: &mut SearchTree,
    registry: &StrategyRegistry,
    policy: &dyn StrategyDependency,
    qualifier: StrategyQualifier,
    interrupt: &Interrupt,
) -> Result<RefinementVerdict, WispError> {
    match find_ancestor_with_qualifier(tree, registry, qualifier, interrupt)? {
        Some((id, current)) => Ok(forbid_and_replace(tree, registry, policy, id, current)),
        None => Ok(RefinementVerdict::Exhausted),
    }
}

/// Single-qualifier refiner: replaces the nearest ancestor summary of one
/// fixed qualifier (typically over-approximating, for spurious
/// counterexamples).
pub struct QualifierRefiner {
    qualifier: StrategyQualifier,
    policy: Box<dyn StrategyDependency>,
    interrupt: Interrupt,
}

impl QualifierRefiner {
    pub fn new(
        qualifier: StrategyQualifier,
        policy: Box<dyn StrategyDependency>,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            qualifier,
            policy,
            interrupt,
        }
    }

    pub fn over_approximating(policy: Box<dyn StrategyDependency>, interrupt: Interrupt) -> Self {
        Self::new(StrategyQualifier::OverApproximating, policy, interrupt)
    }

    pub fn under_approximating(policy: Box<dyn StrategyDependency>, interrupt: Interrupt) -> Self {
        Self::new(StrategyQualifier::Underapproximating, policy, interrupt)
    }
}

impl Refiner for QualifierRefiner {
    fn perform_refinement(
        &mut self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
    ) -> Result<RefinementVerdict, WispError> {
        refine_by_qualifier(
            tree,
            registry,
            self.policy.as_ref(),
            self.qualifier,
            &self.interrupt,
        )
    }
}
