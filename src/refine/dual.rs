use crate::WispError;
use crate::arg::SearchTree;
use crate::interrupt::Interrupt;
use crate::refine::qualifier::{find_ancestor_with_qualifier, forbid_and_replace, refine_by_qualifier};
use crate::refine::{RefinementVerdict, Refiner};
use crate::summary::dependency::StrategyDependency;
use crate::summary::registry::StrategyRegistry;
use crate::summary::strategy::{StrategyKind, StrategyQualifier};
use std::collections::BTreeSet;

/// Refiner handling both under- and over-approximating summaries.
///
/// The reached set must be qualifier-homogeneous: all currently-used summaries
/// `Precise|Underapproximating` (under-approximating search, with parameter
/// stepping before outright strategy switching) or all
/// `Precise|OverApproximating` (plain over-approximating search). Mixed sets
/// are refused. When a single strategy kind is in use and its search comes up
/// empty, the opposite qualifier is searched instead of failing outright.
pub struct DualRefiner {
    policy: Box<dyn StrategyDependency>,
    interrupt: Interrupt,
}

impl DualRefiner {
    pub fn new(policy: Box<dyn StrategyDependency>, interrupt: Interrupt) -> Self {
        Self { policy, interrupt }
    }

    /// Under-approximating search: prefer advancing the found summary's
    /// parameters to the next untried candidate value; only once the
    /// candidate domain is exhausted is the summary forbidden and replaced.
    fn refine_under(
        &self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
    ) -> Result<RefinementVerdict, WispError> {
        let found = find_ancestor_with_qualifier(
            tree,
            registry,
            StrategyQualifier::Underapproximating,
            &self.interrupt,
        )?;
        let Some((id, ghost)) = found else {
            return Ok(RefinementVerdict::Exhausted);
        };
        if let Some(value) = registry.advance_params(ghost) {
            tracing::debug!("advanced summary {ghost:?} to parameter {value:?}");
            tree.remove_children(id);
            return Ok(RefinementVerdict::Refined);
        }
        Ok(forbid_and_replace(
            tree,
            registry,
            self.policy.as_ref(),
            id,
            ghost,
        ))
    }

    fn refine_one(
        &self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
        qualifier: StrategyQualifier,
    ) -> Result<RefinementVerdict, WispError> {
        match qualifier {
            StrategyQualifier::Underapproximating => self.refine_under(tree, registry),
            _ => refine_by_qualifier(
                tree,
                registry,
                self.policy.as_ref(),
                qualifier,
                &self.interrupt,
            ),
        }
    }
}

impl Refiner for DualRefiner {
    fn perform_refinement(
        &mut self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
    ) -> Result<RefinementVerdict, WispError> {
        let mut qualifiers: BTreeSet<StrategyQualifier> = BTreeSet::new();
        let mut kinds: BTreeSet<StrategyKind> = BTreeSet::new();
        for (_, node) in tree.iter() {
            if let Some(id) = node.precision.current
                && let Some(ghost) = registry.ghost(id)
            {
                qualifiers.insert(ghost.qualifier());
                kinds.insert(ghost.kind());
            }
        }
        let over = qualifiers.contains(&StrategyQualifier::OverApproximating);
        let under = qualifiers.contains(&StrategyQualifier::Underapproximating);
        if over && under {
            tracing::warn!(
                "refusing refinement: reached set mixes over- and under-approximating summaries"
            );
            return Ok(RefinementVerdict::Exhausted);
        }
        let primary = if over {
            StrategyQualifier::OverApproximating
        } else {
            StrategyQualifier::Underapproximating
        };
        let verdict = self.refine_one(tree, registry, primary)?;
        if !verdict.refined() && kinds.len() == 1 {
            let opposite = primary.opposite();
            tracing::debug!(
                "single strategy kind in use and {primary:?} search exhausted; trying {opposite:?}"
            );
            return self.refine_one(tree, registry, opposite);
        }
        Ok(verdict)
    }
}
