use crate::WispError;
use crate::arg::SearchTree;
use crate::summary::registry::StrategyRegistry;

mod composed;
mod dual;
mod qualifier;

pub use composed::SummaryBasedRefiner;
pub use dual::DualRefiner;
pub use qualifier::QualifierRefiner;

/// Outcome of one refinement step.
///
/// `Exhausted` covers every recoverable failure (no replaceable ancestor, no
/// admissible alternative, refused inputs) and leaves the search tree and all
/// precisions untouched. Fatal conditions and cancellation surface as `Err`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RefinementVerdict {
    Refined,
    Exhausted,
}

impl RefinementVerdict {
    pub fn refined(&self) -> bool {
        matches!(self, RefinementVerdict::Refined)
    }
}

/// CEGAR strategy-refinement step: locate the summary the counterexample
/// depends on, forbid it, install the next admissible alternative, and prune
/// the part of the search tree that depended on the old one.
pub trait Refiner {
    fn perform_refinement(
        &mut self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
    ) -> Result<RefinementVerdict, WispError>;
}
