use crate::summary::strategy::StrategyKind;
use serde::{Deserialize, Serialize};

/// Cross-cutting eligibility, ordering and stop rules over the configured
/// strategy set.
///
/// `filter` serves double duty: the driver never consults it directly, but the
/// [`EdgeFilter`](crate::summary::filter::EdgeFilter) uses it at exploration
/// time to keep mutually exclusive ghost branches from being explored
/// together, and the registry uses it to order candidates for
/// `best_allowed_strategy`.
pub trait StrategyDependency {
    /// May `kind` run during sweep `iteration` (1-based)?
    fn is_eligible(&self, kind: StrategyKind, iteration: u32) -> bool;

    /// Reduce `candidates` to an ordered admissible subset.
    fn filter(&self, candidates: &[StrategyKind]) -> Vec<StrategyKind>;

    /// Should the fixpoint driver stop after sweep `iteration`?
    fn stop_post_processing(&self, iteration: u32, changed_this_round: bool) -> bool;
}

/// Configuration selector for the closed set of dependency policies.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
pub enum DependencyKind {
    /// No constraints: identity filter, never stops early.
    #[default]
    Base,
    /// Priority ordering plus mutual exclusion of acceleration and naive
    /// unrolling at the same node; stops once a round makes no progress.
    Arbitrating,
    /// Like `Arbitrating`, but expensive strategies only run every
    /// `period`-th sweep.
    Throttled { period: u32 },
}

impl DependencyKind {
    pub fn build(&self) -> Box<dyn StrategyDependency> {
        match self {
            DependencyKind::Base => Box::new(BaseDependency),
            DependencyKind::Arbitrating => Box::new(ArbitratingDependency),
            DependencyKind::Throttled { period } => Box::new(ThrottledDependency {
                period: (*period).max(1),
            }),
        }
    }
}

pub struct BaseDependency;

impl StrategyDependency for BaseDependency {
    fn is_eligible(&self, _kind: StrategyKind, _iteration: u32) -> bool {
        true
    }

    fn filter(&self, candidates: &[StrategyKind]) -> Vec<StrategyKind> {
        candidates.to_vec()
    }

    fn stop_post_processing(&self, _iteration: u32, _changed_this_round: bool) -> bool {
        false
    }
}

fn arbitrate(candidates: &[StrategyKind]) -> Vec<StrategyKind> {
    let mut out: Vec<StrategyKind> = candidates.to_vec();
    out.sort_by_key(|k| k.priority());
    out.dedup();
    if out.contains(&StrategyKind::LoopAcceleration) {
        out.retain(|k| *k != StrategyKind::NaiveUnrolling);
    }
    out
}

pub struct ArbitratingDependency;

impl StrategyDependency for ArbitratingDependency {
    fn is_eligible(&self, _kind: StrategyKind, _iteration: u32) -> bool {
        true
    }

    fn filter(&self, candidates: &[StrategyKind]) -> Vec<StrategyKind> {
        arbitrate(candidates)
    }

    fn stop_post_processing(&self, _iteration: u32, changed_this_round: bool) -> bool {
        !changed_this_round
    }
}

pub struct ThrottledDependency {
    period: u32,
}

impl StrategyDependency for ThrottledDependency {
    fn is_eligible(&self, kind: StrategyKind, iteration: u32) -> bool {
        !kind.is_expensive() || iteration % self.period == 0
    }

    fn filter(&self, candidates: &[StrategyKind]) -> Vec<StrategyKind> {
        arbitrate(candidates)
    }

    fn stop_post_processing(&self, _iteration: u32, changed_this_round: bool) -> bool {
        !changed_this_round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StrategyKind::*;

    #[test]
    fn base_is_identity() {
        let policy = DependencyKind::Base.build();
        let candidates = [NaiveUnrolling, LoopAcceleration, Havoc];
        assert_eq!(policy.filter(&candidates), candidates.to_vec());
        assert!(policy.is_eligible(DeterministicExecution, 1));
        assert!(!policy.stop_post_processing(100, false));
    }

    #[test]
    fn arbitrating_drops_unrolling_next_to_acceleration() {
        let policy = DependencyKind::Arbitrating.build();
        let filtered = policy.filter(&[NaiveUnrolling, Havoc, LoopAcceleration]);
        assert_eq!(filtered, vec![LoopAcceleration, Havoc]);
        // without acceleration, unrolling survives and ordering is by priority
        let filtered = policy.filter(&[Havoc, NaiveUnrolling]);
        assert_eq!(filtered, vec![NaiveUnrolling, Havoc]);
    }

    #[test]
    fn arbitrating_stops_without_progress() {
        let policy = DependencyKind::Arbitrating.build();
        assert!(!policy.stop_post_processing(1, true));
        assert!(policy.stop_post_processing(2, false));
    }

    #[test]
    fn throttled_gates_expensive_kinds() {
        let policy = DependencyKind::Throttled { period: 3 }.build();
        assert!(!policy.is_eligible(ConcolicExecution, 1));
        assert!(!policy.is_eligible(ConcolicExecution, 2));
        assert!(policy.is_eligible(ConcolicExecution, 3));
        assert!(policy.is_eligible(Havoc, 1));
    }
}
