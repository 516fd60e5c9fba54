use crate::summary::dependency::DependencyKind;
use crate::summary::strategy::StrategyKind;
use serde::{Deserialize, Serialize};

/// Options recognized by the summarization and refinement core. A host
/// frontend is expected to deserialize this from whatever configuration
/// source it uses; no parsing lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Strategy kinds the driver instantiates, in configuration order.
    pub strategies: Vec<StrategyKind>,
    /// Unrolling depth used when a naive unrolling summary is first built.
    pub max_unrolling_bound: u32,
    /// Hard cap on fixpoint sweeps; guarantees driver termination.
    pub max_iterations: u32,
    /// Dependency policy applied while the CFG is rewritten.
    pub construction_policy: DependencyKind,
    /// Dependency policy applied at exploration time by the edge filter.
    /// Configured independently of the construction policy.
    pub transfer_policy: DependencyKind,
    /// Whether the deterministic-execution strategy may invoke an external
    /// compiler. Off by default; with it off the strategy never applies.
    pub allow_external_compiler: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategyKind::ConstantExtrapolation,
                StrategyKind::NondetBoundConstantExtrapolation,
                StrategyKind::LoopAcceleration,
                StrategyKind::Havoc,
                StrategyKind::NaiveUnrolling,
            ],
            max_unrolling_bound: 10,
            max_iterations: 10,
            construction_policy: DependencyKind::default(),
            transfer_policy: DependencyKind::default(),
            allow_external_compiler: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recognized_options() {
        let config = SummaryConfig::default();
        assert_eq!(config.max_unrolling_bound, 10);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.construction_policy, DependencyKind::Base);
        assert_eq!(config.strategies.len(), 5);
        assert!(!config.allow_external_compiler);
    }
}
