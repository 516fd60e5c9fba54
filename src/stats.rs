use crate::summary::registry::StrategyRegistry;
use crate::summary::strategy::StrategyKind;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Human-readable run statistics: ghost subgraphs produced per strategy kind
/// and refiner escalations from primary to secondary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryStatistics {
    pub ghosts_per_kind: BTreeMap<StrategyKind, usize>,
    pub refiner_escalations: usize,
}

impl SummaryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_from(&mut self, registry: &StrategyRegistry) {
        self.ghosts_per_kind = registry.produced_counts().clone();
    }

    pub fn total_ghosts(&self) -> usize {
        self.ghosts_per_kind.values().sum()
    }
}

impl Display for SummaryStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Ghost subgraphs produced: {}", self.total_ghosts())?;
        for (kind, count) in &self.ghosts_per_kind {
            writeln!(f, "  {kind}: {count}")?;
        }
        writeln!(
            f,
            "Refiner escalations to secondary: {}",
            self.refiner_escalations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{ControlFlowGraph, LoopInfo};
    use crate::config::SummaryConfig;
    use crate::summary::strategy::Strategy;

    #[test]
    fn record_from_mirrors_registry_counts() {
        let mut cfg = ControlFlowGraph::new();
        let f = cfg.add_function();
        let entry = cfg.add_node(f);
        let header = cfg.add_node(f);
        let after = cfg.add_node(f);
        cfg.add_edge(entry, header);
        cfg.add_edge(header, header);
        cfg.add_edge(header, after);
        cfg.set_entry(f, entry);
        cfg.set_loop(LoopInfo::new(header, [header]));

        let mut registry = StrategyRegistry::new();
        let ghost = Strategy::new(StrategyKind::Havoc, &SummaryConfig::default())
            .summarize(header, &mut cfg)
            .unwrap()
            .unwrap();
        registry.add_ghost(ghost).unwrap();

        let mut stats = SummaryStatistics::new();
        stats.record_from(&registry);
        assert_eq!(stats.total_ghosts(), 1);
        assert_eq!(stats.ghosts_per_kind[&StrategyKind::Havoc], 1);
    }

    #[test]
    fn report_lists_per_kind_counts() {
        let mut stats = SummaryStatistics::new();
        stats.ghosts_per_kind.insert(StrategyKind::Havoc, 2);
        stats
            .ghosts_per_kind
            .insert(StrategyKind::NaiveUnrolling, 1);
        stats.refiner_escalations = 3;
        let report = stats.to_string();
        assert!(report.contains("Ghost subgraphs produced: 3"));
        assert!(report.contains("havoc: 2"));
        assert!(report.contains("naive-unrolling: 1"));
        assert!(report.contains("escalations to secondary: 3"));
    }
}
