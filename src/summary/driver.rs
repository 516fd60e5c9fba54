use crate::WispError;
use crate::cfg::{ControlFlowGraph, NodeId};
use crate::config::SummaryConfig;
use crate::interrupt::Interrupt;
use crate::summary::dependency::StrategyDependency;
use crate::summary::registry::StrategyRegistry;
use crate::summary::strategy::{GhostSubgraph, Strategy};
use std::collections::{HashSet, VecDeque};

/// Fixpoint worklist algorithm that rewrites the CFG before exploration
/// begins: repeated breadth-first sweeps offer every eligible strategy each
/// reachable node, buffer the resulting summaries, and splice them in at the
/// sweep boundary.
///
/// Splicing is all-or-nothing per subgraph: a cancellation mid-sweep leaves
/// only unwired pending buffers behind, which are discarded, so the CFG stands
/// as it did before the sweep.
pub struct SummarizationDriver {
    strategies: Vec<Strategy>,
    policy: Box<dyn StrategyDependency>,
    max_iterations: u32,
    interrupt: Interrupt,
}

impl SummarizationDriver {
    pub fn new(
        strategies: Vec<Strategy>,
        policy: Box<dyn StrategyDependency>,
        max_iterations: u32,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            strategies,
            policy,
            max_iterations,
            interrupt,
        }
    }

    pub fn from_config(config: &SummaryConfig, interrupt: Interrupt) -> Self {
        let strategies = config
            .strategies
            .iter()
            .map(|kind| Strategy::new(*kind, config))
            .collect();
        Self::new(
            strategies,
            config.construction_policy.build(),
            config.max_iterations,
            interrupt,
        )
    }

    /// Run sweeps until the policy stops the post-processing or the hard
    /// iteration cap is reached. Returns the number of sweeps executed.
    pub fn run(
        &self,
        cfg: &mut ControlFlowGraph,
        registry: &mut StrategyRegistry,
    ) -> Result<u32, WispError> {
        let mut iteration = 1;
        loop {
            self.interrupt.check()?;
            let changed = self.sweep(iteration, cfg, registry)?;
            tracing::debug!(iteration, changed, "summarization sweep finished");
            if self.policy.stop_post_processing(iteration, changed) {
                break;
            }
            if iteration >= self.max_iterations {
                break;
            }
            iteration += 1;
        }
        Ok(iteration)
    }

    /// One full breadth-first sweep from the function entries. Successful
    /// summaries are buffered and only spliced once the worklist is
    /// exhausted, so a sweep observes the graph as it stood when the sweep
    /// started.
    fn sweep(
        &self,
        iteration: u32,
        cfg: &mut ControlFlowGraph,
        registry: &mut StrategyRegistry,
    ) -> Result<bool, WispError> {
        let mut pending: Vec<GhostSubgraph> = Vec::new();
        let mut visited: HashSet<NodeId> = cfg.entries().collect();
        let mut worklist: VecDeque<NodeId> = cfg.entries().collect();
        let mut changed = false;
        while let Some(node) = worklist.pop_front() {
            self.interrupt.check()?;
            for strategy in &self.strategies {
                if !self.policy.is_eligible(strategy.kind(), iteration) {
                    continue;
                }
                if let Some(ghost) = strategy.summarize(node, cfg)? {
                    // one tag per node: reject before buffering
                    let taken = registry.tag_of(node).is_some()
                        || pending.iter().any(|g| g.original_entry() == node);
                    if taken {
                        tracing::debug!(
                            "dropping {} summary at {node}: header already has a summary",
                            ghost.kind()
                        );
                        continue;
                    }
                    tracing::debug!("buffered {} summary at {node}", ghost.kind());
                    pending.push(ghost);
                    changed = true;
                }
            }
            for succ in cfg.successors(node) {
                if visited.insert(succ) {
                    worklist.push_back(succ);
                }
            }
        }
        for mut ghost in pending {
            ghost.connect(cfg)?;
            registry.assign(ghost.original_entry(), ghost.kind())?;
            registry.add_ghost(ghost)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::LoopInfo;
    use crate::summary::dependency::DependencyKind;
    use crate::summary::strategy::StrategyKind;

    /// Stop rule from above, identity otherwise.
    struct StopAt(u32);

    impl StrategyDependency for StopAt {
        fn is_eligible(&self, _kind: StrategyKind, _iteration: u32) -> bool {
            true
        }

        fn filter(&self, candidates: &[StrategyKind]) -> Vec<StrategyKind> {
            candidates.to_vec()
        }

        fn stop_post_processing(&self, iteration: u32, _changed: bool) -> bool {
            iteration >= self.0
        }
    }

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

    fn havoc_only() -> Vec<Strategy> {
        vec![Strategy::new(StrategyKind::Havoc, &SummaryConfig::default())]
    }

    #[test]
    fn stop_rule_yields_exactly_three_sweeps_and_one_tag() {
        let (mut cfg, header) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        let driver =
            SummarizationDriver::new(havoc_only(), Box::new(StopAt(3)), 10, Interrupt::new());
        let sweeps = driver.run(&mut cfg, &mut registry).unwrap();
        assert_eq!(sweeps, 3);
        // the always-succeeding strategy got through only once
        assert_eq!(registry.ghost_count(), 1);
        assert_eq!(registry.tag_of(header), Some(StrategyKind::Havoc));
    }

    #[test]
    fn hard_cap_bounds_sweep_count() {
        let (mut cfg, _) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        // base policy never stops early; the cap must
        let driver = SummarizationDriver::new(
            havoc_only(),
            DependencyKind::Base.build(),
            4,
            Interrupt::new(),
        );
        let sweeps = driver.run(&mut cfg, &mut registry).unwrap();
        assert_eq!(sweeps, 4);
        assert_eq!(registry.ghost_count(), 1);
    }

    #[test]
    fn spliced_ghost_is_wired_and_registered() {
        let (mut cfg, header) = looped_cfg();
        let nodes_before = cfg.node_count();
        let mut registry = StrategyRegistry::new();
        let driver = SummarizationDriver::new(
            havoc_only(),
            DependencyKind::Arbitrating.build(),
            10,
            Interrupt::new(),
        );
        driver.run(&mut cfg, &mut registry).unwrap();
        assert_eq!(cfg.node_count(), nodes_before + 2);
        let id = registry.ghosts_at(header)[0];
        let ghost = registry.ghost(id).unwrap();
        assert!(ghost.is_connected());
        assert!(cfg.successors(header).contains(&ghost.entry()));
        assert_eq!(registry.tag_of(ghost.entry()), Some(StrategyKind::Havoc));
    }

    #[test]
    fn arbitrating_policy_stops_after_quiet_round() {
        let (mut cfg, _) = looped_cfg();
        let mut registry = StrategyRegistry::new();
        let driver = SummarizationDriver::new(
            havoc_only(),
            DependencyKind::Arbitrating.build(),
            10,
            Interrupt::new(),
        );
        // sweep 1 makes progress, sweep 2 does not and stops the driver
        let sweeps = driver.run(&mut cfg, &mut registry).unwrap();
        assert_eq!(sweeps, 2);
    }

    #[test]
    fn tripped_interrupt_aborts_without_splicing() {
        let (mut cfg, header) = looped_cfg();
        let edges_before = cfg.edge_count();
        let mut registry = StrategyRegistry::new();
        let interrupt = Interrupt::new();
        interrupt.trip();
        let driver = SummarizationDriver::new(
            havoc_only(),
            DependencyKind::Base.build(),
            10,
            interrupt,
        );
        let err = driver.run(&mut cfg, &mut registry).unwrap_err();
        assert!(matches!(err, WispError::Interrupted));
        assert_eq!(cfg.edge_count(), edges_before);
        assert_eq!(registry.ghost_count(), 0);
        assert_eq!(registry.tag_of(header), None);
    }
}
