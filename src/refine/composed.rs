use crate::WispError;
use crate::arg::SearchTree;
use crate::refine::{RefinementVerdict, Refiner};
use crate::summary::registry::StrategyRegistry;

/// Composing outer refiner alternating between a primary and a secondary
/// refiner.
///
/// The primary runs until it has succeeded `escalation_period` consecutive
/// times (or fails); then one secondary call is forced and the counter resets.
/// A failing secondary degrades gracefully: the primary's result is returned
/// in its place.
pub struct SummaryBasedRefiner {
    primary: Box<dyn Refiner>,
    secondary: Box<dyn Refiner>,
    escalation_period: usize,
    consecutive_successes: usize,
    escalations: usize,
}

impl SummaryBasedRefiner {
    pub fn new(
        primary: Box<dyn Refiner>,
        secondary: Box<dyn Refiner>,
        escalation_period: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            escalation_period: escalation_period.max(1),
            consecutive_successes: 0,
            escalations: 0,
        }
    }

    /// How often the secondary refiner was brought in.
    pub fn escalations(&self) -> usize {
        self.escalations
    }

    fn run_primary(
        &mut self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
    ) -> Result<RefinementVerdict, WispError> {
        let verdict = self.primary.perform_refinement(tree, registry)?;
        if verdict.refined() {
            self.consecutive_successes += 1;
        } else {
            self.consecutive_successes = 0;
        }
        Ok(verdict)
    }
}

impl Refiner for SummaryBasedRefiner {
    fn perform_refinement(
        &mut self,
        tree: &mut SearchTree,
        registry: &mut StrategyRegistry,
    ) -> Result<RefinementVerdict, WispError> {
        if self.consecutive_successes >= self.escalation_period {
            self.consecutive_successes = 0;
            self.escalations += 1;
            tracing::debug!("forcing secondary refiner after consecutive primary successes");
            match self.secondary.perform_refinement(tree, registry)? {
                RefinementVerdict::Refined => return Ok(RefinementVerdict::Refined),
                RefinementVerdict::Exhausted => return self.run_primary(tree, registry),
            }
        }
        match self.run_primary(tree, registry)? {
            RefinementVerdict::Refined => Ok(RefinementVerdict::Refined),
            RefinementVerdict::Exhausted => {
                self.escalations += 1;
                tracing::debug!("primary refiner exhausted, escalating to secondary");
                match self.secondary.perform_refinement(tree, registry)? {
                    RefinementVerdict::Refined => Ok(RefinementVerdict::Refined),
                    // the primary's result stands when the secondary fails too
                    RefinementVerdict::Exhausted => Ok(RefinementVerdict::Exhausted),
                }
            }
        }
    }
}
