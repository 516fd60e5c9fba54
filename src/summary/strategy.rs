use crate::WispError;
use crate::cfg::{ControlFlowGraph, EdgeId, LoopInfo, NodeId};
use crate::config::SummaryConfig;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// How a summary relates to the concrete behavior of the loop it replaces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum StrategyQualifier {
    OverApproximating,
    Underapproximating,
    Precise,
}

impl StrategyQualifier {
    pub fn opposite(&self) -> StrategyQualifier {
        match self {
            StrategyQualifier::OverApproximating => StrategyQualifier::Underapproximating,
            StrategyQualifier::Underapproximating => StrategyQualifier::OverApproximating,
            StrategyQualifier::Precise => StrategyQualifier::Precise,
        }
    }
}

/// The closed set of loop abstraction strategies.
///
/// Kept as a plain enum rather than one type per strategy so that the
/// qualifier table, the factory and every dispatch site match exhaustively;
/// adding a kind without deciding its behavior everywhere is a compile error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    LoopAcceleration,
    NaiveUnrolling,
    ConstantExtrapolation,
    LinearExtrapolation,
    NondetBoundConstantExtrapolation,
    Havoc,
    DeterministicExecution,
    ConcolicExecution,
    RecursionExtrapolation,
}

impl StrategyKind {
    pub fn qualifier(&self) -> StrategyQualifier {
        use StrategyQualifier::*;
        match self {
            StrategyKind::LoopAcceleration => OverApproximating,
            StrategyKind::NaiveUnrolling => Underapproximating,
            StrategyKind::ConstantExtrapolation => OverApproximating,
            StrategyKind::LinearExtrapolation => OverApproximating,
            StrategyKind::NondetBoundConstantExtrapolation => Underapproximating,
            StrategyKind::Havoc => OverApproximating,
            StrategyKind::DeterministicExecution => Precise,
            StrategyKind::ConcolicExecution => Underapproximating,
            StrategyKind::RecursionExtrapolation => OverApproximating,
        }
    }

    /// Fixed priority used by ordering policies. Lower is better.
    pub fn priority(&self) -> u8 {
        match self {
            StrategyKind::DeterministicExecution => 0,
            StrategyKind::LoopAcceleration => 1,
            StrategyKind::ConstantExtrapolation => 2,
            StrategyKind::LinearExtrapolation => 3,
            StrategyKind::NondetBoundConstantExtrapolation => 4,
            StrategyKind::ConcolicExecution => 5,
            StrategyKind::NaiveUnrolling => 6,
            StrategyKind::Havoc => 7,
            StrategyKind::RecursionExtrapolation => 8,
        }
    }

    /// Strategies whose summarization involves real code generation or an
    /// external toolchain; throttling policies gate these.
    pub fn is_expensive(&self) -> bool {
        matches!(
            self,
            StrategyKind::DeterministicExecution | StrategyKind::ConcolicExecution
        )
    }
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StrategyKind::LoopAcceleration => "loop-acceleration",
            StrategyKind::NaiveUnrolling => "naive-unrolling",
            StrategyKind::ConstantExtrapolation => "constant-extrapolation",
            StrategyKind::LinearExtrapolation => "linear-extrapolation",
            StrategyKind::NondetBoundConstantExtrapolation => "nondet-bound-constant-extrapolation",
            StrategyKind::Havoc => "havoc",
            StrategyKind::DeterministicExecution => "deterministic-execution",
            StrategyKind::ConcolicExecution => "concolic-execution",
            StrategyKind::RecursionExtrapolation => "recursion-extrapolation",
        };
        f.write_str(name)
    }
}

/// A concrete value installed by refinement-time parameter stepping.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParamValue {
    Scalar(i64),
    Bound(u32),
}

const UNROLL_CANDIDATES: [u32; 5] = [0, 1, 2, 3, 4];

fn scalar_max(width: u32) -> i64 {
    ((1i128 << (width - 1)) - 1) as i64
}

fn scalar_min(width: u32) -> i64 {
    (-(1i128 << (width - 1))) as i64
}

/// Parameter state of a ghost subgraph: the current concrete value plus the
/// append-only history of values already tried. Mutated only through
/// [`advance`](ParamState::advance), which the registry exposes as the single
/// designated update operation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ParamState {
    Unparameterized,
    NondetValue {
        width: u32,
        current: Option<i64>,
        tried: Vec<i64>,
    },
    UnrollBound {
        current: u32,
        tried: Vec<u32>,
    },
}

impl ParamState {
    /// Advance to the next untried value from the kind's fixed candidate
    /// domain: `{0, 1, -1, max, min}` for scalar replacement, `{0..=4}` for
    /// unrolling bounds. Returns the installed value, or `None` when the
    /// domain is exhausted (or there are no parameters to step).
    pub(crate) fn advance(&mut self) -> Option<ParamValue> {
        match self {
            ParamState::Unparameterized => None,
            ParamState::NondetValue {
                width,
                current,
                tried,
            } => {
                let candidates = [0, 1, -1, scalar_max(*width), scalar_min(*width)];
                let next = candidates.into_iter().find(|v| !tried.contains(v))?;
                tried.push(next);
                *current = Some(next);
                Some(ParamValue::Scalar(next))
            }
            ParamState::UnrollBound { current, tried } => {
                let next = UNROLL_CANDIDATES.into_iter().find(|v| !tried.contains(v))?;
                tried.push(next);
                *current = next;
                Some(ParamValue::Bound(next))
            }
        }
    }

    pub fn tried_count(&self) -> usize {
        match self {
            ParamState::Unparameterized => 0,
            ParamState::NondetValue { tried, .. } => tried.len(),
            ParamState::UnrollBound { tried, .. } => tried.len(),
        }
    }
}

/// An immutable summary fragment with one-shot wiring into the host graph.
///
/// The ghost region is the fresh entry/exit boundary (what the strategy's code
/// generation fills in between them is outside this crate); the connectors are
/// the edges leading from the original region into the ghost region, assigned
/// at most once by [`connect`](GhostSubgraph::connect).
#[derive(Debug, Clone)]
pub struct GhostSubgraph {
    kind: StrategyKind,
    entry: NodeId,
    exit: NodeId,
    original_entry: NodeId,
    original_exit: NodeId,
    entry_connector: Option<EdgeId>,
    exit_connector: Option<EdgeId>,
    params: ParamState,
}

impl GhostSubgraph {
    pub(crate) fn new(
        kind: StrategyKind,
        entry: NodeId,
        exit: NodeId,
        original_entry: NodeId,
        original_exit: NodeId,
        params: ParamState,
    ) -> Self {
        Self {
            kind,
            entry,
            exit,
            original_entry,
            original_exit,
            entry_connector: None,
            exit_connector: None,
            params,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn qualifier(&self) -> StrategyQualifier {
        self.kind.qualifier()
    }

    pub fn is_precise(&self) -> bool {
        self.qualifier() == StrategyQualifier::Precise
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn original_entry(&self) -> NodeId {
        self.original_entry
    }

    pub fn original_exit(&self) -> NodeId {
        self.original_exit
    }

    pub fn is_connected(&self) -> bool {
        self.entry_connector.is_some() && self.exit_connector.is_some()
    }

    pub fn params(&self) -> &ParamState {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut ParamState {
        &mut self.params
    }

    /// Splice the ghost region into the host graph: insert the boundary nodes
    /// and the interior edge, then wire the entry and exit connectors from the
    /// original region into the ghost region. A second call is a no-op as long
    /// as the previously wired endpoints still match; anything else is a
    /// contract violation.
    pub fn connect(&mut self, cfg: &mut ControlFlowGraph) -> Result<(), WispError> {
        match (self.entry_connector, self.exit_connector) {
            (Some(e_in), Some(e_out)) => {
                let entry_ok =
                    cfg.edge_endpoints(e_in) == Some((self.original_entry, self.entry));
                let exit_ok = cfg.edge_endpoints(e_out) == Some((self.original_exit, self.exit));
                if entry_ok && exit_ok {
                    Ok(())
                } else {
                    Err(WispError::ConnectorMismatch { kind: self.kind })
                }
            }
            (None, None) => {
                cfg.insert(self.entry);
                cfg.insert(self.exit);
                cfg.add_edge(self.entry, self.exit);
                self.entry_connector = Some(cfg.add_edge(self.original_entry, self.entry));
                self.exit_connector = Some(cfg.add_edge(self.original_exit, self.exit));
                Ok(())
            }
            _ => Err(WispError::ConnectorMismatch { kind: self.kind }),
        }
    }
}

/// A configured strategy instance: consumes a loop header, produces at most
/// one [`GhostSubgraph`].
#[derive(Debug, Clone)]
pub struct Strategy {
    kind: StrategyKind,
    unroll_bound: u32,
    allow_external_compiler: bool,
}

impl Strategy {
    /// Exhaustive factory: every kind decides its configuration here.
    pub fn new(kind: StrategyKind, config: &SummaryConfig) -> Self {
        let unroll_bound = match kind {
            StrategyKind::NaiveUnrolling => config.max_unrolling_bound,
            StrategyKind::LoopAcceleration
            | StrategyKind::ConstantExtrapolation
            | StrategyKind::LinearExtrapolation
            | StrategyKind::NondetBoundConstantExtrapolation
            | StrategyKind::Havoc
            | StrategyKind::DeterministicExecution
            | StrategyKind::ConcolicExecution
            | StrategyKind::RecursionExtrapolation => 0,
        };
        Self {
            kind,
            unroll_bound,
            allow_external_compiler: config.allow_external_compiler,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn qualifier(&self) -> StrategyQualifier {
        self.kind.qualifier()
    }

    /// Whether this strategy can summarize the loop at all, judged from the
    /// loop's shape.
    fn applies(&self, info: &LoopInfo, cfg: &ControlFlowGraph) -> bool {
        if info.recursive {
            return self.kind == StrategyKind::RecursionExtrapolation;
        }
        let single_latch = || {
            cfg.predecessors(info.header)
                .iter()
                .filter(|p| info.body.contains(p))
                .count()
                == 1
        };
        let no_nested_loops = || {
            !info
                .body
                .iter()
                .any(|n| *n != info.header && cfg.loop_at(*n).is_some())
        };
        match self.kind {
            StrategyKind::RecursionExtrapolation => false,
            StrategyKind::NaiveUnrolling | StrategyKind::Havoc | StrategyKind::ConcolicExecution => {
                true
            }
            StrategyKind::LoopAcceleration => single_latch(),
            StrategyKind::ConstantExtrapolation
            | StrategyKind::LinearExtrapolation
            | StrategyKind::NondetBoundConstantExtrapolation => no_nested_loops(),
            StrategyKind::DeterministicExecution => self.allow_external_compiler && single_latch(),
        }
    }

    fn initial_params(&self, info: &LoopInfo) -> Result<ParamState, WispError> {
        match self.kind {
            StrategyKind::NondetBoundConstantExtrapolation => {
                let width = info.bound_width.unwrap_or(64);
                if !matches!(width, 8 | 16 | 32 | 64) {
                    return Err(WispError::UnsupportedParameterShape { width });
                }
                Ok(ParamState::NondetValue {
                    width,
                    current: Some(0),
                    tried: vec![0],
                })
            }
            StrategyKind::NaiveUnrolling => Ok(ParamState::UnrollBound {
                current: self.unroll_bound,
                tried: vec![self.unroll_bound],
            }),
            _ => Ok(ParamState::Unparameterized),
        }
    }

    /// Try to summarize the loop headed at `node`.
    ///
    /// `Ok(None)` means the strategy does not apply here (not a loop header,
    /// unsupported shape, no exit back into the original region). On success
    /// the returned ghost boundary nodes are reserved in `cfg` but not yet
    /// part of the graph; the driver splices them in after the sweep.
    pub fn summarize(
        &self,
        node: NodeId,
        cfg: &mut ControlFlowGraph,
    ) -> Result<Option<GhostSubgraph>, WispError> {
        let Some(info) = cfg.loop_at(node) else {
            return Ok(None);
        };
        let info = info.clone();
        if !self.applies(&info, cfg) {
            return Ok(None);
        }
        let Some(original_exit) = cfg
            .successors(node)
            .into_iter()
            .find(|s| !info.body.contains(s))
        else {
            return Ok(None);
        };
        let params = self.initial_params(&info)?;
        let Some(function) = cfg.owner_of(node) else {
            return Ok(None);
        };
        let entry = cfg.reserve_node(function);
        let exit = cfg.reserve_node(function);
        Ok(Some(GhostSubgraph::new(
            self.kind,
            entry,
            exit,
            node,
            original_exit,
            params,
        )))
    }
}
