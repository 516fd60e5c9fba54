use crate::cfg::NodeId;
use crate::summary::strategy::StrategyKind;
use thiserror::Error;

/// Fatal and control-flow errors surfaced by summarization and refinement.
///
/// "No strategy applies", "no admissible replacement" and similar absences are
/// deliberately *not* represented here; those are ordinary `Option`/verdict
/// values. An `Err` from this crate means either an internal contract was
/// violated (the run should abort with the diagnostic) or the operation was
/// cancelled cooperatively.
#[derive(Debug, Error)]
pub enum WispError {
    #[error("node {node:?} already carries strategy tag {existing:?}; refusing to assign {requested:?}")]
    DuplicateStrategyTag {
        node: NodeId,
        existing: StrategyKind,
        requested: StrategyKind,
    },
    #[error("ghost subgraph for {kind:?} is already wired to different endpoints")]
    ConnectorMismatch { kind: StrategyKind },
    #[error("cannot derive a parameter domain for a {width}-bit loop bound")]
    UnsupportedParameterShape { width: u32 },
    #[error("operation interrupted by a shutdown request")]
    Interrupted,
}
