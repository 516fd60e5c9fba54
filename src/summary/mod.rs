pub mod dependency;
pub mod driver;
pub mod filter;
pub mod registry;
pub mod strategy;

pub use dependency::{DependencyKind, StrategyDependency};
pub use driver::SummarizationDriver;
pub use filter::EdgeFilter;
pub use registry::{GhostId, StrategyRegistry};
pub use strategy::{GhostSubgraph, Strategy, StrategyKind, StrategyQualifier};
