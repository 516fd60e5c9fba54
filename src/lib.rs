pub mod arg;
pub mod cfg;
mod config;
mod error;
mod interrupt;
pub mod refine;
pub mod stats;
pub mod summary;

pub use config::SummaryConfig;
pub use error::WispError;
pub use interrupt::Interrupt;
