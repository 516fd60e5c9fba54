use crate::WispError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative shutdown signal.
///
/// The summarization driver polls this at every node visit and sweep boundary;
/// refiners poll it at every backward-walk step. Tripping the flag makes the
/// in-flight operation abort with [`WispError::Interrupted`] instead of
/// returning a partial result.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), WispError> {
        if self.is_tripped() {
            Err(WispError::Interrupted)
        } else {
            Ok(())
        }
    }
}
