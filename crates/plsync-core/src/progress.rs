//! Progress reporting and cooperative cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

/// Progress callback receiving an overall percentage in `0..=100`.
pub type Progress = dyn Fn(u8) + Send + Sync;

pub(crate) fn report(progress: Option<&Progress>, percent: u8) {
    if let Some(callback) = progress {
        callback(percent.min(100));
    }
}

/// Blend progress of one step into an overall percentage when `total`
/// operation sets run back to back.
pub(crate) fn blend(index: usize, total: usize, step_percent: u8) -> u8 {
    if total == 0 {
        return 100;
    }
    let overall = (index * 100 + usize::from(step_percent.min(100))) / total;
    overall.min(100) as u8
}

/// Shared flag polled between files; clearing it stops work at the next
/// checkpoint with [`Error::Cancelled`].
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Make the flag live again for the next operation.
    pub fn rearm(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Checkpoint: `Err(Cancelled)` once the flag is cleared.
    pub fn check(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            tracing::info!("Operation cancelled at checkpoint");
            Err(Error::Cancelled)
        }
    }
}
