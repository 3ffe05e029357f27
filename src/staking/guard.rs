use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, StakingError};

/// Rejects a mutating operation while another one is in progress.
#[derive(Clone, Debug, Default)]
pub struct ReentrancyGuard {
    entered: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the guarded section. The section is left when the returned
    /// token is dropped.
    pub fn acquire(&self) -> Result<GuardToken> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| StakingError::Reentrancy)?;
        Ok(GuardToken {
            entered: Arc::clone(&self.entered),
        })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct GuardToken {
    entered: Arc<AtomicBool>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);
    }
}
