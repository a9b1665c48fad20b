//! Caller-imposed cancellation for facade calls.
//!
//! The engine has no timeouts of its own. A [`CancelHandle`] combines a shared
//! flag with an optional wall-clock deadline and is checked before every
//! provider call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, SchedulingError};

#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelHandle {
    /// A handle that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that also fires once `deadline` passes.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Fire the handle. All clones observe it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// # Errors
    /// `SchedulingError::Cancelled` once the handle has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(SchedulingError::Cancelled);
        }
        Ok(())
    }
}
