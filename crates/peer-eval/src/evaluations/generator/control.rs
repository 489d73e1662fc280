use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reasons a generation run stops before producing a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation deadline exceeded")]
    DeadlineExceeded,
    #[error("generation cancelled")]
    Cancelled,
}

/// Caller-owned deadline and cancel flag for one run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RunControl {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Shared flag; storing `true` cancels every clone of this control.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn check(&self) -> Result<(), GenerationError> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(GenerationError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(GenerationError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let control = RunControl::unbounded();
        let observer = control.clone();
        assert_eq!(observer.check(), Ok(()));
        control.cancel_flag().store(true, Ordering::Release);
        assert_eq!(observer.check(), Err(GenerationError::Cancelled));
    }

    #[test]
    fn elapsed_deadline_is_reported() {
        let control = RunControl::with_deadline(Instant::now());
        assert_eq!(control.check(), Err(GenerationError::DeadlineExceeded));
        assert_eq!(control.remaining(), Some(Duration::ZERO));
    }
}
