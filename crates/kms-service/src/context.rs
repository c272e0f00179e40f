//! # Request Context
//!
//! Every public service operation takes a [`RequestContext`] carrying an
//! optional deadline and an optional [`CancellationToken`]. The service
//! calls [`RequestContext::check`] before each storage lookup and bounds
//! its wait on the per-pool lock by the deadline. Cryptographic transforms,
//! once started, run to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kms_core::KmsError;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every request holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Per-request deadline and cancellation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl RequestContext {
    /// No deadline, no cancellation.
    pub fn background() -> Self {
        Self::default()
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Apply `timeout` only if no deadline is set yet.
    pub fn or_timeout(self, timeout: Option<Duration>) -> Self {
        match (self.deadline, timeout) {
            (None, Some(timeout)) => self.with_timeout(timeout),
            _ => self,
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the attached token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail if the request was cancelled or its deadline has passed.
    /// Cancellation is reported ahead of an expired deadline.
    pub fn check(&self, stage: &'static str) -> Result<(), KmsError> {
        if self.is_cancelled() {
            return Err(KmsError::Cancelled { stage });
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(KmsError::DeadlineExceeded { stage })
            }
            _ => Ok(()),
        }
    }
}
