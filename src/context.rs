//! Governing context for scans.
//!
//! A [`ScanContext`] is a cancellable scope with an optional deadline. Every
//! probe in a scan shares one context; the connector derives a short-lived
//! [`SubContext`] per attempt whose deadline is the per-probe timeout.

use crate::error::{Result, ScanError};
use std::future::Future;
use std::ops::Deref;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellable, optionally deadline-bearing operation scope.
///
/// Clones share cancellation state: cancelling any clone cancels all of
/// them, and every context derived from them.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ScanContext {
    /// A context that only ends when cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that ends `timeout` from now.
    ///
    /// A timeout too large to represent as an instant never expires.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the context has ended, or `None` while it is still live.
    pub fn err(&self) -> Option<ScanError> {
        if self.token.is_cancelled() {
            Some(ScanError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ScanError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ScanError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => ScanError::Cancelled,
                _ = sleep_until(deadline) => ScanError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ScanError::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context ends first.
    ///
    /// A context that has already ended never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// Derive a child scope ending after `timeout` or when `self` ends,
    /// whichever comes first.
    ///
    /// The child is released (its token cancelled) when the returned
    /// [`SubContext`] is dropped, so it never outlives the caller's frame.
    pub fn child_with_timeout(&self, timeout: Duration) -> SubContext {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, None) => parent,
            (None, own) => own,
        };
        let token = self.token.child_token();
        let release = token.clone().drop_guard();

        SubContext {
            ctx: ScanContext { token, deadline },
            _release: release,
        }
    }
}

/// A scoped child context, released on drop.
#[derive(Debug)]
pub struct SubContext {
    ctx: ScanContext,
    _release: DropGuard,
}

impl Deref for SubContext {
    type Target = ScanContext;

    fn deref(&self) -> &ScanContext {
        &self.ctx
    }
}
