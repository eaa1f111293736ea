use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::DeadlineExceeded;

/// Point in time by which an operation must complete.
///
/// A deadline is created once per inbound call and shared by every external
/// call made on its behalf, so the budget shrinks as the call progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// Deadline at `at`.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Instant the deadline expires.
    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Runs `fut`, abandoning it when the deadline passes.
    pub async fn within<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| DeadlineExceeded)
    }

    /// Runs a fallible call, folding expiry into its error type.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<DeadlineExceeded>,
    {
        match self.within(fut).await {
            Ok(result) => result,
            Err(expired) => Err(expired.into()),
        }
    }
}
