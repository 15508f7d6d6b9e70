use std::{future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation scope for a single operation: a [`CancellationToken`]
/// composed with an optional deadline, whichever trips first.
///
/// Contexts are cheap to clone and only ever narrow: deriving a context
/// with [`with_timeout`][Self::with_timeout] or
/// [`with_deadline`][Self::with_deadline] keeps the earlier of the two
/// deadlines, so a caller's budget can never be extended downstream.
#[derive(Debug, Clone)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A context that never cancels.
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Narrows the deadline to at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Narrows the deadline; an existing earlier deadline wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };

        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the token fires or the deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => (),
                () = tokio::time::sleep_until(deadline) => (),
            },
            None => self.token.cancelled().await,
        }
    }

    /// Runs `fut` to completion unless this context cancels first, in
    /// which case `fut` is dropped and `None` is returned.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            result = fut => Some(result),
            () = self.cancelled() => None,
        }
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::unbounded()
    }
}
