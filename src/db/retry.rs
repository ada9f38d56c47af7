//! Bounded transaction retry with linear backoff.
//!
//! Every mutating engine operation runs through [`TxRetryExecutor::run`]:
//! the unit of work executes against a fresh [`StoreSession`], commits on
//! success, and rolls back on failure. Transient storage failures are
//! retried with delay `base_delay * attempt_number` up to `max_retries`;
//! the attempt count is loop state, not call-stack depth. Non-transient
//! failures propagate immediately.

use futures_util::future::BoxFuture;
use log::{debug, warn};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

use super::repository::{OlympiadStore, StoreError, StoreSession};

/// Classifies an error as retryable or terminal.
///
/// Engine error types implement this by delegating to the transiency of
/// their underlying [`StoreError`], keeping domain failures (validation,
/// missing entities) out of the retry loop.
pub trait TransientError {
    fn is_transient(&self) -> bool;
}

impl TransientError for StoreError {
    fn is_transient(&self) -> bool {
        StoreError::is_transient(self)
    }
}

/// Retry budget and backoff base
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Backoff base; attempt `n` sleeps `base_delay * n` before retrying
    pub base_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Outcome of a retried unit of work that did not succeed
#[derive(Debug)]
pub enum RetryError<E> {
    /// The retry budget was exhausted by transient failures; carries the
    /// total attempt count and the last cause
    Exhausted { attempts: u32, source: E },
    /// A non-transient failure ended the unit of work without retry
    Aborted(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, source } => {
                write!(f, "transaction failed after {attempts} attempts: {source}")
            }
            RetryError::Aborted(source) => write!(f, "{source}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Runs units of work under an atomic scope with bounded retry
#[derive(Debug, Clone, Default)]
pub struct TxRetryExecutor {
    options: RetryOptions,
}

impl TxRetryExecutor {
    /// Create an executor with an explicit retry budget
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Create an executor with the default budget (3 retries, 100ms base)
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Execute `op` inside a fresh session, committing on success.
    ///
    /// On failure the session is rolled back. Transient failures are
    /// retried with linear backoff until the budget is exhausted, which
    /// yields [`RetryError::Exhausted`] carrying the attempt count and the
    /// root cause. Non-transient failures yield [`RetryError::Aborted`]
    /// without retry.
    pub async fn run<T, E, F>(
        &self,
        store: &dyn OlympiadStore,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        T: Send,
        E: TransientError + From<StoreError> + fmt::Display + Send,
        F: for<'a> Fn(&'a mut (dyn StoreSession + 'a)) -> BoxFuture<'a, Result<T, E>>
            + Send
            + Sync,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(store, &op).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("transaction succeeded on attempt {attempt}");
                    }
                    return Ok(value);
                }
                Err(source) if source.is_transient() => {
                    if attempt > self.options.max_retries {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            source,
                        });
                    }
                    let delay = self.options.base_delay * attempt;
                    warn!(
                        "transient storage failure on attempt {attempt}, retrying in {delay:?}: {source}"
                    );
                    sleep(delay).await;
                }
                Err(source) => return Err(RetryError::Aborted(source)),
            }
        }
    }

    /// Execute `op` against an already-open session.
    ///
    /// Performs no retry and no commit; both belong to the outer scope that
    /// opened the session.
    pub async fn run_in<'a, T, E>(
        session: &'a mut (dyn StoreSession + 'a),
        op: impl FnOnce(&'a mut (dyn StoreSession + 'a)) -> BoxFuture<'a, Result<T, E>>,
    ) -> Result<T, E> {
        op(session).await
    }

    async fn attempt<T, E, F>(&self, store: &dyn OlympiadStore, op: &F) -> Result<T, E>
    where
        E: From<StoreError> + fmt::Display,
        F: for<'a> Fn(&'a mut (dyn StoreSession + 'a)) -> BoxFuture<'a, Result<T, E>>,
    {
        let mut session = store.begin().await.map_err(E::from)?;
        match op(session.as_mut()).await {
            Ok(value) => session.commit().await.map(|()| value).map_err(E::from),
            Err(error) => {
                if let Err(rb) = session.rollback().await {
                    warn!("rollback failed: {rb}");
                }
                Err(error)
            }
        }
    }
}
