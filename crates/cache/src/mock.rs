//! Scripted transaction for testing.

use crate::Transaction;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A call made against a [`MockTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Commit,
    Rollback,
}

/// A [`Transaction`] that records how it was settled and can be told to fail.
///
/// Clones share one journal, so keep a clone around to inspect the calls after
/// the original has been consumed by [`crate::finalize`].
///
/// # Examples
///
/// ```
/// use hoard_cache::{Call, Finalized, MockTransaction, finalize};
/// use hoard_cache::error::ErrorKind;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tx = MockTransaction::new().failing_rollback();
/// let outcome: Result<(), _> = Err(exn::Exn::from(ErrorKind::Database));
/// let (finalized, _) = finalize(tx.clone(), outcome).await;
/// assert_eq!(finalized, Finalized::RollbackFailed);
/// assert_eq!(tx.calls().await, vec![Call::Rollback]);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransaction {
    journal: Arc<Mutex<Vec<Call>>>,
    fail_commit: bool,
    fail_rollback: bool,
}

impl MockTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make [`Transaction::commit`] fail.
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Make [`Transaction::rollback`] fail.
    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Every settle attempt so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.journal.lock().await.clone()
    }

    async fn record(&self, call: Call, fail: bool) -> Result<()> {
        self.journal.lock().await.push(call);
        if fail {
            exn::bail!(ErrorKind::Database);
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self) -> Result<()> {
        self.record(Call::Commit, self.fail_commit).await
    }

    async fn rollback(self) -> Result<()> {
        self.record(Call::Rollback, self.fail_rollback).await
    }
}
