//! Transactional unit-of-work boundary.
//!
//! A unit of work ends in exactly one of two ways: its transaction commits
//! because the work succeeded, or it rolls back because the work failed. Both
//! ends report errors. A failed commit replaces the successful result, and a
//! failed rollback is attached alongside the error that triggered it, so
//! neither failure ever hides the other.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::{Exn, ResultExt};
use sqlx::Sqlite;
use std::error::Error as StdError;
use std::ops::AsyncFnOnce;

/// Anything that can be committed or rolled back exactly once.
#[async_trait]
pub trait Transaction: Send {
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}

#[async_trait]
impl<'c> Transaction for sqlx::Transaction<'c, Sqlite> {
    async fn commit(self) -> Result<()> {
        sqlx::Transaction::commit(self).await.or_raise(|| ErrorKind::Database)
    }

    async fn rollback(self) -> Result<()> {
        sqlx::Transaction::rollback(self).await.or_raise(|| ErrorKind::Database)
    }
}

/// How [`finalize`] settled a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalized {
    Committed,
    CommitFailed,
    RolledBack,
    RollbackFailed,
}

/// Settle `tx` according to `outcome`.
///
/// - `Ok` commits. If the commit fails, the result becomes
///   [`ErrorKind::Commit`] (converted into the caller's kind).
/// - `Err` rolls back and hands the error back untouched. If the rollback
///   fails too, the result becomes [`ErrorKind::RollbackFailed`] with the
///   original error and the rollback error as its two children.
///
/// Generic over the caller's error kind so that a rolled-back failure keeps
/// its meaning (a rejected upload stays a rejection).
pub async fn finalize<Tx, T, E>(tx: Tx, outcome: std::result::Result<T, Exn<E>>) -> (Finalized, std::result::Result<T, Exn<E>>)
where
    Tx: Transaction,
    E: From<ErrorKind> + StdError + Send + Sync + 'static,
{
    let (finalized, result) = match outcome {
        Ok(value) => match tx.commit().await {
            Ok(()) => (Finalized::Committed, Ok(value)),
            Err(err) => (Finalized::CommitFailed, Err(err.raise(E::from(ErrorKind::Commit)))),
        },
        Err(cause) => match tx.rollback().await {
            Ok(()) => (Finalized::RolledBack, Err(cause)),
            Err(err) => {
                let rollback = err.raise(E::from(ErrorKind::Rollback));
                let compound = Exn::raise_all(E::from(ErrorKind::RollbackFailed), [cause, rollback]);
                tracing::error!(error = ?compound, "transaction could not be rolled back");
                (Finalized::RollbackFailed, Err(compound))
            },
        },
    };
    tracing::debug!(?finalized, "transaction settled");
    (finalized, result)
}

/// Run `work` against `tx`, then [`finalize`] it.
///
/// The transaction is lent to the work and settled afterwards, so there is no
/// path through which it escapes unsettled.
///
/// # Examples
///
/// ```no_run
/// # async fn demo(db: hoard_cache::Database, upload: hoard_cache::NewUpload) -> hoard_cache::error::Result<()> {
/// use hoard_cache::{Repository, SqliteTransaction, unit_of_work};
///
/// let repo = Repository::from(&db);
/// let tx = db.begin().await?;
/// let _id = unit_of_work(tx, async |tx: &mut SqliteTransaction| repo.insert_upload(tx, &upload).await).await?;
/// # Ok(())
/// # }
/// ```
pub async fn unit_of_work<Tx, T, E, F>(mut tx: Tx, work: F) -> std::result::Result<T, Exn<E>>
where
    Tx: Transaction,
    E: From<ErrorKind> + StdError + Send + Sync + 'static,
    F: AsyncFnOnce(&mut Tx) -> std::result::Result<T, Exn<E>>,
{
    let outcome = work(&mut tx).await;
    let (_, result) = finalize(tx, outcome).await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockTransaction};
    use derive_more::{Display, Error};

    /// Stand-in for a caller's own error kind.
    #[derive(Debug, Display, Error, PartialEq, Eq)]
    enum CallerKind {
        #[display("work failed")]
        Work,
        #[display("{_0}")]
        Cache(#[error(not(source))] ErrorKind),
    }
    impl From<ErrorKind> for CallerKind {
        fn from(kind: ErrorKind) -> Self {
            Self::Cache(kind)
        }
    }

    fn failed<T>() -> std::result::Result<T, Exn<CallerKind>> {
        Err(Exn::from(CallerKind::Work))
    }

    #[tokio::test]
    async fn test_success_commits() {
        let tx = MockTransaction::new();
        let (finalized, result) = finalize(tx.clone(), Ok::<_, Exn<CallerKind>>(7)).await;
        assert_eq!(finalized, Finalized::Committed);
        assert_eq!(result.unwrap(), 7);
        assert_eq!(tx.calls().await, vec![Call::Commit]);
    }

    #[tokio::test]
    async fn test_commit_failure_replaces_success() {
        let tx = MockTransaction::new().failing_commit();
        let (finalized, result) = finalize(tx.clone(), Ok::<_, Exn<CallerKind>>(7)).await;
        assert_eq!(finalized, Finalized::CommitFailed);
        assert_eq!(*result.unwrap_err(), CallerKind::Cache(ErrorKind::Commit));
        assert_eq!(tx.calls().await, vec![Call::Commit]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_keeps_error() {
        let tx = MockTransaction::new();
        let (finalized, result) = finalize(tx.clone(), failed::<()>()).await;
        assert_eq!(finalized, Finalized::RolledBack);
        assert_eq!(*result.unwrap_err(), CallerKind::Work);
        assert_eq!(tx.calls().await, vec![Call::Rollback]);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_both_errors() {
        let tx = MockTransaction::new().failing_rollback();
        let (finalized, result) = finalize(tx.clone(), failed::<()>()).await;
        assert_eq!(finalized, Finalized::RollbackFailed);
        let err = result.unwrap_err();
        assert_eq!(*err, CallerKind::Cache(ErrorKind::RollbackFailed));
        // The cause and the rollback error are siblings, not a chain.
        assert_eq!(err.frame().children().len(), 2);
        let report = format!("{err:?}");
        assert!(report.contains("work failed"), "{report}");
        assert!(report.contains("failed to roll back transaction"), "{report}");
        assert_eq!(tx.calls().await, vec![Call::Rollback]);
    }

    #[tokio::test]
    async fn test_unit_of_work_lends_transaction() {
        let tx = MockTransaction::new();
        let journal = tx.clone();
        let result = unit_of_work(tx, async |tx: &mut MockTransaction| {
            // Nothing has been settled while the work is still running.
            assert!(tx.calls().await.is_empty());
            Ok::<_, Exn<CallerKind>>("done")
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(journal.calls().await, vec![Call::Commit]);
    }

    #[tokio::test]
    async fn test_unit_of_work_rolls_back_on_error() {
        let tx = MockTransaction::new();
        let journal = tx.clone();
        let result = unit_of_work(tx, async |_: &mut MockTransaction| failed::<u8>()).await;
        assert_eq!(*result.unwrap_err(), CallerKind::Work);
        assert_eq!(journal.calls().await, vec![Call::Rollback]);
    }
}
