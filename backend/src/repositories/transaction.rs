//! Transaction management utilities for repositories.
//!
//! Callers pick their own error type; anything that can absorb a
//! `sqlx::Error` works, so handlers get `AppError` and the workflow engine
//! gets `WorkflowError`.

use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

/// Begin a new database transaction.
///
/// The transaction rolls back when dropped without [`commit_transaction`].
pub async fn begin_transaction<E>(db: &PgPool) -> Result<PgTransaction<'static>, E>
where
    E: From<sqlx::Error>,
{
    db.begin().await.map_err(E::from)
}

pub async fn commit_transaction<E>(tx: PgTransaction<'_>) -> Result<(), E>
where
    E: From<sqlx::Error>,
{
    tx.commit().await.map_err(E::from)
}

pub async fn rollback_transaction<E>(tx: PgTransaction<'_>) -> Result<(), E>
where
    E: From<sqlx::Error>,
{
    tx.rollback().await.map_err(E::from)
}
