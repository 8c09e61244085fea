//! Transaction scoping shared by the PostgreSQL adapters.
//!
//! Composite writes are expressed as bodies over a `PgConnection`. When the
//! caller hands in a pool a fresh transaction is opened and committed after
//! the body succeeds. When the caller is already inside a transaction the
//! body runs on that connection and the outer scope decides the outcome.

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use tracing::warn;

use discepto_core::{AppError, AppResult};

/// Where a transactional body runs.
pub enum Executor<'a> {
    /// Open a new transaction on the pool.
    Pool(&'a PgPool),
    /// Join the transaction that owns this connection.
    Connection(&'a mut PgConnection),
}

/// Runs `body` atomically.
///
/// The body must only capture owned data. Dropping the returned future
/// before completion rolls the transaction back.
pub async fn exec_tx<T, F>(executor: Executor<'_>, body: F) -> AppResult<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, AppResult<T>> + Send,
{
    match executor {
        Executor::Pool(pool) => {
            let mut transaction = pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to start transaction: {error}"))
            })?;

            match body(&mut *transaction).await {
                Ok(value) => {
                    transaction.commit().await.map_err(|error| {
                        AppError::Internal(format!("failed to commit transaction: {error}"))
                    })?;
                    Ok(value)
                }
                Err(error) => {
                    if let Err(rollback_error) = transaction.rollback().await {
                        warn!(%rollback_error, "failed to roll back transaction");
                    }
                    Err(error)
                }
            }
        }
        Executor::Connection(connection) => body(connection).await,
    }
}

/// Maps a unique violation to `AlreadyExists`, anything else to `Internal`.
pub(crate) fn conflict_or_internal(error: sqlx::Error, subject: &str, operation: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::AlreadyExists(format!("{subject} already exists"));
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}
