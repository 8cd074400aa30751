//! Transaction boundary

use std::fmt::Display;

use crate::error::StoreError;
use crate::ports::Transaction;

/// Close `tx` according to `outcome`.
///
/// `Ok` commits; a commit failure is passed through `on_commit_error` so the
/// caller can translate late uniqueness failures. `Err` rolls back; a rollback
/// failure is logged and the original error is returned.
pub async fn settle<T, E, F>(
    tx: Box<dyn Transaction>,
    outcome: Result<T, E>,
    on_commit_error: F,
) -> Result<T, E>
where
    T: Send,
    E: Display + Send,
    F: FnOnce(StoreError) -> E + Send,
{
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(on_commit_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, cause = %err, "failed to rollback transaction");
            }
            Err(err)
        }
    }
}
