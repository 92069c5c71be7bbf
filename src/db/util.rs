//! This module contains utility functions and types for working with SQLite databases using SQLx.

use std::collections::HashSet;

use sqlx::Error;

/// Generates a SQL clause for the `excluded` column in an `ON CONFLICT` clause.
pub(crate) fn excluded(col: &str) -> String {
    format!("{col} = excluded.{col}")
}

/// Retries an asynchronous SQLite operation with exponential backoff.
pub(crate) async fn retry_sqlite<F, Fut, T>(operation: F) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) if is_retryable_sqlite_error(&err) => {
                let Some(wait_ms) = get_wait_ms_sqlite(attempt, 5000) else {
                    return Err(err);
                };
                tracing::debug!(attempt, wait_ms, "database busy; retrying");
                tokio::time::sleep(std::time::Duration::from_millis(wait_ms)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Checks if an error is retryable for SQLite.
fn is_retryable_sqlite_error(err: &Error) -> bool {
    matches!(
        err,
        Error::Database(db_err) if db_err
            .code()
            .is_some_and(|code| RETRY_ERRORS.contains(&*code))
    )
}

/// Calculates the wait time for retries based on SQLite's backoff strategy.
fn get_wait_ms_sqlite(attempt: usize, timeout: u64) -> Option<u64> {
    const DELAYS: [u64; 12] = [1, 2, 5, 10, 15, 20, 25, 25, 25, 50, 50, 100];
    const TOTALS: [u64; 12] = [0, 1, 3, 8, 18, 33, 53, 78, 103, 128, 178, 228];

    let (delay, prior) = if attempt >= DELAYS.len() {
        let delay = DELAYS[DELAYS.len() - 1];
        let extra = (attempt - (DELAYS.len() - 1)) as u64;
        (delay, TOTALS[TOTALS.len() - 1] + delay * extra)
    } else {
        (DELAYS[attempt], TOTALS[attempt])
    };

    (prior + delay <= timeout).then_some(delay)
}

/// Checks if an error is a unique constraint violation.
pub(crate) fn is_err_unique_violation(err: &Error) -> bool {
    matches!(err, Error::Database(db_err) if db_err.is_unique_violation())
}

lazy_static::lazy_static! {
    /// Set of retryable SQLite (extended) result codes: `SQLITE_BUSY`,
    /// `SQLITE_BUSY_RECOVERY`, `SQLITE_BUSY_SNAPSHOT`, `SQLITE_BUSY_TIMEOUT`.
    static ref RETRY_ERRORS: HashSet<&'static str> =
        ["5", "261", "517", "773"].into_iter().collect();
}
