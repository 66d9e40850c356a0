use std::fmt::Display;
use std::future::Future;

/// Runs an operation whose failure must not affect the caller.
/// Errors are logged and discarded; `None` signals the failure.
pub async fn advisory<F, T, E>(operation: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    advisory_result(operation, fut.await)
}

/// Synchronous counterpart of [`advisory`] for an already computed result.
pub fn advisory_result<T, E: Display>(operation: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("⚠️  {} failed, ignoring: {}", operation, e);
            None
        }
    }
}
