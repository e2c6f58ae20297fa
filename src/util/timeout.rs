//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::FinanceError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, FinanceError>>,
) -> Result<T, FinanceError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(FinanceError::Timeout(duration.as_millis() as u64)),
    }
}

/// Apply an optional deadline; `None` runs the future unbounded.
pub async fn with_optional_timeout<T>(
    duration: Option<Duration>,
    future: impl Future<Output = Result<T, FinanceError>>,
) -> Result<T, FinanceError> {
    match duration {
        Some(limit) => with_timeout(limit, future).await,
        None => future.await,
    }
}
