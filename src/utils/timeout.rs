//! Deadline helpers for channel operations.
//!
//! The reassembler has no intrinsic timeout; callers that need liveness wrap
//! their receive loop with [`with_timeout_error`].

use crate::error::{EnvelopeError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for connects and sends
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `fut`, mapping an elapsed deadline to `EnvelopeError::Timeout`
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(EnvelopeError::Timeout),
    }
}
