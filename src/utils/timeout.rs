//! Async timeout wrappers.
//!
//! Transport reads and writes are the connection actor's only suspension
//! points, so these bounds are what stand between a stalled peer and a
//! connection that never terminates.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// How long a connection may sit in a read with no inbound traffic before
/// being dropped.
pub const IDLE_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for a single in-flight write.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period for active connections to drain on server shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a fallible future under a deadline, mapping expiry to
/// [`ProtocolError::Timeout`].
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expiry_maps_to_timeout_error() {
        let result = with_timeout_error(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_millis(10),
        )
        .await;

        assert!(matches!(result, Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn completion_passes_through() {
        let result = with_timeout_error(async { Ok(7u32) }, Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), 7);
    }
}
