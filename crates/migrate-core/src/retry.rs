use std::future::Future;

use crate::client::ApiResult;

/// Default number of attempts for a single remote call.
pub const MAX_RETRY: u32 = 3;

/// Run a remote call up to `max_attempts` times.
///
/// `call` is re-invoked with whatever it captured on the first attempt, so
/// every retry sends the same request payload. The error from the final
/// attempt is returned unmodified. `max_attempts` of `0` is treated as `1`.
///
/// ## Attempt numbering
///
/// Attempts are 1-indexed: `max_attempts = 3` means attempts `1`, `2`, `3`.
pub async fn with_retry<T, F, Fut>(label: &str, max_attempts: u32, mut call: F) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    call = label,
                    attempt,
                    max_attempts,
                    error = %e,
                    "remote call failed, retrying"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
