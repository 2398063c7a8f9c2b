use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries a request while it fails with a transient (connect or timeout)
/// error, doubling the delay after every attempt.
///
/// `retries` is the number of extra attempts after the first one. Other
/// errors are returned immediately.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    initial_delay_ms: u64,
) -> Result<T, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut delay = Duration::from_millis(initial_delay_ms);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if attempt < retries && (err.is_connect() || err.is_timeout()) => {
                attempt += 1;
                debug!(attempt, retries, error = %err, "Transient request failure, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}
