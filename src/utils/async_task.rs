use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::error;
use tracing::warn;

use crate::BackoffPolicy;
use crate::NetworkError;
use crate::Result;

/// General one
///
/// Runs `task` until it succeeds, exhausts `policy.max_retries` attempts or
/// returns an error [`crate::Error::is_retryable`] says no retry can fix.
/// Each attempt is bounded by `policy.timeout_ms`; delays double between
/// attempts up to `policy.max_delay_ms`.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,                               // The type of the async function
    T: std::future::Future<Output = Result<P>>, // The future returned by the async function
{
    let timeout_duration = Duration::from_millis(policy.timeout_ms);
    let mut delay = Duration::from_millis(policy.base_delay_ms);
    let mut attempts = 0;
    let mut last_error =
        NetworkError::TaskBackoffFailed("Task failed after max retries".to_string()).into();

    while attempts < policy.max_retries {
        match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => {
                return Ok(r); // Exit on success
            }
            Ok(Err(error)) => {
                if !error.is_retryable() {
                    return Err(error);
                }
                warn!("attempt failed with retryable error: {:?}", &error);
                last_error = error;
            }
            Err(_) => {
                warn!(
                    "task_with_timeout_and_exponential_backoff timeout after {:?}",
                    timeout_duration
                );
                last_error = NetworkError::RetryTimeoutError(timeout_duration).into();
            }
        };

        attempts += 1;
        if attempts < policy.max_retries {
            sleep(with_jitter(delay)).await;
            delay = (delay * 2).min(Duration::from_millis(policy.max_delay_ms));
        } else {
            warn!("Task failed after {} attempts", attempts);
        }
    }
    Err(last_error) // Fallback error message if no task returns Ok
}

/// Add up to 25% jitter on top of the base delay.
fn with_jitter(delay: Duration) -> Duration {
    let spread = ((delay.as_millis() as u64) / 4).max(1);
    let jitter = rand::thread_rng().gen_range(0..=spread);
    delay + Duration::from_millis(jitter)
}

// Helper function to spawn tasks and track their JoinHandles
pub(crate) async fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<tokio::task::JoinHandle<()>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    // Clone the name so it can be safely moved into the async block
    let name = name.to_string();
    let handle = tokio::spawn(async move {
        if let Err(e) = task_fn().await {
            error!("spawned task: {name} stopped or encountered an error: {:?}", e);
        }
    });

    // Push the handle into the vector inside the Option
    if let Some(h) = handles {
        h.push(handle);
    }
}
