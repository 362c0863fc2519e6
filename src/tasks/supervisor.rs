//! Supervisor Task
//!
//! Keeps a long-running task alive: a run that panics is logged and launched
//! again, a run that returns normally ends supervision.

use std::any::Any;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs `launch()` on its own task, relaunching it after every panic until a
/// run returns normally or `shutdown` is cancelled.
///
/// Returns the number of restarts.
///
/// # Example
/// ```ignore
/// let restarts = supervise("receiver", shutdown.clone(), || run_receiver(ctx.clone())).await;
/// ```
pub async fn supervise<F, Fut>(name: &'static str, shutdown: CancellationToken, mut launch: F) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut restarts = 0;

    loop {
        match tokio::spawn(launch()).await {
            Ok(()) => {
                info!(task = name, restarts, "task finished");
                break;
            }
            Err(e) if e.is_panic() => {
                let cause = panic_message(e.into_panic());
                if shutdown.is_cancelled() {
                    warn!(task = name, %cause, "task panicked during shutdown");
                    break;
                }
                restarts += 1;
                error!(task = name, %cause, restarts, "task panicked, relaunching");
            }
            Err(e) => {
                warn!(task = name, error = %e, "task cancelled");
                break;
            }
        }
    }

    restarts
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
