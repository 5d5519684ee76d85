//! Concurrency model (§5): the position-feed worker and the matcher worker,
//! each a named long-running task racing its sleep against a shared
//! shutdown signal.

pub mod matcher_loop;
pub mod position_feed;

use tokio::sync::watch;

/// A graceful-shutdown signal shared by every worker, following the
/// reference codebase's preference for a plain `tokio::sync::watch`
/// channel over pulling in a dedicated cancellation-token crate.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Sleeps for `duration`, returning early if `shutdown` flips to `true`.
/// Returns `true` if the sleep ran to completion, `false` if interrupted.
pub async fn sleep_or_shutdown(duration: std::time::Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.changed() => false,
    }
}
