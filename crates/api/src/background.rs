//! Background tasks owned by the API process.

use std::sync::Arc;
use std::time::Duration;

use bookhub_core::upload::SessionStore;
use tokio::task::JoinHandle;

/// Periodically evict upload sessions that have gone idle.
///
/// Without a sweep, abandoned chunked uploads would hold their partial
/// payloads in memory for the life of the process. The handle is aborted
/// at shutdown.
pub fn start_session_sweeper(
    store: Arc<SessionStore>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh process
        // does not log an empty sweep.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_expired(ttl).await;
            if evicted > 0 {
                tracing::info!(evicted, "evicted expired upload sessions");
            }
        }
    })
}
