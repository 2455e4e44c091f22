//! Expired Item Purge Task
//!
//! Background task that periodically asks the pool to reclaim expired items.
//! Backends never collect garbage themselves; this is the pool's own pass.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SharedPool;

/// Spawns a background task that calls [`CachePool::purge_expired`] every
/// `interval_secs` seconds.
///
/// Pool errors are logged and the loop keeps running. The returned handle
/// is aborted during graceful shutdown.
///
/// [`CachePool::purge_expired`]: crate::cache::CachePool::purge_expired
///
/// # Example
/// ```ignore
/// let pool: SharedPool = Arc::new(MemoryPool::new(1000));
/// let purge_handle = spawn_purge_task(pool.clone(), 1);
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task(pool: SharedPool, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            driver = pool.driver_name(),
            "Starting purge task with interval of {} seconds", interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match pool.purge_expired() {
                Ok(0) => debug!("Purge: no expired items found"),
                Ok(removed) => info!("Purge: removed {} expired items", removed),
                Err(e) => warn!(error = %e, "Purge failed"),
            }
        }
    })
}
