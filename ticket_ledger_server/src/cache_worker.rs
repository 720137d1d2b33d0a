use std::time::Duration;

use log::*;
use ticket_ledger_engine::cache::LedgerCache;
use tokio::task::JoinHandle;

/// Starts the cache purge worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Expired entries are already ignored on read; this only keeps the map from growing with keys nobody asks for again.
pub fn start_cache_purge_worker(cache: LedgerCache) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = cache.ttl().max(Duration::from_secs(1));
        let mut timer = tokio::time::interval(period);
        info!("🗃️ Cache purge worker started. Running every {}s", period.as_secs());
        loop {
            timer.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!("🗃️ Purged {purged} expired cache entries. {} remain", cache.len());
            }
        }
    })
}
