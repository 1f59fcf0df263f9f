use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::search::SearchService;

const ERROR_BACKOFF_MS: u64 = 5000;

/// Rebuilds the popular-tag cache on a fixed interval until cancelled.
pub async fn run(search: SearchService, interval_seconds: u64, size: usize) -> Result<()> {
    info!(interval_seconds, size, "tag popularity refresher started");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match search.refresh_popular_tags(size).await {
            Ok(written) => {
                info!(tags = written, "popular tag cache refreshed");
            }
            Err(err) => {
                warn!(error = ?err, "popular tag refresh failed, backing off");
                tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}
