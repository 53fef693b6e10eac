//! Scheduled eviction of expired session tokens.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::tokens::TokenService;

/// Default interval between sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run one sweep, logging the outcome. Returns the number of evicted rows.
pub async fn run_cleanup(tokens: &TokenService) -> u64 {
    match tokens.run_cleanup_sweep().await {
        Ok(count) if count > 0 => {
            info!(count, "Cleaned up expired tokens");
            count
        }
        Ok(_) => {
            debug!("No expired tokens to clean up");
            0
        }
        Err(e) => {
            error!(error = %e, "Failed to clean up expired tokens");
            0
        }
    }
}

/// Spawn a background task that sweeps immediately and then every `period`.
///
/// The sweep runs inline in the loop, so two sweeps never overlap; ticks that
/// fall due while a sweep is still running are skipped. The task ends when
/// `cancel` fires.
pub fn spawn_cleanup_scheduler(
    tokens: TokenService,
    period: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = period.as_secs(), "Token cleanup scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Token cleanup scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    run_cleanup(&tokens).await;
                }
            }
        }
    })
}
