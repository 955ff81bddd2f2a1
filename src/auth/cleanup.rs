//! Background removal of expired session tokens.
//!
//! Validation already treats expired tokens as invalid, so this only keeps
//! the tokens table from growing without bound.

use tokio::time::{interval, Duration};

use super::SessionAuthenticator;

/// Spawn the background sweeper. A zero interval disables it.
pub fn spawn_token_sweeper(auth: SessionAuthenticator, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("Expired token sweeper is disabled");
        return;
    }

    tracing::info!(interval_secs, "Starting expired token sweeper");

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            match auth.purge_expired().await {
                Ok(0) => tracing::debug!("No expired tokens to remove"),
                Ok(removed) => tracing::info!(removed, "Removed expired tokens"),
                Err(e) => tracing::error!(error = %e, "Expired token sweep failed"),
            }
        }
    });
}
