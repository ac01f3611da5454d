//! Fixed-interval lyric poll loop.

use crate::session::Session;
use crate::time::DurationExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Ticks the session at a fixed interval until cancelled
pub struct LyricPoller {
    session: Arc<Session>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
}

impl LyricPoller {
    /// Create a new lyric poller
    ///
    /// # Arguments
    /// * `session` - Session to resolve lines from
    /// * `poll_interval_ms` - Polling interval in milliseconds (0 is treated as 1)
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        session: Arc<Session>,
        poll_interval_ms: u64,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            session,
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start polling in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the poll loop until the cancellation token fires
    pub async fn run(&self) {
        info!(
            "Starting lyric poller (interval: {}ms)",
            self.poll_interval.as_millis_u64()
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        // A slow position query delays the next tick instead of bursting to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Lyric poller shutting down gracefully");
                    break;
                }
                _ = interval.tick() => {
                    self.session.tick().await;
                }
            }
        }
    }
}
