//! The sequential workflow: resolve the public address, register the node,
//! start a session, then keep pinging on a fixed interval.
//!
//! Any failure at any step aborts the entire run — no retry, no backoff,
//! no resumption.  The only clean exit is a termination signal, which
//! leaves the loop and (by default) sends one best-effort stop-session.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::KeepaliveConfig;
use crate::error::Result;
use crate::gateway::client::GatewayClient;

pub struct Runner {
    client: GatewayClient,
    ping_interval: Duration,
    stop_session_on_exit: bool,
}

impl Runner {
    pub fn new(client: GatewayClient, cfg: &KeepaliveConfig) -> Self {
        Self {
            client,
            ping_interval: Duration::from_secs(cfg.ping_interval_secs),
            stop_session_on_exit: cfg.stop_session_on_exit,
        }
    }

    /// Run the workflow until a request fails or `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let ip = self.client.resolve_address().await?;
        tracing::info!(ip = %ip, "public address resolved");

        let confirmation = self.client.register(&ip).await?;
        tracing::info!(node_id = %self.client.node_id(), response = %confirmation, "node registered");

        let confirmation = self.client.start_session().await?;
        tracing::info!(node_id = %self.client.node_id(), response = %confirmation, "session started");

        tracing::info!("sending initial ping");
        self.client.ping().await?;

        let mut interval = tokio::time::interval(self.ping_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the loop
        // waits a full interval after the initial ping.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("termination signal received, leaving keep-alive loop");
                    break;
                }
                _ = interval.tick() => {
                    self.client.ping().await?;
                }
            }
        }

        if self.stop_session_on_exit {
            if let Err(e) = self.client.stop_session().await {
                tracing::warn!(error = %e, "best-effort stop-session failed");
            }
        }

        Ok(())
    }
}
