//! Oracle relayer
//!
//! Background worker that carries local-oracle results back to the
//! resolver. It receives issued request ids over a channel, waits the
//! configured delay, fulfills the request and resolves the callback.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::domain::RequestId;

use super::{CallbackResolver, LocalDecryptionOracle};

/// Configuration for the oracle relayer
#[derive(Debug, Clone)]
pub struct RelayerConfig {
    /// Whether the dev server starts the relayer
    pub enabled: bool,
    /// Delay between a request being issued and its callback
    pub delay: Duration,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_millis(250),
        }
    }
}

impl RelayerConfig {
    /// Load configuration from environment
    pub fn from_env() -> Self {
        let enabled = std::env::var("RELAYER_ENABLED")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);

        let delay = std::env::var("RELAYER_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(250));

        Self { enabled, delay }
    }
}

pub struct OracleRelayer {
    config: RelayerConfig,
    oracle: Arc<LocalDecryptionOracle>,
    resolver: Arc<CallbackResolver>,
}

impl OracleRelayer {
    pub fn new(
        config: RelayerConfig,
        oracle: Arc<LocalDecryptionOracle>,
        resolver: Arc<CallbackResolver>,
    ) -> Self {
        Self {
            config,
            oracle,
            resolver,
        }
    }

    /// Relay requests until the channel closes or `shutdown` flips to true.
    ///
    /// Each request is relayed on its own task, so callbacks complete in
    /// delay order rather than strictly in issue order.
    pub async fn run(
        self,
        mut requests: mpsc::UnboundedReceiver<RequestId>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(delay_ms = self.config.delay.as_millis() as u64, "Starting oracle relayer");
        let relayer = Arc::new(self);

        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request_id) = request else {
                        info!("Oracle relayer channel closed");
                        break;
                    };
                    let relayer = relayer.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(relayer.config.delay).await;
                        relayer.relay(request_id).await;
                    });
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Oracle relayer shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Fulfill and resolve one request
    pub async fn relay(&self, request_id: RequestId) {
        let callback = match self.oracle.fulfill(&request_id) {
            Ok(callback) => callback,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Oracle could not fulfill request");
                return;
            }
        };

        match self.resolver.resolve(&callback).await {
            Ok(resolution) => debug!(request_id = %request_id, ?resolution, "Callback relayed"),
            Err(e) => error!(request_id = %request_id, error = %e, "Relayed callback rejected"),
        }
    }
}

/// Spawn the relayer as a background task
pub fn spawn_relayer(
    config: RelayerConfig,
    oracle: Arc<LocalDecryptionOracle>,
    resolver: Arc<CallbackResolver>,
    requests: mpsc::UnboundedReceiver<RequestId>,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let relayer = OracleRelayer::new(config, oracle, resolver);
    tokio::spawn(relayer.run(requests, shutdown))
}
