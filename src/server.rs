//! HTTP server bootstrap for SafePlate Risk Ledger.
//!
//! This module wires together:
//! - configuration
//! - the ciphertext store and local decryption oracle
//! - the ledger service and oracle relayer
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::crypto::{public_key_to_hex, secret_key_from_hex, OracleSigningKey, OracleVerifyingKey};
use crate::infra::{
    shutdown_signal, spawn_relayer, InMemoryCiphertextStore, LedgerError, LocalDecryptionOracle,
    NotificationLog, RelayerConfig, RiskLedgerService, ShutdownCoordinator,
};
use crate::metrics::MetricsRegistry;
use crate::telemetry::{init_telemetry, TelemetryConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Oracle signing key. A fresh key is generated when absent.
    pub oracle_signing_key: Option<[u8; 32]>,
    /// Expected oracle public key, checked against the signing key at startup.
    pub oracle_public_key: Option<OracleVerifyingKey>,
    pub relayer: RelayerConfig,
    /// Raw `CORS_ALLOW_ORIGINS` value.
    pub cors_allow_origins: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, LedgerError> {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| {
            LedgerError::Configuration(format!("invalid listen address {host}:{port}: {e}"))
        })?;

        let oracle_signing_key = std::env::var("ORACLE_SIGNING_KEY")
            .ok()
            .map(|raw| {
                secret_key_from_hex(&raw)
                    .map_err(|e| LedgerError::Configuration(format!("ORACLE_SIGNING_KEY: {e}")))
            })
            .transpose()?;

        let oracle_public_key = std::env::var("ORACLE_PUBLIC_KEY")
            .ok()
            .map(|raw| {
                OracleVerifyingKey::from_hex(&raw)
                    .map_err(|e| LedgerError::Configuration(format!("ORACLE_PUBLIC_KEY: {e}")))
            })
            .transpose()?;

        Ok(Self {
            listen_addr,
            oracle_signing_key,
            oracle_public_key,
            relayer: RelayerConfig::from_env(),
            cors_allow_origins: std::env::var("CORS_ALLOW_ORIGINS").ok(),
        })
    }

    /// Build the oracle signing key, rejecting a mismatched `ORACLE_PUBLIC_KEY`.
    pub fn signing_key(&self) -> Result<OracleSigningKey, LedgerError> {
        let signing_key = match &self.oracle_signing_key {
            Some(bytes) => OracleSigningKey::from_bytes(bytes),
            None => {
                warn!("ORACLE_SIGNING_KEY not set; generating an ephemeral oracle key");
                OracleSigningKey::generate()
            }
        };

        if let Some(expected) = &self.oracle_public_key {
            if expected.to_bytes() != signing_key.public_key_bytes() {
                return Err(LedgerError::Configuration(
                    "ORACLE_PUBLIC_KEY does not match ORACLE_SIGNING_KEY".to_string(),
                ));
            }
        }

        Ok(signing_key)
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: RiskLedgerService,
    pub notifications: Arc<NotificationLog>,
}

impl AppState {
    pub fn new(service: RiskLedgerService, notifications: Arc<NotificationLog>) -> Self {
        Self {
            service,
            notifications,
        }
    }

    /// State backed by an in-process ciphertext store and oracle.
    pub fn local(
        ciphertexts: Arc<InMemoryCiphertextStore>,
        oracle: Arc<LocalDecryptionOracle>,
    ) -> Self {
        let notifications = Arc::new(NotificationLog::from_env());
        let service = RiskLedgerService::new(
            ciphertexts,
            oracle,
            notifications.clone(),
            Arc::new(MetricsRegistry::new()),
        );
        Self::new(service, notifications)
    }
}

/// Run the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry)
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;

    info!("Starting SafePlate Risk Ledger v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let ciphertexts = Arc::new(InMemoryCiphertextStore::from_env()?);
    let signing_key = config.signing_key()?;

    let (relay_tx, relay_rx) = mpsc::unbounded_channel();
    let mut oracle = LocalDecryptionOracle::new(ciphertexts.clone(), signing_key);
    if config.relayer.enabled {
        oracle = oracle.with_notifier(relay_tx);
    }
    let oracle = Arc::new(oracle);
    info!(
        public_key = %public_key_to_hex(&oracle.verifying_key().to_bytes()),
        "Local decryption oracle ready"
    );

    let state = AppState::local(ciphertexts, oracle.clone());

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let relayer = if config.relayer.enabled {
        info!(
            delay_ms = config.relayer.delay.as_millis() as u64,
            "Oracle relayer enabled"
        );
        Some(spawn_relayer(
            config.relayer.clone(),
            oracle,
            state.service.resolver().clone(),
            relay_rx,
            coordinator.subscribe(),
        ))
    } else {
        info!("Oracle relayer disabled; callbacks must be posted to /api/v1/oracle/callback");
        None
    };

    let app = build_router(cors_layer(config.cors_allow_origins.as_deref())?).with_state(state);

    info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let signal = coordinator.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal.shutdown();
        })
        .await?;

    coordinator.shutdown();
    if let Some(handle) = relayer {
        if let Err(e) = handle.await {
            warn!(error = %e, "Oracle relayer task failed");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Build the full router: `/api`, health and metrics.
pub fn build_router(cors: Option<CorsLayer>) -> Router<AppState> {
    let mut router = Router::new()
        .nest("/api", crate::api::router())
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_export))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors {
        router = router.layer(cors_layer);
    }

    router
}

/// Parse a `CORS_ALLOW_ORIGINS` value: `*` or a comma-separated origin list.
pub fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origins) = origins.map(str::trim) else {
        return Ok(None);
    };
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    ))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "service": "safeplate-ledger",
        "version": env!("CARGO_PKG_VERSION"),
        "pending_requests": state.service.store().pending_count().await,
    }))
}

/// Prometheus text exposition.
async fn metrics_export(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.service.metrics().to_prometheus().await,
    )
}
