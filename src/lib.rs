//! SafePlate Risk Ledger Library
//!
//! Confidential restaurant inspection scoring. Encrypted inspection
//! reports are scored through an asynchronous decrypt-request protocol:
//! the ledger dispatches ciphertext bundles to a decryption oracle and
//! applies the signed cleartexts when the callback arrives.
//!
//! ## Modules
//!
//! - [`domain`] - Identifiers, entities, purposes and notifications
//! - [`risk`] - Risk score and priority formulas
//! - [`crypto`] - Proof digests, payload codec and oracle signing
//! - [`infra`] - Ledger store, dispatcher, resolver, oracle and relayer
//! - [`metrics`] - Counters, gauges and histograms
//! - [`telemetry`] - Structured logging setup
//! - [`api`] - REST API routes
//! - [`server`] - HTTP server bootstrap

pub mod api;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod risk;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    AnalysisId, AreaAggregate, CiphertextHandle, DecryptTarget, DecryptionCallback,
    EncryptedInput, Hash256, InspectionReport, LocationCode, Notification, Purpose, ReportId,
    ReportSubmission, RequestId, Resolution, RiskAnalysis,
};

pub use infra::{
    CallbackResolver, CiphertextStore, DecryptRequestDispatcher, DecryptionOracle, LedgerError,
    LedgerStore, NotificationSink, Result, RiskLedgerService,
};
