//! Infrastructure layer for SafePlate Risk Ledger
//!
//! Contains trait definitions and implementations for:
//! - Ciphertext storage (simulated encrypted-value coprocessor)
//! - Decryption oracle (local development oracle and relayer)
//! - Entity ledger and pending-request table
//! - Decrypt-request dispatch and callback resolution
//! - Notification log
//! - Graceful shutdown

mod ciphertext_store;
mod dispatcher;
mod error;
mod ledger;
mod notifications;
mod oracle;
mod pending;
mod relayer;
mod resolver;
mod service;
mod shutdown;
mod store;
mod traits;

pub use ciphertext_store::{
    seal_value, InMemoryCiphertextStore, SEALED_INPUT_LEN, SEALED_INPUT_VERSION,
};
pub use dispatcher::DecryptRequestDispatcher;
pub use error::*;
pub use ledger::EntityLedger;
pub use notifications::{NotificationLog, DEFAULT_RETENTION, DEFAULT_SUBSCRIBER_CAPACITY};
pub use oracle::{IssuedRequest, LocalDecryptionOracle};
pub use pending::PendingRequestTable;
pub use relayer::{spawn_relayer, OracleRelayer, RelayerConfig};
pub use resolver::CallbackResolver;
pub use service::RiskLedgerService;
pub use shutdown::{shutdown_signal, ShutdownCoordinator};
pub use store::{LedgerSnapshot, LedgerState, LedgerStore};
pub use traits::*;
