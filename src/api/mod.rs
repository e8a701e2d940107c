//! API layer for SafePlate Risk Ledger
//!
//! REST endpoints for report submission, decrypt-request dispatch, oracle
//! callbacks and ledger queries.

pub mod error;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode, ErrorDetails};
pub use rest::*;
