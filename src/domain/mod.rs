//! Domain models for SafePlate Risk Ledger
//!
//! Entity, identifier and protocol types shared by the ledger, the
//! dispatcher and the callback resolver.

mod inspection;
mod notification;
mod purpose;
mod types;

pub use inspection::*;
pub use notification::*;
pub use purpose::*;
pub use types::*;
