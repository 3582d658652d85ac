//! System orchestration, startup, and shutdown logic.

pub mod ticketing_system;
pub mod tracing;
pub mod error;

pub use ticketing_system::*;
pub use tracing::*;
pub use error::*;
