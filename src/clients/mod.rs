//! Typed clients over the generic resource actors.
//!
//! Each client wraps a `ResourceClient` for one entity, adds the domain
//! operations of that store and implements the matching port.

pub mod macros;
mod catalog_client;
mod inventory_client;
mod ledger_client;
mod ticket_client;
mod user_client;

pub use catalog_client::*;
pub use inventory_client::*;
pub use ledger_client::*;
pub use ticket_client::*;
pub use user_client::*;
