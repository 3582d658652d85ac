//! Ticket lifecycle: issue, activate on payment, redeem.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
