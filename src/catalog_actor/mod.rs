//! Catalog of purchasable items, including the lazily assigned gateway product id.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
