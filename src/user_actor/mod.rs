//! User directory: accounts, roles and their gateway customer link.

pub mod entity;
pub mod error;

pub use error::*;
