pub mod catalog;
pub mod ids;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod ticket;
pub mod user;

pub use catalog::*;
pub use ids::*;
pub use inventory::*;
pub use ledger::*;
pub use order::*;
pub use ticket::*;
pub use user::*;
