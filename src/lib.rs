//! Fuel-ticket fulfillment backend.
//!
//! Paid checkouts arrive as signed gateway webhooks; each one becomes
//! activated tickets and inventory decrements committed in a single unit of
//! work across in-memory store actors.

pub mod actor_framework;
pub mod app_system;
pub mod catalog_actor;
pub mod clients;
pub mod config;
pub mod domain;
pub mod fulfillment;
pub mod gateway;
pub mod http;
pub mod inventory_actor;
pub mod ledger_actor;
pub mod ports;
pub mod ticket_actor;
pub mod transaction;
pub mod user_actor;
pub mod webhook;

#[cfg(test)]
pub mod mock_framework;
