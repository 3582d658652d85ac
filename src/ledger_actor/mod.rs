//! Processed-event ledger used to deduplicate webhook deliveries.

pub mod entity;
