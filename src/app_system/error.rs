use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::catalog_actor::{CatalogError, PublishError};
use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::inventory_actor::InventoryError;
use crate::ticket_actor::TicketError;
use crate::user_actor::RegistrationError;
use crate::webhook::WebhookError;

/// Failures surfaced by the binary while starting, running or stopping the system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),
    #[error("catalog error: {0}")]
    Catalog(#[from] FrameworkError<CatalogError>),
    #[error("publishing failed: {0}")]
    Publish(#[from] PublishError),
    #[error("inventory error: {0}")]
    Inventory(#[from] FrameworkError<InventoryError>),
    #[error("ticket error: {0}")]
    Ticket(#[from] FrameworkError<TicketError>),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("webhook delivery failed: {0}")]
    Webhook(#[from] WebhookError),
    #[error("{0}")]
    Demo(String),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("actor task failed: {0}")]
    ActorTask(#[from] tokio::task::JoinError),
}
