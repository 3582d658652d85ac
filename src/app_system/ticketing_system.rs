use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actor_framework::{Entity, ResourceActor, ResourceClient};
use crate::clients::{CatalogClient, InventoryClient, LedgerClient, TicketClient, UserClient};
use crate::config::Config;
use crate::domain::{
    InventoryId, InventoryRecord, ItemId, LedgerEntryId, ProcessedEvent, PurchasableItem, Ticket, TicketId, User,
    UserId,
};
use crate::fulfillment::{FulfillmentPipeline, FulfillmentPorts};
use crate::gateway::PaymentGateway;
use crate::transaction::UnitOfWork;
use crate::webhook::WebhookHandler;

use super::SystemError;

/// The main application system that orchestrates all actors.
///
/// Starts one store actor per entity, wires the clients into the fulfillment
/// pipeline and the webhook handler, and handles shutdown.
pub struct TicketingSystem {
    pub user_client: UserClient,
    pub catalog_client: CatalogClient,
    pub inventory_client: InventoryClient,
    pub ticket_client: TicketClient,
    pub ledger_client: LedgerClient,
    pub gateway: Arc<dyn PaymentGateway>,
    pub pipeline: Arc<FulfillmentPipeline>,
    pub webhook: Arc<WebhookHandler>,
    handles: Vec<JoinHandle<()>>,
}

fn spawn_store<T: Entity>(
    config: &Config,
    next_id: impl Fn() -> T::Id + Send + Sync + 'static,
    handles: &mut Vec<JoinHandle<()>>,
) -> ResourceClient<T> {
    let (actor, client) = ResourceActor::<T>::new(config.stores.buffer_size, next_id);
    handles.push(tokio::spawn(actor.run()));
    client.with_request_timeout(config.stores.request_timeout)
}

impl TicketingSystem {
    pub fn start(config: &Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        let mut handles = Vec::new();

        // 1. Store actors
        let user_client = UserClient::new(spawn_store::<User>(config, UserId::random, &mut handles));
        let catalog_client = CatalogClient::new(spawn_store::<PurchasableItem>(config, ItemId::random, &mut handles));
        let inventory_client =
            InventoryClient::new(spawn_store::<InventoryRecord>(config, InventoryId::random, &mut handles));
        let ticket_client = TicketClient::new(spawn_store::<Ticket>(config, TicketId::random, &mut handles));
        let ledger_client =
            LedgerClient::new(spawn_store::<ProcessedEvent>(config, LedgerEntryId::random, &mut handles));

        // 2. Unit of work: the ledger entry commits last so a failed commit leaves the event retryable
        let transactions = UnitOfWork::new()
            .with_participant(Arc::new(ticket_client.resource()))
            .with_participant(Arc::new(inventory_client.resource()))
            .with_participant(Arc::new(ledger_client.resource()));

        // 3. Pipeline and webhook entry point
        let pipeline = Arc::new(FulfillmentPipeline::new(
            FulfillmentPorts {
                users: Arc::new(user_client.clone()),
                catalog: Arc::new(catalog_client.clone()),
                tickets: Arc::new(ticket_client.clone()),
                inventory: Arc::new(inventory_client.clone()),
                ledger: Arc::new(ledger_client.clone()),
                transactions: Arc::new(transactions),
            },
            config.fulfillment.clone(),
        ));
        let webhook = Arc::new(WebhookHandler::new(Arc::clone(&gateway), Arc::clone(&pipeline)));

        info!(stores = handles.len(), "Ticketing system started");
        Self {
            user_client,
            catalog_client,
            inventory_client,
            ticket_client,
            ledger_client,
            gateway,
            pipeline,
            webhook,
            handles,
        }
    }

    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        let results = [
            self.user_client.resource().shutdown().await.map_err(|e| e.to_string()),
            self.catalog_client.resource().shutdown().await.map_err(|e| e.to_string()),
            self.inventory_client.resource().shutdown().await.map_err(|e| e.to_string()),
            self.ticket_client.resource().shutdown().await.map_err(|e| e.to_string()),
            self.ledger_client.resource().shutdown().await.map_err(|e| e.to_string()),
        ];
        for result in results {
            if let Err(e) = result {
                // the actor already stopped; joining below still reports panics
                error!(error = %e, "Shutdown signal not delivered");
            }
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(e.into());
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
