use std::sync::Arc;

use tracing::{info, warn, Instrument};

use fuel_ticketing::app_system::{setup_tracing, SystemError, TicketingSystem};
use fuel_ticketing::config::{Config, ConfigError};
use fuel_ticketing::domain::{InventoryCreate, ItemCreate, LineItem};
use fuel_ticketing::gateway::{InMemoryGateway, PaymentGateway, WebhookVerifier};
use fuel_ticketing::http;

const DEMO_SECRET: &str = "whsec_local_demo";

#[tokio::main]
async fn main() -> Result<(), SystemError> {
    let dotenv = dotenvy::dotenv();
    setup_tracing();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = Config::from_env()?;
    info!(fulfillment = ?config.fulfillment, "Starting fuel ticketing system");

    let secret = match (&config.webhook.secret, config.webhook.bind_addr) {
        (Some(secret), _) => secret.clone(),
        (None, Some(_)) => {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_SECRET_STRIPE",
                value: String::new(),
                reason: "required when WEBHOOK_BIND_ADDR is set".into(),
            }
            .into())
        }
        (None, None) => {
            warn!("WEBHOOK_SECRET_STRIPE not set, using a local demo secret");
            DEMO_SECRET.to_string()
        }
    };
    let gateway = Arc::new(InMemoryGateway::new(WebhookVerifier::new(secret, config.webhook.tolerance)));
    let system = TicketingSystem::start(&config, Arc::clone(&gateway) as Arc<dyn PaymentGateway>);

    let span = tracing::info_span!("demo_purchase");
    let demo = run_demo_purchase(&system, &gateway).instrument(span).await;
    if let Err(e) = &demo {
        warn!(error = %e, "Demo purchase failed");
    }

    if let Some(addr) = config.webhook.bind_addr {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C");
            }
        };
        http::serve(addr, Arc::clone(&system.webhook), shutdown).await?;
    }

    // Shutdown system gracefully
    system.shutdown().await?;
    demo?;

    info!("Application completed successfully");
    Ok(())
}

/// One paid checkout from registration to redemption, through the signed webhook path.
async fn run_demo_purchase(system: &TicketingSystem, gateway: &InMemoryGateway) -> Result<(), SystemError> {
    let user = system.user_client.register("driver@example.com", "argon2$demo", gateway).await?;
    let customer_id = user
        .customer_id
        .clone()
        .ok_or_else(|| SystemError::Demo("registered user has no customer id".into()))?;

    let inventory_id = system
        .inventory_client
        .create_record(InventoryCreate { title: "Diesel tank A".into(), amount: 10 })
        .await?;
    let item_id = system
        .catalog_client
        .create_item(ItemCreate {
            title: "Diesel 1L".into(),
            unit_price: 189,
            currency: "EUR".into(),
            seller: "North Fuel".into(),
            category: "diesel".into(),
            inventory_id,
            units_per_sale: 1,
        })
        .await?;
    let product_id = system.catalog_client.publish(item_id, gateway).await?;
    info!(%item_id, %product_id, "Catalog item published");

    let session = gateway
        .create_checkout_session(&customer_id, &[LineItem::new(product_id, 3)])
        .await?;
    let delivery = gateway.complete_checkout(&session.id).await?;
    let ack = system.webhook.handle(&delivery.payload, Some(delivery.signature.as_str())).await?;
    info!(?ack, "Webhook handled");

    let tickets = system.ticket_client.tickets_for_user(user.id).await?;
    info!(count = tickets.len(), "Tickets issued");

    if let Some(view) = tickets.first() {
        let ticket = system
            .ticket_client
            .get_ticket(view.id)
            .await?
            .ok_or_else(|| SystemError::Demo(format!("ticket {} vanished", view.id)))?;
        let redeemed = system.ticket_client.redeem(ticket.id, ticket.secret().expose()).await?;
        info!(ticket_id = %redeemed.id, status = %redeemed.status, "Ticket redeemed");
    }

    let remaining = system.inventory_client.check_stock(inventory_id).await?;
    info!(%inventory_id, remaining, "Inventory after purchase");
    Ok(())
}
