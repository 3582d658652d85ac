use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::domain::{NewTicket, PaymentReference, Ticket, TicketDetails, TicketId, TicketView, UserId};
use crate::impl_basic_client;
use crate::ports::{LookupError, StoreError, TicketStore};
use crate::ticket_actor::{TicketAction, TicketError};
use crate::transaction::Transaction;

use super::CatalogClient;

/// Client for interacting with the Ticket actor.
#[derive(Clone)]
pub struct TicketClient {
    inner: ResourceClient<Ticket>,
}

impl_basic_client!(TicketClient, Ticket, ticket);

impl TicketClient {
    #[instrument(skip(self))]
    pub async fn view(&self, id: TicketId) -> Result<Option<TicketView>, FrameworkError<TicketError>> {
        debug!("Sending request");
        Ok(self.inner.get(None, id).await?.map(|ticket| ticket.view()))
    }

    /// Committed tickets of a user, oldest first.
    #[instrument(skip(self))]
    pub async fn tickets_for_user(&self, user_id: UserId) -> Result<Vec<TicketView>, FrameworkError<TicketError>> {
        debug!("Sending request");
        let mut tickets = self.inner.find(move |ticket: &Ticket| ticket.user_id == user_id).await?;
        tickets.sort_by_key(|ticket| (ticket.created_at, ticket.id));
        Ok(tickets.iter().map(Ticket::view).collect())
    }

    #[instrument(skip(self))]
    pub async fn tickets_for_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<Vec<TicketView>, FrameworkError<TicketError>> {
        debug!("Sending request");
        let wanted = reference.clone();
        let tickets = self
            .inner
            .find(move |ticket: &Ticket| ticket.payment_reference.as_ref() == Some(&wanted))
            .await?;
        Ok(tickets.iter().map(Ticket::view).collect())
    }

    /// Every committed ticket; used by consistency checks.
    pub async fn all_tickets(&self) -> Result<Vec<TicketView>, FrameworkError<TicketError>> {
        let tickets = self.inner.find(|_: &Ticket| true).await?;
        Ok(tickets.iter().map(Ticket::view).collect())
    }

    /// Operator redemption: ACTIVATED -> USED when the secret matches.
    #[instrument(skip(self, secret))]
    pub async fn redeem(&self, id: TicketId, secret: &str) -> Result<TicketView, FrameworkError<TicketError>> {
        debug!("Sending request");
        let action = TicketAction::Redeem { secret: secret.to_string(), at: Utc::now() };
        self.inner.perform_action(None, id, action).await?;
        let ticket = self
            .inner
            .get(None, id)
            .await?
            .ok_or_else(|| FrameworkError::NotFound { kind: "ticket", id: id.to_string() })?;
        info!(ticket_id = %id, "Ticket redeemed");
        Ok(ticket.view())
    }

    /// The ticket joined with a summary of its catalog item.
    #[instrument(skip(self, catalog))]
    pub async fn details(&self, id: TicketId, catalog: &CatalogClient) -> Result<TicketDetails, LookupError> {
        let ticket = self
            .inner
            .get(None, id)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| LookupError::not_found("ticket", id))?;
        let item = catalog
            .get_item(ticket.item_id)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| LookupError::not_found("catalog item", ticket.item_id))?;
        Ok(TicketDetails { ticket: ticket.view(), item: item.summary() })
    }
}

#[async_trait]
impl TicketStore for TicketClient {
    #[instrument(skip(self, tx, ticket), fields(tx = %tx.id(), item_id = %ticket.item_id))]
    async fn create(&self, tx: &Transaction, ticket: NewTicket) -> Result<TicketId, StoreError> {
        debug!("Sending request");
        Ok(self.inner.create(Some(tx.id()), ticket).await?)
    }

    #[instrument(skip(self, tx), fields(tx = %tx.id()))]
    async fn attach_payment_reference(
        &self,
        tx: &Transaction,
        ticket_id: TicketId,
        reference: PaymentReference,
    ) -> Result<Ticket, StoreError> {
        debug!("Sending request");
        self.inner
            .perform_action(Some(tx.id()), ticket_id, TicketAction::AttachPaymentReference(reference))
            .await?;
        self.inner
            .get(Some(tx.id()), ticket_id)
            .await?
            .ok_or_else(|| StoreError::rejected(format!("ticket {ticket_id} vanished inside its transaction")))
    }
}
