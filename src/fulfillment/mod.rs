//! Order fulfillment: turns one paid checkout into activated tickets and
//! inventory decrements, all committed together or not at all.
//!
//! Per event the pipeline
//! 1. short-circuits events already in the processed-event ledger,
//! 2. resolves the paying user,
//! 3. expands line items into one unit per purchased quantity,
//! 4. opens one transaction and records the event in the ledger inside it,
//! 5. runs one task per unit (bounded by a semaphore) that issues, activates
//!    and pays for a ticket,
//! 6. waits for every task to report on the outcome channel, and
//! 7. commits only if every unit succeeded.

mod error;
mod request;
mod task;

pub use error::*;
pub use request::*;
pub use task::{IssuedTicket, TaskOutcome};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, info_span, instrument, warn, Instrument};

use crate::config::FulfillmentConfig;
use crate::domain::{GatewayEventId, NewProcessedEvent, UserId};
use crate::ports::{
    CatalogLookup, EventLedger, InventoryStore, LedgerError, LookupError, StoreError, TicketStore, UserDirectory,
};
use crate::transaction::{with_transaction, Transaction, TransactionCoordinator};

use task::TaskContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Fulfilled { event_id: GatewayEventId, tickets: Vec<IssuedTicket> },
    /// The event was fulfilled by an earlier delivery; nothing was written.
    AlreadyProcessed { event_id: GatewayEventId },
}

/// Stores and lookups the pipeline is wired with.
#[derive(Clone)]
pub struct FulfillmentPorts {
    pub users: Arc<dyn UserDirectory>,
    pub catalog: Arc<dyn CatalogLookup>,
    pub tickets: Arc<dyn TicketStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub ledger: Arc<dyn EventLedger>,
    pub transactions: Arc<dyn TransactionCoordinator>,
}

/// Reasons the unit of work stops before commit.
enum Abort {
    AlreadyProcessed,
    Failed(FulfillmentError),
}

impl From<StoreError> for Abort {
    fn from(err: StoreError) -> Self {
        Abort::Failed(FulfillmentError::Store(err))
    }
}

impl From<FulfillmentError> for Abort {
    fn from(err: FulfillmentError) -> Self {
        Abort::Failed(err)
    }
}

pub struct FulfillmentPipeline {
    ports: FulfillmentPorts,
    config: FulfillmentConfig,
}

impl FulfillmentPipeline {
    pub fn new(ports: FulfillmentPorts, config: FulfillmentConfig) -> Self {
        Self { ports, config }
    }

    #[instrument(
        skip(self, request),
        fields(event_id = %request.event_id, customer_id = %request.customer_id, payment_reference = %request.payment_reference)
    )]
    pub async fn fulfill(&self, request: FulfillmentRequest) -> Result<FulfillmentOutcome, FulfillmentError> {
        info!(line_items = request.line_items.len(), "Fulfilling event");

        if self.ports.ledger.is_processed(&request.event_id).await? {
            info!("Event already processed");
            return Ok(FulfillmentOutcome::AlreadyProcessed { event_id: request.event_id });
        }

        let user = match self.ports.users.find_by_customer_id(&request.customer_id).await {
            Ok(user) => user,
            Err(LookupError::NotFound { .. }) => {
                error!("No user for customer");
                return Err(FulfillmentError::UserNotFound(request.customer_id));
            }
            Err(LookupError::Store(e)) => return Err(e.into()),
        };

        let units = expand_line_items(&request.line_items);
        if units.is_empty() {
            warn!("Event has no purchasable units");
            return Err(FulfillmentError::EmptyOrder);
        }

        let result = with_transaction(self.ports.transactions.as_ref(), |tx| {
            self.run_unit_of_work(tx, &request, user.id, units)
        })
        .await;

        match result {
            Ok(tickets) => {
                info!(tickets = tickets.len(), user_id = %user.id, "Event fulfilled");
                Ok(FulfillmentOutcome::Fulfilled { event_id: request.event_id, tickets })
            }
            Err(Abort::AlreadyProcessed) => {
                info!("Event committed by a concurrent delivery");
                Ok(FulfillmentOutcome::AlreadyProcessed { event_id: request.event_id })
            }
            Err(Abort::Failed(e)) => {
                error!(error = %e, retryable = e.is_retryable(), "Fulfillment rolled back");
                Err(e)
            }
        }
    }

    async fn run_unit_of_work(
        &self,
        tx: Transaction,
        request: &FulfillmentRequest,
        user_id: UserId,
        units: Vec<PurchaseUnit>,
    ) -> Result<Vec<IssuedTicket>, Abort> {
        let entry = NewProcessedEvent {
            event_id: request.event_id.clone(),
            payment_reference: request.payment_reference.clone(),
            tickets_issued: units.len(),
            processed_at: Utc::now(),
        };
        match self.ports.ledger.record(&tx, entry).await {
            Ok(()) => {}
            Err(LedgerError::AlreadyProcessed(_)) => return Err(Abort::AlreadyProcessed),
            Err(LedgerError::InFlight(event_id)) => {
                return Err(FulfillmentError::DuplicateInFlight(event_id).into());
            }
            Err(LedgerError::Store(e)) => return Err(e.into()),
        }

        let ctx = Arc::new(TaskContext {
            catalog: Arc::clone(&self.ports.catalog),
            tickets: Arc::clone(&self.ports.tickets),
            inventory: Arc::clone(&self.ports.inventory),
            transaction: tx,
            user_id,
            payment_reference: request.payment_reference.clone(),
            ticket_term: self.config.ticket_term,
        });

        let mut issued = Vec::new();
        let mut first_failure = None;
        for outcome in self.fan_out(ctx, units).await? {
            match outcome {
                TaskOutcome::Issued(ticket) => issued.push(ticket),
                TaskOutcome::Failed { unit, failure } => {
                    error!(unit, error = %failure, "Unit task failed");
                    first_failure.get_or_insert((unit, failure));
                }
            }
        }
        match first_failure {
            Some((unit, failure)) => Err(FulfillmentError::from_task(unit, failure).into()),
            None => Ok(issued),
        }
    }

    /// Spawns one task per unit and waits until all have reported, ordered by unit.
    async fn fan_out(&self, ctx: Arc<TaskContext>, units: Vec<PurchaseUnit>) -> Result<Vec<TaskOutcome>, FulfillmentError> {
        let total = units.len();
        let (outcome_tx, mut outcome_rx) = mpsc::channel(total.max(1));
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_tasks.max(1)));

        for unit in units {
            let ctx = Arc::clone(&ctx);
            let outcome_tx = outcome_tx.clone();
            let permits = Arc::clone(&permits);
            let span = info_span!("unit_task", unit = unit.index, product_id = %unit.product_id);
            tokio::spawn(
                async move {
                    let index = unit.index;
                    let outcome = match permits.acquire_owned().await {
                        Ok(_permit) => task::materialize(&ctx, unit).await,
                        Err(_) => TaskOutcome::Failed { unit: index, failure: TaskFailure::Lost },
                    };
                    let _ = outcome_tx.send(outcome).await;
                }
                .instrument(span),
            );
        }
        // the channel closes once every task has sent or died
        drop(outcome_tx);

        let barrier = async {
            let mut outcomes = Vec::with_capacity(total);
            while let Some(outcome) = outcome_rx.recv().await {
                outcomes.push(outcome);
            }
            outcomes
        };
        let limit = self.config.processing_timeout;
        let mut outcomes = tokio::time::timeout(limit, barrier).await.map_err(|_| {
            error!(?limit, "Unit tasks did not finish in time");
            FulfillmentError::Timeout(limit)
        })?;

        let reported: HashSet<usize> = outcomes.iter().map(TaskOutcome::unit).collect();
        for unit in (0..total).filter(|unit| !reported.contains(unit)) {
            outcomes.push(TaskOutcome::Failed { unit, failure: TaskFailure::Lost });
        }
        outcomes.sort_by_key(TaskOutcome::unit);
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeDelta;

    use crate::domain::{
        CustomerId, ExternalProductId, InventoryId, ItemId, LineItem, NewTicket, PaymentReference, PurchasableItem,
        Role, Ticket, TicketId, User,
    };
    use crate::ports::{
        DecreaseError, MockCatalogLookup, MockEventLedger, MockInventoryStore, MockTicketStore, MockUserDirectory,
    };
    use crate::transaction::MockTransactionCoordinator;

    struct Ports {
        users: MockUserDirectory,
        catalog: MockCatalogLookup,
        tickets: MockTicketStore,
        inventory: MockInventoryStore,
        ledger: MockEventLedger,
        transactions: MockTransactionCoordinator,
    }

    impl Ports {
        fn new() -> Self {
            Self {
                users: MockUserDirectory::new(),
                catalog: MockCatalogLookup::new(),
                tickets: MockTicketStore::new(),
                inventory: MockInventoryStore::new(),
                ledger: MockEventLedger::new(),
                transactions: MockTransactionCoordinator::new(),
            }
        }

        /// A known user, a fresh event and working ticket writes.
        fn happy() -> Self {
            let mut ports = Self::new();
            ports.users.expect_find_by_customer_id().returning(|customer_id| Ok(user(customer_id)));
            ports.ledger.expect_is_processed().returning(|_| Ok(false));
            ports.ledger.expect_record().returning(|_, _| Ok(()));
            ports.transactions.expect_begin().times(1).returning(|| Ok(Transaction::new()));
            ports.tickets.expect_create().returning(|_, _| Ok(TicketId::random()));
            ports.tickets.expect_attach_payment_reference().returning(|_, id, _| Ok(ticket(id)));
            ports
        }

        fn into_pipeline(self, config: FulfillmentConfig) -> FulfillmentPipeline {
            FulfillmentPipeline::new(
                FulfillmentPorts {
                    users: Arc::new(self.users),
                    catalog: Arc::new(self.catalog),
                    tickets: Arc::new(self.tickets),
                    inventory: Arc::new(self.inventory),
                    ledger: Arc::new(self.ledger),
                    transactions: Arc::new(self.transactions),
                },
                config,
            )
        }
    }

    fn user(customer_id: &CustomerId) -> User {
        User {
            id: UserId::random(),
            email: "ana@example.com".into(),
            credential_hash: "hash".into(),
            customer_id: Some(customer_id.clone()),
            role: Role::Customer,
        }
    }

    fn ticket(id: TicketId) -> Ticket {
        let now = Utc::now();
        Ticket::issue(
            id,
            NewTicket {
                user_id: UserId::random(),
                item_id: ItemId::random(),
                amount: 1,
                created_at: now,
                expires_at: now + TimeDelta::days(1),
            },
        )
    }

    fn item(product_id: &ExternalProductId) -> PurchasableItem {
        PurchasableItem {
            id: ItemId::random(),
            external_id: Some(product_id.clone()),
            title: "Diesel 20L".into(),
            unit_price: 4_000,
            currency: "eur".into(),
            seller: "North Fuel".into(),
            category: "diesel".into(),
            inventory_id: InventoryId::random(),
            units_per_sale: 20,
        }
    }

    fn request(lines: &[(&str, u32)]) -> FulfillmentRequest {
        FulfillmentRequest {
            event_id: GatewayEventId::new("evt_1"),
            customer_id: CustomerId::new("cus_1"),
            payment_reference: PaymentReference::new("pi_1"),
            line_items: lines
                .iter()
                .map(|(product, quantity)| LineItem::new(ExternalProductId::new(*product), *quantity))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_all_units_succeed_and_commit() {
        let mut ports = Ports::happy();
        ports.catalog.expect_find_by_external_id().returning(|product_id| Ok(item(product_id)));
        ports.inventory.expect_decrease().times(3).returning(|_, _, amount| Ok(100 - amount));
        ports.transactions.expect_commit().times(1).returning(|_| Ok(()));
        ports.transactions.expect_rollback().never();

        let outcome = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_a", 2), ("prod_b", 1)]))
            .await
            .unwrap();

        let FulfillmentOutcome::Fulfilled { tickets, .. } = outcome else {
            panic!("expected fulfillment, got {outcome:?}");
        };
        assert_eq!(tickets.iter().map(|t| t.unit).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(tickets.iter().all(|t| t.remaining_inventory == 80));
    }

    #[tokio::test]
    async fn test_already_processed_event_makes_no_writes() {
        let mut ports = Ports::new();
        ports.ledger.expect_is_processed().returning(|_| Ok(true));
        ports.users.expect_find_by_customer_id().never();
        ports.transactions.expect_begin().never();

        let outcome = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_a", 1)]))
            .await
            .unwrap();
        assert_eq!(outcome, FulfillmentOutcome::AlreadyProcessed { event_id: GatewayEventId::new("evt_1") });
    }

    #[tokio::test]
    async fn test_unknown_customer_aborts_before_any_write() {
        let mut ports = Ports::new();
        ports.ledger.expect_is_processed().returning(|_| Ok(false));
        ports
            .users
            .expect_find_by_customer_id()
            .returning(|customer_id| Err(LookupError::not_found("user", customer_id)));
        ports.transactions.expect_begin().never();
        ports.tickets.expect_create().never();
        ports.inventory.expect_decrease().never();

        let err = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_a", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err, FulfillmentError::UserNotFound(CustomerId::new("cus_1")));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected() {
        let mut ports = Ports::new();
        ports.ledger.expect_is_processed().returning(|_| Ok(false));
        ports.users.expect_find_by_customer_id().returning(|customer_id| Ok(user(customer_id)));
        ports.transactions.expect_begin().never();

        let err = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_a", 0)]))
            .await
            .unwrap_err();
        assert_eq!(err, FulfillmentError::EmptyOrder);
    }

    #[tokio::test]
    async fn test_first_failure_by_unit_order_rolls_back() {
        let mut ports = Ports::happy();
        ports.catalog.expect_find_by_external_id().returning(|product_id| {
            if product_id.as_str() == "prod_a" {
                Ok(item(product_id))
            } else {
                Err(LookupError::not_found("catalog item", product_id))
            }
        });
        ports.inventory.expect_decrease().returning(|_, inventory_id, amount| {
            Err(DecreaseError::Insufficient { inventory_id, requested: amount, available: 0 })
        });
        ports.transactions.expect_commit().never();
        ports.transactions.expect_rollback().times(1).returning(|_| Ok(()));

        let err = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_missing", 1), ("prod_a", 1)]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::CatalogItemNotFound { unit: 0, product_id: ExternalProductId::new("prod_missing") }
        );
    }

    #[tokio::test]
    async fn test_concurrent_delivery_of_same_event_is_retryable() {
        let mut ports = Ports::new();
        ports.users.expect_find_by_customer_id().returning(|customer_id| Ok(user(customer_id)));
        ports.ledger.expect_is_processed().returning(|_| Ok(false));
        ports
            .ledger
            .expect_record()
            .returning(|_, entry| Err(LedgerError::InFlight(entry.event_id)));
        ports.transactions.expect_begin().returning(|| Ok(Transaction::new()));
        ports.transactions.expect_rollback().times(1).returning(|_| Ok(()));
        ports.catalog.expect_find_by_external_id().never();

        let err = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_a", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err, FulfillmentError::DuplicateInFlight(GatewayEventId::new("evt_1")));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_ledger_duplicate_at_record_time_reports_already_processed() {
        let mut ports = Ports::new();
        ports.users.expect_find_by_customer_id().returning(|customer_id| Ok(user(customer_id)));
        ports.ledger.expect_is_processed().returning(|_| Ok(false));
        ports
            .ledger
            .expect_record()
            .returning(|_, entry| Err(LedgerError::AlreadyProcessed(entry.event_id)));
        ports.transactions.expect_begin().returning(|| Ok(Transaction::new()));
        ports.transactions.expect_rollback().times(1).returning(|_| Ok(()));

        let outcome = ports
            .into_pipeline(FulfillmentConfig::default())
            .fulfill(request(&[("prod_a", 1)]))
            .await
            .unwrap();
        assert!(matches!(outcome, FulfillmentOutcome::AlreadyProcessed { .. }));
    }

    struct StalledInventory;

    #[async_trait]
    impl InventoryStore for StalledInventory {
        async fn decrease(&self, _tx: &Transaction, _id: InventoryId, _amount: u64) -> Result<u64, DecreaseError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_barrier_timeout_rolls_back() {
        let mut ports = Ports::happy();
        ports.catalog.expect_find_by_external_id().returning(|product_id| Ok(item(product_id)));
        ports.transactions.expect_commit().never();
        ports.transactions.expect_rollback().times(1).returning(|_| Ok(()));

        let config = FulfillmentConfig { processing_timeout: Duration::from_millis(50), ..FulfillmentConfig::default() };
        let mut pipeline = ports.into_pipeline(config);
        pipeline.ports.inventory = Arc::new(StalledInventory);

        let err = pipeline.fulfill(request(&[("prod_a", 2)])).await.unwrap_err();
        assert_eq!(err, FulfillmentError::Timeout(Duration::from_millis(50)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_concurrency_cap_of_one_still_completes() {
        let mut ports = Ports::happy();
        ports.catalog.expect_find_by_external_id().returning(|product_id| Ok(item(product_id)));
        ports.inventory.expect_decrease().times(4).returning(|_, _, _| Ok(1));
        ports.transactions.expect_commit().times(1).returning(|_| Ok(()));

        let config = FulfillmentConfig { max_concurrent_tasks: 1, ..FulfillmentConfig::default() };
        let outcome = ports.into_pipeline(config).fulfill(request(&[("prod_a", 4)])).await.unwrap();
        assert!(matches!(outcome, FulfillmentOutcome::Fulfilled { tickets, .. } if tickets.len() == 4));
    }
}
