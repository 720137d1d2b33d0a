use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::{PaymentEvent, PaymentEventKind, PaymentProcessor, RecordStore},
    db_types::{Order, PaymentStatus},
    events::{EventProducers, OrderPaidEvent, PaymentFailedEvent},
    tle_api::{errors::LedgerError, ledger_api::LedgerApi, order_api::OrderApi, purchaser_api::PurchaserApi},
};

/// What [`ReconciliationApi::handle_payment_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The sale was recorded: the order is paid and the counters include it.
    Applied,
    /// The order had already been recorded as paid. Nothing changed.
    AlreadyProcessed,
    /// The order moved to a new status without touching the counters.
    StatusUpdated(PaymentStatus),
    /// The event did not require any action.
    Ignored,
}

/// `ReconciliationApi` brings orders up to date with what the payment processor reports.
///
/// Payment events can arrive more than once, and in any order. A success is applied to the counters exactly once,
/// guarded by the order's status: the status is re-read from the store (never the cache) and set to `Success` before
/// the counters are touched, so a redelivered success finds the order already paid.
///
/// The flip side is that a failure while updating the counters is not healed by redelivery. The order is already
/// `Success` at that point, so the redelivered event is answered with `AlreadyProcessed` and the counters stay short.
/// The error is logged with the order id, and the aggregations for that order must be corrected by hand.
pub struct ReconciliationApi<B, P> {
    ledger: LedgerApi<B>,
    orders: OrderApi<B>,
    purchasers: PurchaserApi<B>,
    processor: P,
    producers: EventProducers,
}

impl<B, P> Debug for ReconciliationApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, P> ReconciliationApi<B, P> {
    pub fn new(
        ledger: LedgerApi<B>,
        orders: OrderApi<B>,
        purchasers: PurchaserApi<B>,
        processor: P,
        producers: EventProducers,
    ) -> Self {
        Self { ledger, orders, purchasers, processor, producers }
    }
}

impl<B, P> ReconciliationApi<B, P>
where
    B: RecordStore,
    P: PaymentProcessor,
{
    /// Authenticates a raw webhook delivery and applies it.
    ///
    /// A bad signature fails with [`LedgerError::Signature`] before anything is read or written.
    pub async fn handle_payment_event(&self, payload: &[u8], signature: &str) -> Result<ReconcileOutcome, LedgerError> {
        let event = self.processor.construct_event(payload, signature)?;
        self.apply_event(event).await
    }

    /// Applies an event that has already been authenticated.
    pub async fn apply_event(&self, event: PaymentEvent) -> Result<ReconcileOutcome, LedgerError> {
        debug!("🔄️ Received payment event {} ({})", event.id, event.kind);
        let intent_id = match (&event.kind, &event.payment_intent_id) {
            (PaymentEventKind::Created | PaymentEventKind::Other(_), _) => {
                trace!("🔄️ Nothing to do for {} event {}", event.kind, event.id);
                return Ok(ReconcileOutcome::Ignored);
            },
            (_, None) => {
                warn!("🔄️ Event {} ({}) does not name a payment intent. Ignoring it.", event.id, event.kind);
                return Ok(ReconcileOutcome::Ignored);
            },
            (_, Some(id)) => id.as_str(),
        };
        let order = self.orders.fetch_by_external_payment_id(intent_id).await?;
        match event.kind {
            PaymentEventKind::Succeeded => self.payment_succeeded(order).await,
            PaymentEventKind::Processing => self.payment_processing(order).await,
            PaymentEventKind::PaymentFailed => self.payment_failed(order).await,
            PaymentEventKind::Created | PaymentEventKind::Other(_) => Ok(ReconcileOutcome::Ignored),
        }
    }

    async fn payment_succeeded(&self, order: Order) -> Result<ReconcileOutcome, LedgerError> {
        match order.payment_status {
            PaymentStatus::Success => {
                info!("🔄️ Order {} has already been recorded as paid", order.order_id);
                return Ok(ReconcileOutcome::AlreadyProcessed);
            },
            PaymentStatus::Failed => {
                error!(
                    "🔄️ Payment for order {} succeeded after it was marked as failed. The purchaser may have paid twice. \
                     This needs a manual reconciliation.",
                    order.order_id
                );
                return Ok(ReconcileOutcome::Ignored);
            },
            _ => {},
        }
        let order = self.orders.update_status(&order, PaymentStatus::Success).await?;
        let aggregations = self.ledger.apply_order_delta(&order).await.map_err(|e| {
            error!(
                "🔄️ Order {} is marked as paid, but its sale could not be added to the counters. Redelivery will not \
                 fix this. The aggregations need a manual correction. {e}",
                order.order_id
            );
            e
        })?;
        match self.purchasers.get_purchaser(&order.purchaser).await {
            Ok(purchaser) => {
                if let Err(e) = self.purchasers.mark_ticket_issued(&purchaser, order.order_id.as_str()).await {
                    warn!("🔄️ Could not write the ticket id for {}: {e}", order.purchaser);
                }
            },
            Err(e) => warn!("🔄️ Order {} was paid, but its purchaser could not be loaded: {e}", order.order_id),
        }
        info!("🔄️ Order {} paid in full ({})", order.order_id, order.total);
        self.call_order_paid_hook(OrderPaidEvent::new(order, aggregations)).await;
        Ok(ReconcileOutcome::Applied)
    }

    async fn payment_processing(&self, order: Order) -> Result<ReconcileOutcome, LedgerError> {
        if !order.payment_status.can_transition_to(PaymentStatus::Processing) {
            trace!("🔄️ Order {} is already {}. Ignoring the processing event.", order.order_id, order.payment_status);
            return Ok(ReconcileOutcome::Ignored);
        }
        self.orders.update_status(&order, PaymentStatus::Processing).await?;
        Ok(ReconcileOutcome::StatusUpdated(PaymentStatus::Processing))
    }

    async fn payment_failed(&self, order: Order) -> Result<ReconcileOutcome, LedgerError> {
        if order.payment_status.is_terminal() {
            debug!("🔄️ Order {} is already {}. Ignoring the failure event.", order.order_id, order.payment_status);
            return Ok(ReconcileOutcome::Ignored);
        }
        let order = self.orders.update_status(&order, PaymentStatus::Failed).await?;
        // Release the purchaser so that their next checkout starts a new order, unless they have already moved on.
        match self.purchasers.get_purchaser(&order.purchaser).await {
            Ok(purchaser) if purchaser.order_id.as_ref() == Some(&order.order_id) => {
                self.purchasers.clear_order_reference(&purchaser).await?;
            },
            Ok(_) => {},
            Err(e) => warn!("🔄️ Could not release {} from failed order {}: {e}", order.purchaser, order.order_id),
        }
        info!("🔄️ Payment for order {} failed", order.order_id);
        self.call_payment_failed_hook(PaymentFailedEvent::new(order)).await;
        Ok(ReconcileOutcome::StatusUpdated(PaymentStatus::Failed))
    }

    async fn call_order_paid_hook(&self, event: OrderPaidEvent) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️ Notifying order paid hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_payment_failed_hook(&self, event: PaymentFailedEvent) {
        for emitter in &self.producers.payment_failed_producer {
            debug!("🔄️ Notifying payment failed hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}
