use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::{NewPaymentIntent, PaymentProcessor, RecordStore},
    db_types::{Currency, LineItem, Order, OrderId, PaymentStatus, Purchaser},
    tle_api::{
        capacity::CapacityGuard,
        errors::{LedgerError, ValidationError},
        ledger_api::LedgerApi,
        order_api::OrderApi,
        pricing::CartPricer,
        purchaser_api::PurchaserApi,
    },
};

/// What the client needs to collect payment for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub order_id: OrderId,
    pub client_secret: String,
    pub payment_intent_id: String,
    pub total: Currency,
}

/// `CheckoutApi` takes a purchaser from a submitted cart to a pending order with a payment intent.
///
/// 1. [`Self::price_cart`] prices the cart and runs the capacity guard. Nothing is written.
/// 2. [`Self::begin_checkout`] either updates the purchaser's open order in place, or creates a new order and a new
///    payment intent. The order id doubles as the processor's idempotency key, so retrying a checkout that failed
///    after the intent was created does not create a second intent.
pub struct CheckoutApi<B, P> {
    ledger: LedgerApi<B>,
    orders: OrderApi<B>,
    purchasers: PurchaserApi<B>,
    processor: P,
    currency: String,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({})", self.currency)
    }
}

impl<B, P> CheckoutApi<B, P> {
    pub fn new(
        ledger: LedgerApi<B>,
        orders: OrderApi<B>,
        purchasers: PurchaserApi<B>,
        processor: P,
        currency: String,
    ) -> Self {
        Self { ledger, orders, purchasers, processor, currency }
    }

    pub fn ledger(&self) -> &LedgerApi<B> {
        &self.ledger
    }

    pub fn orders(&self) -> &OrderApi<B> {
        &self.orders
    }

    pub fn purchasers(&self) -> &PurchaserApi<B> {
        &self.purchasers
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: RecordStore,
    P: PaymentProcessor,
{
    /// Prices `items` for `username` and checks that there is enough inventory left. Returns an unsaved order.
    pub async fn price_cart(&self, username: &str, items: &[LineItem]) -> Result<Order, LedgerError> {
        let purchaser = self.purchasers.get_purchaser(username).await?;
        self.price_cart_for(&purchaser, items).await
    }

    async fn price_cart_for(&self, purchaser: &Purchaser, items: &[LineItem]) -> Result<Order, LedgerError> {
        let prices = self.ledger.price_table().await?;
        let order = CartPricer::new(prices, self.ledger.fee_rate_bps()).price(purchaser, items)?;
        CapacityGuard::new(&self.ledger).check_cart(&order.cart).await?;
        Ok(order)
    }

    /// Prices the cart and starts (or resumes) checkout in one step.
    pub async fn checkout(&self, username: &str, items: &[LineItem]) -> Result<CheckoutSession, LedgerError> {
        let purchaser = self.purchasers.get_purchaser(username).await?;
        let order = self.price_cart_for(&purchaser, items).await?;
        self.begin_checkout(order, &purchaser).await
    }

    /// Starts payment for a priced `order`.
    ///
    /// * If the purchaser already has an open order, its cart is replaced with this one and the existing payment
    ///   intent is reused.
    /// * If their order was paid for, checkout is refused with [`ValidationError::AlreadyPurchased`].
    /// * If their order failed, or they have none, a new order is saved along with a new payment intent.
    pub async fn begin_checkout(&self, order: Order, purchaser: &Purchaser) -> Result<CheckoutSession, LedgerError> {
        if order.total <= Currency::default() {
            return Err(LedgerError::InvalidAmount(order.total));
        }
        if let Some(existing_id) = &purchaser.order_id {
            match self.orders.get_by_order_id(existing_id).await {
                Ok(existing) if existing.payment_status == PaymentStatus::Success => {
                    info!("🛒️ {} has already paid for order {existing_id}", purchaser.username);
                    return Err(ValidationError::AlreadyPurchased.into());
                },
                Ok(existing) if existing.payment_status.is_open() => {
                    return self.resume_checkout(existing, order).await;
                },
                Ok(_) => {
                    debug!("🛒️ Order {existing_id} failed. Starting a new one for {}", purchaser.username);
                },
                Err(LedgerError::NotFound { .. }) => {
                    warn!("🛒️ {} refers to order {existing_id}, which does not exist", purchaser.username);
                },
                Err(e) => return Err(e),
            }
        }
        self.start_checkout(order, purchaser).await
    }

    async fn resume_checkout(&self, existing: Order, replacement: Order) -> Result<CheckoutSession, LedgerError> {
        let (order, _) = self.orders.replace_cart(&existing, &replacement, &self.processor).await?;
        let order = match &order.external_payment_id {
            Some(_) => order,
            None => {
                let intent = self.processor.create_payment_intent(self.new_intent(&order)).await?;
                self.orders.attach_payment_intent(&order, &intent.id).await?
            },
        };
        let payment_intent_id = order.external_payment_id.clone().unwrap_or_default();
        let intent = self.processor.fetch_payment_intent(&payment_intent_id).await?;
        debug!("🛒️ Resuming checkout for order {}", order.order_id);
        Ok(CheckoutSession {
            order_id: order.order_id,
            client_secret: intent.client_secret,
            payment_intent_id,
            total: order.total,
        })
    }

    async fn start_checkout(&self, mut order: Order, purchaser: &Purchaser) -> Result<CheckoutSession, LedgerError> {
        let intent = self.processor.create_payment_intent(self.new_intent(&order)).await?;
        order.external_payment_id = Some(intent.id.clone());
        order.payment_status = PaymentStatus::Pending;
        let order = self.orders.create(order).await.map_err(|e| {
            error!("🛒️ Payment intent {} has no order. It needs to be cancelled by hand: {e}", intent.id);
            e
        })?;
        self.purchasers.set_order_reference(purchaser, &order.order_id).await?;
        info!("🛒️ Checkout started for {}: order {} / intent {}", purchaser.username, order.order_id, intent.id);
        Ok(CheckoutSession {
            order_id: order.order_id,
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            total: order.total,
        })
    }

    fn new_intent(&self, order: &Order) -> NewPaymentIntent {
        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), order.order_id.to_string());
        metadata.insert("username".to_string(), order.purchaser.clone());
        NewPaymentIntent {
            amount: order.total,
            currency: self.currency.clone(),
            idempotency_key: order.order_id.to_string(),
            metadata,
        }
    }
}
