use std::fmt::Debug;

use log::*;

use crate::{
    cache::{keys, LedgerCache},
    db::{
        records::{field, order_cart_fields, order_from_record, order_to_fields},
        traits::{Fields, PaymentProcessor, RecordStore, Table},
    },
    db_types::{Order, OrderId, PaymentStatus},
    tle_api::{errors::LedgerError, fetch_one},
};

/// What [`OrderApi::replace_cart`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartReplacement {
    /// The new cart was identical to the old one. Nothing was written.
    Unchanged,
    /// The order now holds the new cart. `intent_updated` is true if the payment intent's amount was changed too.
    Replaced { intent_updated: bool },
}

/// `OrderApi` owns order records and their payment status.
///
/// Orders are never deleted. Their status only ever moves forward (see [`PaymentStatus`]); a failed order is
/// superseded by a new one rather than revived.
pub struct OrderApi<B> {
    db: B,
    cache: Option<LedgerCache>,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B, cache: Option<LedgerCache>) -> Self {
        Self { db, cache }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    fn invalidate(&self, order: &Order) {
        if let Some(cache) = &self.cache {
            cache.delete(&keys::order(&order.order_id));
            if let Some(id) = &order.external_payment_id {
                cache.delete(&keys::order_by_payment(id));
            }
        }
    }

    fn remember(&self, key: &str, order: &Order) {
        if let Some(cache) = &self.cache {
            cache.set_typed(key, order);
        }
    }
}

impl<B> OrderApi<B>
where B: RecordStore
{
    /// Persists a new order and returns it with its record id filled in.
    ///
    /// Fails with [`LedgerError::AlreadyExists`] if the order has already been saved, either according to its own
    /// record id or because the store already holds an order with the same order id.
    pub async fn create(&self, mut order: Order) -> Result<Order, LedgerError> {
        if order.record_id.is_some() {
            return Err(LedgerError::AlreadyExists(order.order_id.to_string()));
        }
        let existing = self.db.query(Table::Orders, field::ORDER_ID, order.order_id.as_str()).await?;
        if !existing.is_empty() {
            warn!("🛒️ Order {} is already in the store as {}", order.order_id, existing[0].id);
            return Err(LedgerError::AlreadyExists(order.order_id.to_string()));
        }
        let id = self.db.create(Table::Orders, order_to_fields(&order)).await?;
        order.record_id = Some(id);
        self.invalidate(&order);
        info!("🛒️ Order {} created for {} ({})", order.order_id, order.purchaser, order.total);
        Ok(order)
    }

    pub async fn get_by_order_id(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let key = keys::order(order_id);
        if let Some(order) = self.cache.as_ref().and_then(|c| c.get_typed::<Order>(&key)) {
            return Ok(order);
        }
        let record = fetch_one(&self.db, Table::Orders, field::ORDER_ID, order_id.as_str()).await?;
        let order = order_from_record(&record)?;
        self.remember(&key, &order);
        Ok(order)
    }

    pub async fn get_by_external_payment_id(&self, payment_id: &str) -> Result<Order, LedgerError> {
        let key = keys::order_by_payment(payment_id);
        if let Some(order) = self.cache.as_ref().and_then(|c| c.get_typed::<Order>(&key)) {
            return Ok(order);
        }
        let order = self.fetch_by_external_payment_id(payment_id).await?;
        self.remember(&key, &order);
        Ok(order)
    }

    /// Like [`Self::get_by_external_payment_id`], but always reads the store. Used where a decision depends on the
    /// current status, since another instance may have changed it.
    pub async fn fetch_by_external_payment_id(&self, payment_id: &str) -> Result<Order, LedgerError> {
        let record = fetch_one(&self.db, Table::Orders, field::PAYMENT_ID, payment_id).await?;
        Ok(order_from_record(&record)?)
    }

    pub async fn orders_for_purchaser(&self, username: &str) -> Result<Vec<Order>, LedgerError> {
        let records = self.db.query(Table::Orders, field::USERNAME, username).await?;
        let orders = records.iter().map(order_from_record).collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// Moves `order` to `status`. Only forward transitions are allowed; anything else fails with
    /// [`LedgerError::InvalidTransition`] without touching the store.
    pub async fn update_status(&self, order: &Order, status: PaymentStatus) -> Result<Order, LedgerError> {
        if !order.payment_status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                order_id: order.order_id.to_string(),
                from: order.payment_status,
                to: status,
            });
        }
        let id = self.record_id(order)?;
        let mut fields = Fields::new();
        fields.insert(field::PAYMENT_STATUS.into(), status.as_remote_str().into());
        self.db.update_partial(Table::Orders, id, fields).await?;
        self.invalidate(order);
        debug!("🛒️ Order {} moved from {} to {status}", order.order_id, order.payment_status);
        Ok(Order { payment_status: status, ..order.clone() })
    }

    /// Records the processor's payment intent for an order that was saved without one. An unset order becomes
    /// pending.
    pub async fn attach_payment_intent(&self, order: &Order, payment_id: &str) -> Result<Order, LedgerError> {
        let id = self.record_id(order)?;
        let status = match order.payment_status {
            PaymentStatus::Unset => PaymentStatus::Pending,
            s => s,
        };
        let mut fields = Fields::new();
        fields.insert(field::PAYMENT_ID.into(), payment_id.into());
        fields.insert(field::PAYMENT_STATUS.into(), status.as_remote_str().into());
        self.db.update_partial(Table::Orders, id, fields).await?;
        self.invalidate(order);
        Ok(Order { external_payment_id: Some(payment_id.to_string()), payment_status: status, ..order.clone() })
    }

    /// Replaces the cart of an open order with the newly priced `replacement`, keeping the existing order's identity
    /// and payment intent.
    ///
    /// Replacing with an identical cart is a no-op. If the total changes and the order already has a payment intent,
    /// the intent's amount is updated first, so a processor failure leaves the stored order untouched.
    pub async fn replace_cart<P: PaymentProcessor>(
        &self,
        existing: &Order,
        replacement: &Order,
        processor: &P,
    ) -> Result<(Order, CartReplacement), LedgerError> {
        if existing.payment_status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                order_id: existing.order_id.to_string(),
                from: existing.payment_status,
                to: existing.payment_status,
            });
        }
        if existing.has_same_cart(replacement) {
            trace!("🛒️ Cart for order {} is unchanged", existing.order_id);
            return Ok((existing.clone(), CartReplacement::Unchanged));
        }
        let id = self.record_id(existing)?;
        let intent_updated = match &existing.external_payment_id {
            Some(intent_id) if existing.total != replacement.total => {
                processor.update_payment_intent_amount(intent_id, replacement.total).await?;
                true
            },
            _ => false,
        };
        let updated = Order {
            cart: replacement.cart.clone(),
            subtotal: replacement.subtotal,
            processing_fee: replacement.processing_fee,
            total: replacement.total,
            total_tickets: replacement.total_tickets,
            unit_prices: replacement.unit_prices.clone(),
            ..existing.clone()
        };
        self.db.update_partial(Table::Orders, id, order_cart_fields(&updated)).await?;
        self.invalidate(existing);
        info!("🛒️ Cart for order {} replaced. New total {}", existing.order_id, updated.total);
        Ok((updated, CartReplacement::Replaced { intent_updated }))
    }

    fn record_id<'a>(&self, order: &'a Order) -> Result<&'a str, LedgerError> {
        order
            .record_id
            .as_deref()
            .ok_or_else(|| LedgerError::NotFound { table: Table::Orders, key: order.order_id.to_string() })
    }
}
