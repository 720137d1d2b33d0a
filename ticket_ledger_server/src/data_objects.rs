use serde::{Deserialize, Serialize};
use ticket_ledger_engine::{
    db_types::{Aggregation, LineItem, Order, OrderId},
    CheckoutSession,
    ReconcileOutcome,
};

/// The body of the cart pricing and checkout requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartRequest {
    pub username: String,
    pub items: Vec<LineItem>,
}

/// A priced cart, with money in display form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartQuote {
    pub total_tickets: i64,
    pub subtotal: String,
    pub processing_fee: String,
    pub donation: String,
    pub total: String,
}

impl From<&Order> for CartQuote {
    fn from(order: &Order) -> Self {
        Self {
            total_tickets: order.total_tickets,
            subtotal: order.subtotal.to_remote_string(),
            processing_fee: order.processing_fee.to_remote_string(),
            donation: order.donation().to_remote_string(),
            total: order.total.to_remote_string(),
        }
    }
}

/// What the storefront needs to collect payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub client_secret: String,
    pub payment_intent_id: String,
    pub total: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            order_id: session.order_id,
            client_secret: session.client_secret,
            payment_intent_id: session.payment_intent_id,
            total: session.total.to_remote_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregationSnapshot {
    pub name: String,
    pub quantity: i64,
    pub revenue: String,
}

impl From<Aggregation> for AggregationSnapshot {
    fn from(a: Aggregation) -> Self {
        Self { name: a.name, quantity: a.quantity, revenue: a.revenue.to_remote_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookResponse {
    pub outcome: ReconcileOutcome,
}
