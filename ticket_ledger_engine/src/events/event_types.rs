use serde::{Deserialize, Serialize};

use crate::db_types::{Aggregation, Order};

/// Published once per order, after its payment has succeeded and the sale has been recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    /// The counters as they stood right after this order was added to them.
    pub aggregations: Vec<Aggregation>,
}

impl OrderPaidEvent {
    pub fn new(order: Order, aggregations: Vec<Aggregation>) -> Self {
        Self { order, aggregations }
    }
}

/// Published when a payment fails and the purchaser is released to start a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
}

impl PaymentFailedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
