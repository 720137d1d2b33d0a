use std::{future::Future, pin::Pin};

use log::*;
use ticket_ledger_engine::events::{EventHooks, OrderPaidEvent, PaymentFailedEvent};

/// The hooks the server runs after the ledger changes. This is where downstream integrations, such as adding paid
/// purchasers to a mailing list, attach.
pub fn ledger_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| Box::pin(log_order_paid(ev)) as Pin<Box<dyn Future<Output = ()> + Send>>)
        .on_payment_failed(|ev| Box::pin(log_payment_failed(ev)) as Pin<Box<dyn Future<Output = ()> + Send>>);
    hooks
}

async fn log_order_paid(ev: OrderPaidEvent) {
    let order = &ev.order;
    info!(
        "📬️ {} paid {} for {} tickets (order {})",
        order.purchaser,
        order.total.to_remote_string(),
        order.total_tickets,
        order.order_id
    );
    for a in &ev.aggregations {
        debug!("📬️ {}: {} sold, {} received", a.name, a.quantity, a.revenue.to_remote_string());
    }
}

async fn log_payment_failed(ev: PaymentFailedEvent) {
    info!("📬️ Payment for order {} by {} failed", ev.order.order_id, ev.order.purchaser);
}
