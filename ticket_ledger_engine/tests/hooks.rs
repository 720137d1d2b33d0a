use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use log::*;
use ticket_ledger_engine::{
    db_types::{LineItem, OrderId, TicketCategory},
    events::{EventHandlers, EventHooks},
    ReconcileOutcome,
};

use crate::support::TestLedger;

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
    orders: Arc<Mutex<Vec<OrderId>>>,
}

impl HookCalled {
    pub fn called(&self, order_id: OrderId) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
        self.orders.lock().unwrap().push(order_id);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

fn adult_tent() -> Vec<LineItem> {
    vec![LineItem::ticket("adult-tent".parse::<TicketCategory>().unwrap(), 1)]
}

#[tokio::test]
async fn order_paid_hook_fires_once_per_order() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let paid = HookCalled::default();
    let failed = HookCalled::default();
    let mut hooks = EventHooks::default();
    let paid_copy = paid.clone();
    let failed_copy = failed.clone();
    hooks
        .on_order_paid(move |ev| {
            info!("🪝️ Order paid: {}", ev.order.order_id);
            assert!(!ev.aggregations.is_empty());
            paid_copy.called(ev.order.order_id);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_payment_failed(move |ev| {
            info!("🪝️ Payment failed: {}", ev.order.order_id);
            failed_copy.called(ev.order.order_id);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    let handlers = EventHandlers::new(16, hooks);
    let ledger = TestLedger::with_producers(handlers.producers()).await;
    handlers.start_handlers().await;

    ledger.register("alice", 1).await;
    ledger.register("bob", 1).await;
    let alice = ledger.checkout.checkout("alice", &adult_tent()).await.unwrap();
    let bob = ledger.checkout.checkout("bob", &adult_tent()).await.unwrap();
    assert_eq!(ledger.deliver("succeeded", &alice.payment_intent_id).await.unwrap(), ReconcileOutcome::Applied);
    assert_eq!(
        ledger.deliver("succeeded", &alice.payment_intent_id).await.unwrap(),
        ReconcileOutcome::AlreadyProcessed
    );
    ledger.deliver("payment_failed", &bob.payment_intent_id).await.unwrap();

    // Handlers run in the background
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(paid.count(), 1);
    assert_eq!(*paid.orders.lock().unwrap(), vec![alice.order_id]);
    assert_eq!(failed.count(), 1);
    assert_eq!(*failed.orders.lock().unwrap(), vec![bob.order_id]);
    ledger.tear_down().await;
}
