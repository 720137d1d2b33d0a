use actix_web::{http::StatusCode, web, web::ServiceConfig};
use stripe_tools::SIGNATURE_HEADER;
use ticket_ledger_engine::{
    db_types::{LineItem, TicketCategory},
    events::EventProducers,
    test_utils::stub_processor::{StubPaymentProcessor, STUB_SIGNATURE},
    traits::{PaymentEvent, PaymentEventKind, ProcessorError, RecordStoreError},
    CheckoutApi,
    LedgerApi,
    OrderApi,
    PurchaserApi,
    ReconciliationApi,
    SqliteRecordStore,
};

use super::{
    helpers::{get_request, post_request, register, sqlite_store},
    mocks::{MockProcessor, MockStore},
};
use crate::routes::{AggregationRoute, PaymentWebhookRoute};

const PAYLOAD: &str = r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

/// Handling a webhook only reads orders, so the ledger and purchaser stores are left without expectations.
fn configure_mocks(orders: MockStore, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ReconciliationApi::new(
            LedgerApi::new(MockStore::new(), None),
            OrderApi::new(orders, None),
            PurchaserApi::new(MockStore::new(), None),
            processor,
            EventProducers::default(),
        );
        cfg.service(PaymentWebhookRoute::<MockStore, MockProcessor>::new()).app_data(web::Data::new(api));
    }
}

fn configure_sqlite(db: SqliteRecordStore, processor: StubPaymentProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ReconciliationApi::new(
            LedgerApi::new(db.clone(), None),
            OrderApi::new(db.clone(), None),
            PurchaserApi::new(db.clone(), None),
            processor,
            EventProducers::default(),
        );
        cfg.service(PaymentWebhookRoute::<SqliteRecordStore, StubPaymentProcessor>::new())
            .service(AggregationRoute::<SqliteRecordStore>::new())
            .app_data(web::Data::new(LedgerApi::new(db, None)))
            .app_data(web::Data::new(api));
    }
}

fn event(kind: PaymentEventKind, intent: Option<&str>) -> PaymentEvent {
    PaymentEvent { id: "evt_1".into(), kind, payment_intent_id: intent.map(String::from) }
}

#[actix_web::test]
async fn missing_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let configure = configure_mocks(MockStore::new(), MockProcessor::new());
    let (status, body) = post_request("/webhook/payments", PAYLOAD, &[], configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid webhook signature. No Stripe-Signature header"}"#);
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor
        .expect_construct_event()
        .withf(|payload, signature| payload == PAYLOAD.as_bytes() && signature == "t=1,v1=beef")
        .times(1)
        .returning(|_, _| Err(ProcessorError::InvalidSignature("signature mismatch".into())));
    // The store must not be touched
    let headers = [(SIGNATURE_HEADER, "t=1,v1=beef")];
    let configure = configure_mocks(MockStore::new(), processor);
    let (status, body) = post_request("/webhook/payments", PAYLOAD, &headers, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid webhook signature. signature mismatch"}"#);
}

#[actix_web::test]
async fn unreadable_signed_events_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor
        .expect_construct_event()
        .times(1)
        .returning(|_, _| Err(ProcessorError::MalformedEvent("expected value at line 1 column 1".into())));
    // No order lookup happens, so the store has no expectations
    let headers = [(SIGNATURE_HEADER, "t=1,v1=ok")];
    let configure = configure_mocks(MockStore::new(), processor);
    let (status, body) =
        post_request("/webhook/payments", "not json", &headers, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Could not read request body: expected value at line 1 column 1"}"#);
}

#[actix_web::test]
async fn irrelevant_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor.expect_construct_event().returning(|_, _| Ok(event(PaymentEventKind::Created, Some("pi_1"))));
    let headers = [(SIGNATURE_HEADER, "t=1,v1=ok")];
    let configure = configure_mocks(MockStore::new(), processor);
    let (status, body) = post_request("/webhook/payments", PAYLOAD, &headers, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"outcome":"ignored"}"#);
}

#[actix_web::test]
async fn unknown_intents_are_redelivered() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor.expect_construct_event().returning(|_, _| Ok(event(PaymentEventKind::Succeeded, Some("pi_404"))));
    let mut store = MockStore::new();
    store.expect_query().returning(|_, _, _| Ok(vec![]));
    let headers = [(SIGNATURE_HEADER, "t=1,v1=ok")];
    let configure = configure_mocks(store, processor);
    let (status, body) = post_request("/webhook/payments", PAYLOAD, &headers, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("pi_404"), "{body}");
}

#[actix_web::test]
async fn store_outages_are_redelivered() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor.expect_construct_event().returning(|_, _| Ok(event(PaymentEventKind::Succeeded, Some("pi_1"))));
    let mut store = MockStore::new();
    store.expect_query().returning(|_, _, _| Err(RecordStoreError::Transport("503 Service Unavailable".into())));
    let headers = [(SIGNATURE_HEADER, "t=1,v1=ok")];
    let configure = configure_mocks(store, processor);
    let (status, _) = post_request("/webhook/payments", PAYLOAD, &headers, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn successful_payments_are_counted_once() {
    let _ = env_logger::try_init().ok();
    let db = sqlite_store().await;
    register(&db, "alice", 2).await;
    let processor = StubPaymentProcessor::default();
    let checkout = CheckoutApi::new(
        LedgerApi::new(db.clone(), None),
        OrderApi::new(db.clone(), None),
        PurchaserApi::new(db.clone(), None),
        processor.clone(),
        "usd".into(),
    );
    let tent = LineItem::ticket("adult-tent".parse::<TicketCategory>().unwrap(), 2);
    let session = checkout.checkout("alice", &[tent]).await.unwrap();

    let payload = StubPaymentProcessor::event_payload("evt_7", "succeeded", &session.payment_intent_id);
    let headers = [(SIGNATURE_HEADER, STUB_SIGNATURE)];
    for expected in [r#"{"outcome":"applied"}"#, r#"{"outcome":"already_processed"}"#] {
        let (status, body) = post_request(
            "/webhook/payments",
            payload.clone(),
            &headers,
            configure_sqlite(db.clone(), processor.clone()),
        )
        .await
        .expect("Request failed");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    let (status, body) = get_request("/aggregations/Tent%20Tickets%20Sold", configure_sqlite(db, processor))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"name":"Tent Tickets Sold","quantity":2,"revenue":"840.00"}"#);
}
