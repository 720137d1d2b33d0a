use actix_web::{http::StatusCode, web, web::ServiceConfig};
use ticket_ledger_engine::{
    db_types::CABIN_CAP,
    traits::{PaymentIntent, ProcessorError},
    CheckoutApi,
    LedgerApi,
    OrderApi,
    PurchaserApi,
    SqliteRecordStore,
};
use tlg_common::Currency;

use super::{
    helpers::{post_request, register, sqlite_store},
    mocks::MockProcessor,
};
use crate::{
    data_objects::CheckoutResponse,
    routes::{CheckoutRoute, PriceCartRoute},
};

const ONE_CABIN: &str = r#"{"username": "alice", "items": [{"id": "adult-cabin", "quantity": 1}]}"#;

fn configure_with(db: SqliteRecordStore, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(
            LedgerApi::new(db.clone(), None),
            OrderApi::new(db.clone(), None),
            PurchaserApi::new(db, None),
            processor,
            "usd".into(),
        );
        cfg.service(PriceCartRoute::<SqliteRecordStore, MockProcessor>::new())
            .service(CheckoutRoute::<SqliteRecordStore, MockProcessor>::new())
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn price_a_cart() {
    let db = sqlite_store().await;
    register(&db, "alice", 1).await;
    // The processor is never called when pricing
    let processor = MockProcessor::new();
    let (status, body) =
        post_request("/cart/price", ONE_CABIN, &[], configure_with(db, processor)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"total_tickets":1,"subtotal":"590.00","processing_fee":"17.70","donation":"0.00","total":"607.70"}"#
    );
}

#[actix_web::test]
async fn checkout_opens_a_payment_intent() {
    let db = sqlite_store().await;
    register(&db, "alice", 1).await;
    let mut processor = MockProcessor::new();
    processor
        .expect_create_payment_intent()
        .withf(|intent| {
            intent.amount == Currency::from(60_770) &&
                intent.currency == "usd" &&
                intent.metadata.get("order_id") == Some(&intent.idempotency_key) &&
                intent.metadata.get("username").map(String::as_str) == Some("alice")
        })
        .times(1)
        .returning(|intent| {
            Ok(PaymentIntent {
                id: "pi_42".into(),
                client_secret: "pi_42_secret_xyz".into(),
                amount: intent.amount,
                status: "requires_payment_method".into(),
            })
        });
    let (status, body) = post_request("/checkout", ONE_CABIN, &[], configure_with(db.clone(), processor))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let session: CheckoutResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(session.payment_intent_id, "pi_42");
    assert_eq!(session.client_secret, "pi_42_secret_xyz");
    assert_eq!(session.total, "607.70");

    let alice = PurchaserApi::new(db, None).get_purchaser("alice").await.unwrap();
    assert_eq!(alice.order_id, Some(session.order_id));
}

#[actix_web::test]
async fn ticket_limits_are_bad_requests() {
    let db = sqlite_store().await;
    register(&db, "alice", 1).await;
    let body = r#"{"username": "alice", "items": [{"id": "adult-tent", "quantity": 2}]}"#;
    let (status, body) =
        post_request("/checkout", body, &[], configure_with(db, MockProcessor::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("at most 1"), "{body}");
}

#[actix_web::test]
async fn unknown_categories_are_bad_requests() {
    let db = sqlite_store().await;
    register(&db, "alice", 4).await;
    let body = r#"{"username": "alice", "items": [{"id": "adult-yurt", "quantity": 1}]}"#;
    let (status, _) =
        post_request("/cart/price", body, &[], configure_with(db, MockProcessor::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn sold_out_pools_are_conflicts() {
    let db = sqlite_store().await;
    register(&db, "alice", 1).await;
    let ledger = LedgerApi::new(db.clone(), None);
    ledger.update_constant(CABIN_CAP, 2).await.unwrap();
    ledger.update_aggregation("Cabin Tickets Sold", 2, Currency::from_dollars(1180)).await.unwrap();
    let (status, body) = post_request("/checkout", ONE_CABIN, &[], configure_with(db, MockProcessor::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("0 remaining"), "{body}");
}

#[actix_web::test]
async fn unknown_purchasers_are_not_found() {
    let db = sqlite_store().await;
    let (status, _) = post_request("/checkout", ONE_CABIN, &[], configure_with(db, MockProcessor::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn processor_outages_are_bad_gateways() {
    let db = sqlite_store().await;
    register(&db, "alice", 1).await;
    let mut processor = MockProcessor::new();
    processor
        .expect_create_payment_intent()
        .times(1)
        .returning(|_| Err(ProcessorError::Transport("operation timed out".into())));
    let (status, _) = post_request("/checkout", ONE_CABIN, &[], configure_with(db.clone(), processor))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let alice = PurchaserApi::new(db, None).get_purchaser("alice").await.unwrap();
    assert!(alice.order_id.is_none());
}

#[actix_web::test]
async fn malformed_bodies_are_rejected() {
    let db = sqlite_store().await;
    let configure = configure_with(db, MockProcessor::new());
    let (status, _) = post_request("/checkout", r#"{"username": "alice"}"#, &[], configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
