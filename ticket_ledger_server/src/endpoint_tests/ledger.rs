use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use ticket_ledger_engine::{
    records::field,
    traits::{RecordStoreError, StoreRecord, Table},
    LedgerApi,
};

use super::{helpers::get_request, mocks::MockStore};
use crate::routes::{AggregationRoute, AggregationsRoute, ConstantRoute};

fn aggregation_record(id: &str, name: &str, quantity: i64, revenue: Value) -> StoreRecord {
    let fields = json!({ (field::NAME): name, (field::QUANTITY): quantity, (field::REVENUE): revenue });
    StoreRecord { id: id.to_string(), fields: fields.as_object().cloned().unwrap() }
}

fn configure_with(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(AggregationsRoute::<MockStore>::new())
            .service(AggregationRoute::<MockStore>::new())
            .service(ConstantRoute::<MockStore>::new())
            .app_data(web::Data::new(LedgerApi::new(store, None)));
    }
}

#[actix_web::test]
async fn fetch_one_aggregation() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_query()
        .withf(|table, f, value| *table == Table::Aggregations && f == field::NAME && value == "Cabin Tickets Sold")
        .times(1)
        .returning(|_, _, _| Ok(vec![aggregation_record("rec1", "Cabin Tickets Sold", 3, json!("$1,770.00"))]));
    let (status, body) =
        get_request("/aggregations/Cabin%20Tickets%20Sold", configure_with(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"name":"Cabin Tickets Sold","quantity":3,"revenue":"1770.00"}"#);
}

#[actix_web::test]
async fn unknown_aggregations_are_not_found() {
    let _ = env_logger::try_init().ok();
    // No expectations: the name is rejected before the store is asked
    let store = MockStore::new();
    let (status, body) = get_request("/aggregations/Lunch", configure_with(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. No Aggregations record found for 'Lunch'"}"#);
}

#[actix_web::test]
async fn duplicate_aggregations_are_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_query().returning(|_, _, _| {
        Ok(vec![
            aggregation_record("rec1", "Total Tickets Sold", 3, json!(0)),
            aggregation_record("rec2", "Total Tickets Sold", 4, json!(0)),
        ])
    });
    let (status, body) =
        get_request("/aggregations/Total%20Tickets%20Sold", configure_with(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("2 Aggregations records match 'Total Tickets Sold'"), "{body}");
}

#[actix_web::test]
async fn list_aggregations() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_list().withf(|table| *table == Table::Aggregations).times(1).returning(|_| {
        Ok(vec![
            aggregation_record("rec1", "Total Tickets Sold", 2, json!(1010.0)),
            aggregation_record("rec2", "Donations Received", 1, json!("48.50")),
        ])
    });
    let (status, body) = get_request("/aggregations", configure_with(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body,
        json!([
            {"name": "Total Tickets Sold", "quantity": 2, "revenue": "1010.00"},
            {"name": "Donations Received", "quantity": 1, "revenue": "48.50"}
        ])
    );
}

#[actix_web::test]
async fn fetch_constant() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_query().withf(|table, _, value| *table == Table::Constants && value == "Cabin Cap").returning(
        |_, _, _| {
            let fields = json!({ (field::NAME): "Cabin Cap", (field::VALUE): 100 });
            Ok(vec![StoreRecord { id: "recC".into(), fields: fields.as_object().cloned().unwrap() }])
        },
    );
    let (status, body) = get_request("/constants/Cabin%20Cap", configure_with(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"name":"Cabin Cap","value":100}"#);
}

#[actix_web::test]
async fn store_outages_are_bad_gateways() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_query().returning(|_, _, _| Err(RecordStoreError::Transport("connection reset".into())));
    let (status, _) = get_request("/constants/Sales%20Cap", configure_with(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
