use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use ticket_ledger_engine::{
    db_types::{Purchaser, CABIN_CAP, SALES_CAP, SATURDAY_CAP},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    LedgerApi,
    PurchaserApi,
    SqliteRecordStore,
};

pub async fn get_request<F>(path: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    send(TestRequest::get().uri(path), configure).await
}

pub async fn post_request<F>(
    path: &str,
    body: impl Into<Vec<u8>>,
    headers: &[(&str, &str)],
    configure: F,
) -> Result<(StatusCode, String), String>
where
    F: FnOnce(&mut ServiceConfig),
{
    let mut req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json"));
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    send(req.set_payload(body.into()), configure).await
}

async fn send<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = res.into_body().try_into_bytes().map_err(|_| "Could not read response body".to_string())?;
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

/// A migrated SQLite store in the temp directory, with caps of 500 overall, 100 cabins and 100 Saturday tickets.
pub async fn sqlite_store() -> SqliteRecordStore {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteRecordStore::new_with_url(&url, 1).await.expect("Error creating connection to database");
    let ledger = LedgerApi::new(db.clone(), None);
    for (name, value) in [(SALES_CAP, 500), (CABIN_CAP, 100), (SATURDAY_CAP, 100)] {
        ledger.update_constant(name, value).await.expect("Error setting cap");
    }
    db
}

pub async fn register(db: &SqliteRecordStore, username: &str, ticket_limit: i64) {
    let purchaser = Purchaser {
        record_id: None,
        username: username.to_string(),
        ticket_limit,
        admission_level: "FCFS".into(),
        discount: None,
        order_id: None,
        ticket_id: None,
    };
    PurchaserApi::new(db.clone(), None).register_purchaser(purchaser).await.expect("Error registering purchaser");
}
