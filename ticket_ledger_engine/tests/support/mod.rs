#![allow(dead_code)]
use std::sync::atomic::{AtomicU64, Ordering};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use ticket_ledger_engine::{
    cache::LedgerCache,
    db_types::{Aggregation, Purchaser, CABIN_CAP, SALES_CAP, SATURDAY_CAP},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        stub_processor::{StubPaymentProcessor, STUB_SIGNATURE},
    },
    CheckoutApi,
    LedgerApi,
    LedgerError,
    OrderApi,
    PurchaserApi,
    ReconcileOutcome,
    ReconciliationApi,
    SqliteRecordStore,
};

/// A complete ledger on a fresh SQLite store, with an in-memory payment processor.
#[derive(Debug)]
pub struct TestLedger {
    pub db_path: String,
    pub db: SqliteRecordStore,
    pub processor: StubPaymentProcessor,
    pub checkout: CheckoutApi<SqliteRecordStore, StubPaymentProcessor>,
    pub reconciliation: ReconciliationApi<SqliteRecordStore, StubPaymentProcessor>,
    next_event: AtomicU64,
}

impl TestLedger {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteRecordStore::new_with_url(&db_path, 1).await.expect("Error creating connection to database");
        debug!("🚀️ Created test ledger at {db_path}");
        let cache = LedgerCache::with_ttl(std::time::Duration::from_secs(60));
        let processor = StubPaymentProcessor::default();
        let checkout = CheckoutApi::new(
            LedgerApi::new(db.clone(), cache.clone()),
            OrderApi::new(db.clone(), cache.clone()),
            PurchaserApi::new(db.clone(), cache.clone()),
            processor.clone(),
            "usd".into(),
        );
        let reconciliation = ReconciliationApi::new(
            LedgerApi::new(db.clone(), cache.clone()),
            OrderApi::new(db.clone(), cache.clone()),
            PurchaserApi::new(db.clone(), cache),
            processor.clone(),
            producers,
        );
        let ledger = Self { db_path, db, processor, checkout, reconciliation, next_event: AtomicU64::new(1) };
        ledger.set_caps(500, 100, 100).await;
        ledger
    }

    pub fn ledger(&self) -> &LedgerApi<SqliteRecordStore> {
        self.checkout.ledger()
    }

    pub async fn set_caps(&self, sales: i64, cabin: i64, saturday: i64) {
        for (name, value) in [(SALES_CAP, sales), (CABIN_CAP, cabin), (SATURDAY_CAP, saturday)] {
            self.ledger().update_constant(name, value).await.expect("Error setting cap");
        }
    }

    pub async fn register(&self, username: &str, ticket_limit: i64) -> Purchaser {
        let purchaser = Purchaser {
            record_id: None,
            username: username.to_string(),
            ticket_limit,
            admission_level: "FCFS".into(),
            discount: None,
            order_id: None,
            ticket_id: None,
        };
        self.checkout.purchasers().register_purchaser(purchaser).await.expect("Error registering purchaser")
    }

    pub async fn purchaser(&self, username: &str) -> Purchaser {
        self.checkout.purchasers().get_purchaser(username).await.expect("Error fetching purchaser")
    }

    pub async fn aggregation(&self, name: &str) -> Aggregation {
        self.ledger().get_aggregation(name).await.expect("Error fetching aggregation")
    }

    /// Delivers a correctly signed webhook event of `kind` for `intent_id`.
    pub async fn deliver(&self, kind: &str, intent_id: &str) -> Result<ReconcileOutcome, LedgerError> {
        let n = self.next_event.fetch_add(1, Ordering::SeqCst);
        let payload = StubPaymentProcessor::event_payload(&format!("evt_{n}"), kind, intent_id);
        self.reconciliation.handle_payment_event(&payload, STUB_SIGNATURE).await
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&self.db_path).await {
            warn!("🚀️ Could not remove {}: {e}", self.db_path);
        }
    }
}
