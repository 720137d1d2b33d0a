use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use ticket_ledger_engine::{
    cache::LedgerCache,
    events::{EventHandlers, EventProducers},
    traits::{PaymentProcessor, RecordStore},
    CheckoutApi,
    LedgerApi,
    OrderApi,
    PurchaserApi,
    ReconciliationApi,
    SqliteRecordStore,
};

#[cfg(feature = "airtable")]
use crate::integrations::airtable::AirtableRecordStore;
use crate::{
    cache_worker::start_cache_purge_worker,
    config::{RecordStoreKind, ServerConfig},
    errors::ServerError,
    hooks::ledger_event_hooks,
    integrations::stripe::StripePaymentProcessor,
    routes::{
        health,
        AggregationRoute,
        AggregationsRoute,
        CheckoutRoute,
        ConstantRoute,
        PaymentWebhookRoute,
        PriceCartRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let processor =
        StripePaymentProcessor::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let cache = LedgerCache::with_ttl(config.cache_ttl);
    if let Some(cache) = &cache {
        let _worker = start_cache_purge_worker(cache.clone());
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, ledger_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = match config.record_store {
        RecordStoreKind::Sqlite => {
            let db = SqliteRecordStore::new_with_url(&config.database_url, 25)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
            create_server_instance(config, db, processor, cache, producers)?
        },
        #[cfg(feature = "airtable")]
        RecordStoreKind::Airtable => {
            let db = AirtableRecordStore::new(config.airtable.clone())
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            create_server_instance(config, db, processor, cache, producers)?
        },
        #[cfg(not(feature = "airtable"))]
        RecordStoreKind::Airtable => {
            return Err(ServerError::ConfigurationError("This server was built without Airtable support".into()));
        },
    };
    srv.await.map_err(ServerError::IOError)
}

pub fn create_server_instance<B, P>(
    config: ServerConfig,
    db: B,
    processor: P,
    cache: Option<LedgerCache>,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: RecordStore + Clone + Send + 'static,
    P: PaymentProcessor + Clone + Send + 'static,
{
    let settings = config.ledger_settings();
    info!(
        "💻️ Fee rate: {}bps. Prices from {}. Currency: {}",
        settings.fee_rate_bps,
        if settings.fixed_prices.is_some() { "the built-in price list" } else { "the constants table" },
        settings.currency
    );
    let srv = HttpServer::new(move || {
        let ledger_api = || LedgerApi::new(db.clone(), cache.clone()).with_settings(&settings);
        let checkout_api = CheckoutApi::new(
            ledger_api(),
            OrderApi::new(db.clone(), cache.clone()),
            PurchaserApi::new(db.clone(), cache.clone()),
            processor.clone(),
            settings.currency.clone(),
        );
        let reconciliation_api = ReconciliationApi::new(
            ledger_api(),
            OrderApi::new(db.clone(), cache.clone()),
            PurchaserApi::new(db.clone(), cache.clone()),
            processor.clone(),
            producers.clone(),
        );
        let api_scope = web::scope("/api")
            .service(PriceCartRoute::<B, P>::new())
            .service(CheckoutRoute::<B, P>::new())
            .service(AggregationsRoute::<B>::new())
            .service(AggregationRoute::<B>::new())
            .service(ConstantRoute::<B>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tlg::access_log"))
            .app_data(web::Data::new(ledger_api()))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(reconciliation_api))
            .service(health)
            .service(PaymentWebhookRoute::<B, P>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
