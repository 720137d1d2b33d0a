//! Request handler definitions
//!
//! Define each route and its handler here. Handlers only translate between HTTP and the ledger APIs; anything more
//! than a few lines belongs in the engine.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every call to the record store or the payment processor is a
//! network round trip, so they are all awaited rather than blocked on.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde_json::json;
use stripe_tools::SIGNATURE_HEADER;
use ticket_ledger_engine::{
    traits::{PaymentProcessor, ProcessorError, RecordStore},
    CheckoutApi,
    LedgerApi,
    LedgerError,
    ReconciliationApi,
};

use crate::{
    data_objects::{AggregationSnapshot, CartQuote, CartRequest, CheckoutResponse, WebhookResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(price_cart => Post "/cart/price" impl RecordStore, PaymentProcessor);
/// Prices a cart and checks it against the purchaser's limits and the remaining capacity. Nothing is saved.
pub async fn price_cart<B: RecordStore, P: PaymentProcessor>(
    body: web::Json<CartRequest>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let CartRequest { username, items } = body.into_inner();
    debug!("💻️ POST price cart for {username} ({} line items)", items.len());
    let order = api.price_cart(&username, &items).await?;
    Ok(HttpResponse::Ok().json(CartQuote::from(&order)))
}

route!(checkout => Post "/checkout" impl RecordStore, PaymentProcessor);
/// Prices the cart and opens (or updates) the purchaser's order and payment intent.
///
/// Submitting the same cart again returns the same payment intent. Submitting a different cart while the order is
/// still open updates the order and the intent's amount in place.
pub async fn checkout<B: RecordStore, P: PaymentProcessor>(
    body: web::Json<CartRequest>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let CartRequest { username, items } = body.into_inner();
    debug!("💻️ POST checkout for {username}");
    let session = api.checkout(&username, &items).await?;
    info!("💻️ Checkout for {username}: order {} / {}", session.order_id, session.payment_intent_id);
    Ok(HttpResponse::Ok().json(CheckoutResponse::from(session)))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/webhook/payments" impl RecordStore, PaymentProcessor);
/// Receives payment lifecycle events from the payment processor.
///
/// The body is read as raw bytes, since the signature covers the exact payload. A bad signature is answered with a
/// 400 and the event is dropped. So is a correctly signed payload that cannot be parsed, since delivering it again
/// cannot change the outcome. Any other failure is answered with a 500 so that the processor delivers the event
/// again; applying an event twice is harmless.
pub async fn payment_webhook<B: RecordStore, P: PaymentProcessor>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::InvalidSignature(format!("No {SIGNATURE_HEADER} header")))?;
    trace!("💻️ Payment webhook received ({} bytes)", body.len());
    match api.handle_payment_event(&body, signature).await {
        Ok(outcome) => {
            debug!("💻️ Payment event handled: {outcome:?}");
            Ok(HttpResponse::Ok().json(WebhookResponse { outcome }))
        },
        Err(LedgerError::Signature(e)) => {
            warn!("💻️ Rejected a payment webhook with a bad signature. {e}");
            Err(ServerError::InvalidSignature(e))
        },
        Err(LedgerError::Processor(ProcessorError::MalformedEvent(e))) => {
            warn!("💻️ Rejected a signed payment webhook that could not be parsed. {e}");
            Err(ServerError::InvalidRequestBody(e))
        },
        Err(e) => {
            error!("💻️ Could not process payment event. It will be redelivered. {e}");
            Err(ServerError::ReconciliationFailed(e.to_string()))
        },
    }
}

//----------------------------------------------   Ledger  ----------------------------------------------------
route!(aggregations => Get "/aggregations" impl RecordStore);
pub async fn aggregations<B: RecordStore>(api: web::Data<LedgerApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET aggregations");
    let result = api.list_aggregations().await?.into_iter().map(AggregationSnapshot::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

route!(aggregation => Get "/aggregations/{name}" impl RecordStore);
pub async fn aggregation<B: RecordStore>(
    path: web::Path<String>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let name = path.into_inner();
    debug!("💻️ GET aggregation {name}");
    let aggregation = api.get_aggregation(&name).await?;
    Ok(HttpResponse::Ok().json(AggregationSnapshot::from(aggregation)))
}

route!(constant => Get "/constants/{name}" impl RecordStore);
pub async fn constant<B: RecordStore>(
    path: web::Path<String>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let name = path.into_inner();
    debug!("💻️ GET constant {name}");
    let constant = api.get_constant(&name).await?;
    Ok(HttpResponse::Ok().json(json!({ "name": constant.name, "value": constant.value })))
}
