//! Ticket Ledger Engine
//!
//! The ticket ledger sells a fixed inventory of event tickets. It prices carts, holds the purchaser's order while they
//! pay, and, once the payment processor confirms the payment, records the sale against a set of running counters
//! ("aggregations") that are also used to stop the event from being oversold.
//!
//! The library is divided into these sections:
//! 1. Backend contracts ([`traits`]). The ledger keeps its state in a spreadsheet-style record store and takes
//!    payments through an external processor. Both are traits, so the engine is provider-agnostic. A SQLite record
//!    store ships with the engine; HTTP adapters live in the server crate.
//! 2. The public API ([`LedgerApi`], [`CheckoutApi`], [`ReconciliationApi`] and friends). These implement pricing,
//!    capacity checks, the order lifecycle and payment reconciliation on top of any backend.
//! 3. A small TTL [`cache`] that the APIs read through, since the record store is slow and rate limited.
//!
//! The engine also emits events when an order is paid or a payment fails. See [`mod@events`] for how to hook into
//! them.
pub mod cache;
mod db;
pub mod db_types;
pub mod events;
mod tle_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabaseError, SqliteRecordStore};
pub use db::{records, traits};
pub use tle_api::{
    capacity::{evaluate as evaluate_capacity, CapacityCheck, CapacityGuard},
    checkout_api::{CheckoutApi, CheckoutSession},
    errors::{LedgerError, ValidationError},
    ledger_api::{order_contributions, BucketDelta, LedgerApi, DEFAULT_FEE_RATE_BPS},
    order_api::{CartReplacement, OrderApi},
    pricing::CartPricer,
    purchaser_api::PurchaserApi,
    reconciliation_api::{ReconcileOutcome, ReconciliationApi},
    LedgerSettings,
};
