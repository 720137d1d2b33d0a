//! # Ticket ledger public API
//!
//! The `tle_api` module exposes the programmatic API of the ledger. Like the backends it sits on, it is split by
//! concern so that callers only construct what they use.
//!
//! * [`ledger_api`] owns the constants (prices and capacity caps) and the aggregation counters.
//! * [`capacity`] decides whether a cart fits in what is left of each inventory pool.
//! * [`pricing`] turns submitted line items into a priced order.
//! * [`order_api`] stores orders and moves them through their payment lifecycle.
//! * [`purchaser_api`] reads purchaser records and writes the ledger's back-references onto them.
//! * [`checkout_api`] ties the above together with a payment processor to start checkout.
//! * [`reconciliation_api`] consumes authenticated payment events and records completed sales.
//!
//! # API usage
//!
//! Every API is created from a backend that implements the traits it needs, plus an optional shared cache.
//!
//! ```rust,ignore
//! use ticket_ledger_engine::{cache::LedgerCache, LedgerApi, SqliteRecordStore};
//! let db = SqliteRecordStore::new_with_url("sqlite://data/ledger.db", 5).await?;
//! let api = LedgerApi::new(db, LedgerCache::with_ttl(Duration::from_secs(300)));
//! let sold = api.get_aggregation("Total Tickets Sold").await?;
//! ```

pub mod capacity;
pub mod checkout_api;
pub mod errors;
pub mod ledger_api;
pub mod order_api;
pub mod pricing;
pub mod purchaser_api;
pub mod reconciliation_api;

use log::*;

use crate::{
    db::traits::{RecordStore, StoreRecord, Table},
    db_types::PriceTable,
    tle_api::{errors::LedgerError, ledger_api::DEFAULT_FEE_RATE_BPS},
};

/// Ledger-wide settings that are not stored in the record store.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Processing fee rate, in basis points.
    pub fee_rate_bps: i64,
    /// When set, these prices are used instead of the price constants.
    pub fixed_prices: Option<PriceTable>,
    /// Lower-case ISO code of the currency that payment intents are created in.
    pub currency: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self { fee_rate_bps: DEFAULT_FEE_RATE_BPS, fixed_prices: None, currency: "usd".into() }
    }
}

/// Looks up the single record in `table` whose `field` equals `key`.
///
/// Unique keys (order ids, usernames, counter names) are only unique by convention in the record store, so a second
/// match is treated as data corruption rather than silently picking one.
pub(crate) async fn fetch_one<B: RecordStore>(
    db: &B,
    table: Table,
    field: &str,
    key: &str,
) -> Result<StoreRecord, LedgerError> {
    let mut records = db.query(table, field, key).await?;
    match records.len() {
        0 => Err(LedgerError::NotFound { table, key: key.to_string() }),
        1 => Ok(records.remove(0)),
        count => {
            error!("🗃️ {count} records in {table} have {field} = '{key}'. This needs to be fixed by hand.");
            Err(LedgerError::AmbiguousMatch { table, key: key.to_string(), count })
        },
    }
}
