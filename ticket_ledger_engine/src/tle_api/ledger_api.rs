use std::{fmt::Debug, str::FromStr};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{keys, LedgerCache},
    db::{
        records::{aggregation_from_record, aggregation_to_fields, constant_from_record, constant_to_fields, field},
        traits::{Fields, RecordStore, Table},
    },
    db_types::{Aggregation, AggregationBucket, Constant, Currency, Order, PriceTable},
    tle_api::{errors::LedgerError, fetch_one, LedgerSettings},
};

/// The processing fee charged on ticket subtotals, and deducted from donations before they are counted, in basis
/// points.
pub const DEFAULT_FEE_RATE_BPS: i64 = 300;

/// How much one order adds to one aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDelta {
    pub bucket: AggregationBucket,
    pub quantity: i64,
    pub revenue: Currency,
}

/// Computes what a successful order contributes to each aggregation bucket. Buckets the order does not touch are
/// left out.
///
/// Per-category buckets count list-price revenue for the tickets they hold, at the unit prices recorded on the order
/// when it was priced. `fallback` values tickets on older orders that carry no unit price. "Total Tickets Sold" and
/// "Full Tickets Sold" count what was actually charged for tickets, i.e. the subtotal after any discount. Neither ever
/// includes the processing fee or the donation. Donations are counted once per order, net of the processing fee rate.
pub fn order_contributions(
    order: &Order,
    fallback: &PriceTable,
    fee_rate_bps: i64,
) -> Result<Vec<BucketDelta>, LedgerError> {
    let cart = &order.cart;
    let mut deltas = Vec::with_capacity(AggregationBucket::ALL.len());
    for bucket in AggregationBucket::ALL {
        let quantity = cart.count_where(|c| bucket.counts(c));
        let revenue = match bucket {
            AggregationBucket::DonationsReceived => continue,
            AggregationBucket::TotalSold | AggregationBucket::FullSold if quantity > 0 => order.subtotal,
            AggregationBucket::TotalSold | AggregationBucket::FullSold => Currency::default(),
            _ => order.ticket_value_where(fallback, |c| bucket.counts(c)).map_err(|e| {
                LedgerError::MalformedRecord(format!("order {} cannot be valued: {e}", order.order_id))
            })?,
        };
        if quantity != 0 || !revenue.is_zero() {
            deltas.push(BucketDelta { bucket, quantity, revenue });
        }
    }
    let donation = cart.donation;
    if donation > Currency::default() {
        let revenue = donation - donation.apply_rate_bps(fee_rate_bps);
        deltas.push(BucketDelta { bucket: AggregationBucket::DonationsReceived, quantity: 1, revenue });
    }
    Ok(deltas)
}

/// Constants and aggregation counters, read through the cache.
pub struct LedgerApi<B> {
    db: B,
    cache: Option<LedgerCache>,
    fee_rate_bps: i64,
    fixed_prices: Option<PriceTable>,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi (fee rate: {}bps)", self.fee_rate_bps)
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, cache: Option<LedgerCache>) -> Self {
        Self { db, cache, fee_rate_bps: DEFAULT_FEE_RATE_BPS, fixed_prices: None }
    }

    pub fn with_fee_rate_bps(mut self, fee_rate_bps: i64) -> Self {
        self.fee_rate_bps = fee_rate_bps;
        self
    }

    /// Use a fixed price table instead of reading prices from the constants table.
    pub fn with_fixed_prices(mut self, prices: PriceTable) -> Self {
        self.fixed_prices = Some(prices);
        self
    }

    pub fn with_settings(mut self, settings: &LedgerSettings) -> Self {
        self.fee_rate_bps = settings.fee_rate_bps;
        self.fixed_prices = settings.fixed_prices.clone();
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn cache(&self) -> Option<&LedgerCache> {
        self.cache.as_ref()
    }

    pub fn fee_rate_bps(&self) -> i64 {
        self.fee_rate_bps
    }

    fn invalidate(&self, key: &str) {
        if let Some(cache) = &self.cache {
            cache.delete(key);
        }
    }
}

impl<B> LedgerApi<B>
where B: RecordStore
{
    pub async fn get_constant(&self, name: &str) -> Result<Constant, LedgerError> {
        let key = keys::constant(name);
        if let Some(constant) = self.cache.as_ref().and_then(|c| c.get_typed::<Constant>(&key)) {
            return Ok(constant);
        }
        let record = fetch_one(&self.db, Table::Constants, field::NAME, name).await?;
        let constant = constant_from_record(&record)?;
        if let Some(cache) = &self.cache {
            cache.set_typed(&key, &constant);
        }
        Ok(constant)
    }

    pub async fn list_constants(&self) -> Result<Vec<Constant>, LedgerError> {
        let records = self.db.list(Table::Constants).await?;
        let constants = records.iter().map(constant_from_record).collect::<Result<Vec<_>, _>>()?;
        Ok(constants)
    }

    /// Sets a constant, creating it if it does not exist yet.
    pub async fn update_constant(&self, name: &str, value: i64) -> Result<Constant, LedgerError> {
        let key = keys::constant(name);
        let existing = self.db.query(Table::Constants, field::NAME, name).await?;
        let record_id = match existing.as_slice() {
            [] => {
                let mut fields = constant_to_fields(value);
                fields.insert(field::NAME.into(), name.into());
                self.db.create(Table::Constants, fields).await?
            },
            [record] => {
                self.db.update_partial(Table::Constants, &record.id, constant_to_fields(value)).await?;
                record.id.clone()
            },
            records => {
                return Err(LedgerError::AmbiguousMatch {
                    table: Table::Constants,
                    key: name.to_string(),
                    count: records.len(),
                })
            },
        };
        self.invalidate(&key);
        info!("🧮️ Constant '{name}' set to {value}");
        Ok(Constant { name: name.to_string(), value, record_id: Some(record_id) })
    }

    /// The price table used for pricing carts and valuing ticket revenue.
    pub async fn price_table(&self) -> Result<PriceTable, LedgerError> {
        match &self.fixed_prices {
            Some(prices) => Ok(prices.clone()),
            None => Ok(PriceTable::from_constants(&self.list_constants().await?)),
        }
    }

    pub async fn get_aggregation(&self, name: &str) -> Result<Aggregation, LedgerError> {
        let bucket = AggregationBucket::from_str(name)
            .map_err(|_| LedgerError::NotFound { table: Table::Aggregations, key: name.to_string() })?;
        let key = keys::aggregation(bucket.name());
        if let Some(aggregation) = self.cache.as_ref().and_then(|c| c.get_typed::<Aggregation>(&key)) {
            return Ok(aggregation);
        }
        let aggregation = self.fetch_aggregation(bucket).await?;
        if let Some(cache) = &self.cache {
            cache.set_typed(&key, &aggregation);
        }
        Ok(aggregation)
    }

    async fn fetch_aggregation(&self, bucket: AggregationBucket) -> Result<Aggregation, LedgerError> {
        let record = fetch_one(&self.db, Table::Aggregations, field::NAME, bucket.name()).await?;
        Ok(aggregation_from_record(&record)?)
    }

    /// Every aggregation in the store, straight from the store.
    pub async fn list_aggregations(&self) -> Result<Vec<Aggregation>, LedgerError> {
        let records = self.db.list(Table::Aggregations).await?;
        let aggregations = records.iter().map(aggregation_from_record).collect::<Result<Vec<_>, _>>()?;
        Ok(aggregations)
    }

    /// Overwrites an aggregation's counters. This is an administrative correction; sales are recorded through
    /// [`Self::apply_order_delta`].
    pub async fn update_aggregation(
        &self,
        name: &str,
        quantity: i64,
        revenue: Currency,
    ) -> Result<Aggregation, LedgerError> {
        let bucket = AggregationBucket::from_str(name)
            .map_err(|_| LedgerError::NotFound { table: Table::Aggregations, key: name.to_string() })?;
        let current = self.fetch_aggregation(bucket).await?;
        let updated = self.write_aggregation(current, quantity, revenue).await?;
        warn!("🧮️ Aggregation '{}' was manually set to {quantity} / {revenue}", bucket.name());
        Ok(updated)
    }

    async fn write_aggregation(
        &self,
        current: Aggregation,
        quantity: i64,
        revenue: Currency,
    ) -> Result<Aggregation, LedgerError> {
        let id = current.record_id.clone().ok_or_else(|| {
            LedgerError::MalformedRecord(format!("aggregation '{}' has no record id", current.name))
        })?;
        let fields: Fields = aggregation_to_fields(quantity, revenue);
        self.db.update_partial(Table::Aggregations, &id, fields).await?;
        self.invalidate(&keys::aggregation(&current.name));
        Ok(Aggregation { quantity, revenue, ..current })
    }

    /// Adds a successful order's contribution to every aggregation bucket it touches.
    ///
    /// Each bucket is a read-modify-write against the store. The reads bypass the cache so that a stale cached
    /// counter is never written back. The store has no transactions: if a write fails part way through, the buckets
    /// already written stay written and the error names the order so that the remainder can be corrected by hand.
    pub async fn apply_order_delta(&self, order: &Order) -> Result<Vec<Aggregation>, LedgerError> {
        let fallback = if order.is_missing_unit_prices() {
            warn!("🧮️ Order {} has no recorded unit prices. Valuing it at current prices", order.order_id);
            self.price_table().await?
        } else {
            PriceTable::default()
        };
        let deltas = order_contributions(order, &fallback, self.fee_rate_bps)?;
        let mut updated = Vec::with_capacity(deltas.len());
        for delta in deltas {
            let current = self.fetch_aggregation(delta.bucket).await.map_err(|e| {
                error!("🧮️ Could not read '{}' while recording order {}: {e}", delta.bucket, order.order_id);
                e
            })?;
            let overflow = || {
                let msg = format!("'{}' would overflow recording order {}", delta.bucket, order.order_id);
                LedgerError::MalformedRecord(msg)
            };
            let quantity = current.quantity.checked_add(delta.quantity).ok_or_else(overflow)?;
            let revenue = current.revenue.checked_add(delta.revenue).map_err(|_| overflow())?;
            let aggregation = self.write_aggregation(current, quantity, revenue).await.map_err(|e| {
                error!(
                    "🧮️ Could not update '{}' while recording order {}. The ledger needs a manual correction: {e}",
                    delta.bucket, order.order_id
                );
                e
            })?;
            debug!(
                "🧮️ '{}' += {} / {} for order {}",
                delta.bucket, delta.quantity, delta.revenue, order.order_id
            );
            updated.push(aggregation);
        }
        info!("🧮️ Order {} recorded in {} aggregations", order.order_id, updated.len());
        Ok(updated)
    }
}
