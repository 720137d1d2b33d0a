//! Capacity guard.
//!
//! Before an order is created, every inventory pool its cart draws on is compared against the pool's counter and cap.
//! This is check-then-act against a store without transactions, so two purchasers can both pass the check before
//! either payment succeeds and the pool can end up oversold. The guard is best-effort by nature.
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::RecordStore,
    db_types::{CapacityPool, Cart},
    tle_api::{errors::LedgerError, ledger_api::LedgerApi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CapacityCheck {
    Accepted,
    Rejected { remaining: i64 },
}

/// Accepts iff `current + proposed <= cap`. On rejection, reports how many could still be sold (never negative).
pub fn evaluate(current: i64, cap: i64, proposed: i64) -> CapacityCheck {
    if current.saturating_add(proposed) <= cap {
        CapacityCheck::Accepted
    } else {
        CapacityCheck::Rejected { remaining: (cap - current).max(0) }
    }
}

pub struct CapacityGuard<'a, B> {
    ledger: &'a LedgerApi<B>,
}

impl<'a, B> CapacityGuard<'a, B>
where B: RecordStore
{
    pub fn new(ledger: &'a LedgerApi<B>) -> Self {
        Self { ledger }
    }

    pub async fn check_capacity(&self, pool: CapacityPool, proposed: i64) -> Result<CapacityCheck, LedgerError> {
        let current = self.ledger.get_aggregation(pool.bucket().name()).await?.quantity;
        let cap = self.ledger.get_constant(pool.cap_name()).await?.value;
        let result = evaluate(current, cap, proposed);
        trace!("🛒️ {pool} pool: {current} sold of {cap}, {proposed} requested: {result:?}");
        Ok(result)
    }

    /// Checks every pool that `cart` draws on, and fails with [`LedgerError::Capacity`] for the first one that would
    /// be exceeded. Pools the cart does not touch are not checked.
    pub async fn check_cart(&self, cart: &Cart) -> Result<(), LedgerError> {
        for pool in CapacityPool::ALL {
            let demand = pool.demand(cart);
            if demand <= 0 {
                continue;
            }
            if let CapacityCheck::Rejected { remaining } = self.check_capacity(pool, demand).await? {
                info!("🛒️ Cart rejected: {demand} {pool} tickets requested, {remaining} remaining");
                return Err(LedgerError::Capacity { pool, remaining });
            }
        }
        Ok(())
    }
}
