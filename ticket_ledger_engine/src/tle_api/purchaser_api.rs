use std::fmt::Debug;

use log::*;
use serde_json::Value;

use crate::{
    cache::{keys, LedgerCache},
    db::{
        records::{field, purchaser_from_record, purchaser_to_fields},
        traits::{Fields, RecordStore, Table},
    },
    db_types::{OrderId, Purchaser},
    tle_api::{errors::LedgerError, fetch_one},
};

/// Purchaser records belong to the wider attendee system. The ledger reads them, and only ever writes the order
/// reference and the ticket id.
pub struct PurchaserApi<B> {
    db: B,
    cache: Option<LedgerCache>,
}

impl<B> Debug for PurchaserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PurchaserApi")
    }
}

impl<B> PurchaserApi<B> {
    pub fn new(db: B, cache: Option<LedgerCache>) -> Self {
        Self { db, cache }
    }
}

impl<B> PurchaserApi<B>
where B: RecordStore
{
    pub async fn get_purchaser(&self, username: &str) -> Result<Purchaser, LedgerError> {
        let key = keys::purchaser(username);
        if let Some(p) = self.cache.as_ref().and_then(|c| c.get_typed::<Purchaser>(&key)) {
            return Ok(p);
        }
        let record = fetch_one(&self.db, Table::Purchasers, field::USERNAME, username).await?;
        let purchaser = purchaser_from_record(&record)?;
        if let Some(cache) = &self.cache {
            cache.set_typed(&key, &purchaser);
        }
        Ok(purchaser)
    }

    /// Adds a purchaser record. Normally the attendee system does this; the ledger only needs it for local setups.
    pub async fn register_purchaser(&self, purchaser: Purchaser) -> Result<Purchaser, LedgerError> {
        let id = self.db.create(Table::Purchasers, purchaser_to_fields(&purchaser)).await?;
        debug!("🛒️ Registered purchaser {}", purchaser.username);
        Ok(Purchaser { record_id: Some(id), ..purchaser })
    }

    /// Points the purchaser at their current order.
    pub async fn set_order_reference(&self, purchaser: &Purchaser, order_id: &OrderId) -> Result<Purchaser, LedgerError> {
        self.write_field(purchaser, field::ORDER_ID, order_id.as_str().into()).await?;
        Ok(Purchaser { order_id: Some(order_id.clone()), ..purchaser.clone() })
    }

    /// Clears the purchaser's order reference so that a fresh order can be created for them.
    pub async fn clear_order_reference(&self, purchaser: &Purchaser) -> Result<Purchaser, LedgerError> {
        self.write_field(purchaser, field::ORDER_ID, "".into()).await?;
        Ok(Purchaser { order_id: None, ..purchaser.clone() })
    }

    pub async fn mark_ticket_issued(&self, purchaser: &Purchaser, ticket_id: &str) -> Result<Purchaser, LedgerError> {
        self.write_field(purchaser, field::TICKET_ID, ticket_id.into()).await?;
        info!("🛒️ Ticket {ticket_id} issued to {}", purchaser.username);
        Ok(Purchaser { ticket_id: Some(ticket_id.to_string()), ..purchaser.clone() })
    }

    async fn write_field(&self, purchaser: &Purchaser, name: &str, value: Value) -> Result<(), LedgerError> {
        let id = purchaser
            .record_id
            .as_deref()
            .ok_or_else(|| LedgerError::NotFound { table: Table::Purchasers, key: purchaser.username.clone() })?;
        let mut fields = Fields::new();
        fields.insert(name.into(), value);
        self.db.update_partial(Table::Purchasers, id, fields).await?;
        if let Some(cache) = &self.cache {
            cache.delete(&keys::purchaser(&purchaser.username));
        }
        Ok(())
    }
}
