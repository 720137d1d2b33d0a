//! Mapping between ledger types and record store fields.
//!
//! Record stores are loose about types: a number cell may come back as a JSON number or as a string, currency cells
//! may be `607.7` or `"$607.70"`, and empty cells are usually missing altogether. Readers here accept all of those.
//! Writers always emit currency in the store's string format (`"607.70"`).
use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    db::traits::{Fields, RecordStoreError, StoreRecord},
    db_types::{Aggregation, Cart, Constant, Currency, Order, OrderId, PaymentStatus, Purchaser, TicketCategory},
};

pub mod field {
    pub const NAME: &str = "Name";
    pub const VALUE: &str = "Value";
    pub const QUANTITY: &str = "Quantity";
    pub const REVENUE: &str = "Revenue";

    pub const ORDER_ID: &str = "OrderID";
    pub const USERNAME: &str = "Username";
    pub const TOTAL: &str = "Total";
    pub const PROCESSING_FEE: &str = "Processing Fee";
    pub const TOTAL_TICKETS: &str = "Total Tickets";
    pub const DONATION: &str = "Donation Amount";
    pub const PAYMENT_ID: &str = "PaymentIntentID";
    pub const PAYMENT_STATUS: &str = "Payment Status";
    pub const DATE: &str = "Date";

    pub const TICKET_LIMIT: &str = "Ticket Limit";
    pub const ADMISSION_LEVEL: &str = "Admission Level";
    pub const DISCOUNT: &str = "Discount";
    pub const TICKET_ID: &str = "Ticket ID";
}

fn malformed(record: &StoreRecord, name: &str, reason: &str) -> RecordStoreError {
    RecordStoreError::Malformed(format!("record {} field '{name}': {reason}", record.id))
}

fn text(record: &StoreRecord, name: &str) -> Option<String> {
    match record.fields.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(record: &StoreRecord, name: &str) -> Result<String, RecordStoreError> {
    text(record, name).ok_or_else(|| malformed(record, name, "missing"))
}

/// Integer cells. Missing or empty cells read as zero.
fn integer(record: &StoreRecord, name: &str) -> Result<i64, RecordStoreError> {
    match record.fields.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| malformed(record, name, "not an integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| malformed(record, name, "not an integer")),
        Some(_) => Err(malformed(record, name, "not an integer")),
    }
}

fn optional_currency(record: &StoreRecord, name: &str) -> Result<Option<Currency>, RecordStoreError> {
    match record.fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let f = n.as_f64().ok_or_else(|| malformed(record, name, "not a number"))?;
            Currency::from_float(f).map(Some).map_err(|e| malformed(record, name, &e.to_string()))
        },
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Currency::from_str(s).map(Some).map_err(|e| malformed(record, name, &e.to_string())),
        Some(_) => Err(malformed(record, name, "not a currency value")),
    }
}

/// Currency cells. Missing or empty cells read as zero.
fn currency(record: &StoreRecord, name: &str) -> Result<Currency, RecordStoreError> {
    Ok(optional_currency(record, name)?.unwrap_or_default())
}

fn currency_value(c: Currency) -> Value {
    Value::String(c.to_remote_string())
}

//--------------------------------------         Orders         ------------------------------------------------------

pub fn order_to_fields(order: &Order) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::ORDER_ID.into(), order.order_id.as_str().into());
    fields.insert(field::USERNAME.into(), order.purchaser.as_str().into());
    fields.extend(order_cart_fields(order));
    if let Some(id) = &order.external_payment_id {
        fields.insert(field::PAYMENT_ID.into(), id.as_str().into());
    }
    fields.insert(field::PAYMENT_STATUS.into(), order.payment_status.as_remote_str().into());
    fields.insert(field::DATE.into(), order.created_at.to_rfc3339().into());
    fields
}

/// The fields that change when a cart is replaced. Every category is written, so that tickets removed from the cart
/// are zeroed, and their unit prices cleared, rather than left behind.
pub fn order_cart_fields(order: &Order) -> Fields {
    let mut fields = Fields::new();
    for category in TicketCategory::ALL {
        fields.insert(category.order_field(), order.cart.quantity(category).into());
        let unit_price = order.unit_price(category).filter(|_| order.cart.quantity(category) != 0);
        fields.insert(category.unit_price_field(), unit_price.map(currency_value).unwrap_or(Value::Null));
    }
    fields.insert(field::DONATION.into(), currency_value(order.cart.donation));
    fields.insert(field::TOTAL_TICKETS.into(), order.total_tickets.into());
    fields.insert(field::PROCESSING_FEE.into(), currency_value(order.processing_fee));
    fields.insert(field::TOTAL.into(), currency_value(order.total));
    fields
}

pub fn order_from_record(record: &StoreRecord) -> Result<Order, RecordStoreError> {
    let mut cart = Cart::default();
    let mut unit_prices = BTreeMap::new();
    for category in TicketCategory::ALL {
        let quantity = integer(record, &category.order_field())?;
        cart.set_quantity(category, quantity);
        if quantity == 0 {
            continue;
        }
        if let Some(price) = optional_currency(record, &category.unit_price_field())? {
            unit_prices.insert(category, price);
        }
    }
    cart.donation = currency(record, field::DONATION)?;
    let processing_fee = currency(record, field::PROCESSING_FEE)?;
    let total = currency(record, field::TOTAL)?;
    let payment_status = match text(record, field::PAYMENT_STATUS) {
        Some(s) => PaymentStatus::from_str(&s).map_err(|e| malformed(record, field::PAYMENT_STATUS, &e.to_string()))?,
        None => PaymentStatus::Unset,
    };
    let created_at = match text(record, field::DATE) {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| malformed(record, field::DATE, &e.to_string()))?,
        None => DateTime::<Utc>::default(),
    };
    let subtotal = total
        .checked_sub(processing_fee)
        .and_then(|c| c.checked_sub(cart.donation))
        .map_err(|e| malformed(record, field::TOTAL, &e.to_string()))?;
    Ok(Order {
        order_id: OrderId::from(required_text(record, field::ORDER_ID)?),
        record_id: Some(record.id.clone()),
        purchaser: text(record, field::USERNAME).unwrap_or_default(),
        subtotal,
        total_tickets: integer(record, field::TOTAL_TICKETS)?,
        unit_prices,
        cart,
        processing_fee,
        total,
        external_payment_id: text(record, field::PAYMENT_ID),
        payment_status,
        created_at,
    })
}

//--------------------------------------  Aggregations & Constants  --------------------------------------------------

pub fn aggregation_from_record(record: &StoreRecord) -> Result<Aggregation, RecordStoreError> {
    Ok(Aggregation {
        name: required_text(record, field::NAME)?,
        quantity: integer(record, field::QUANTITY)?,
        revenue: currency(record, field::REVENUE)?,
        record_id: Some(record.id.clone()),
    })
}

pub fn aggregation_to_fields(quantity: i64, revenue: Currency) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::QUANTITY.into(), quantity.into());
    fields.insert(field::REVENUE.into(), currency_value(revenue));
    fields
}

pub fn constant_from_record(record: &StoreRecord) -> Result<Constant, RecordStoreError> {
    Ok(Constant {
        name: required_text(record, field::NAME)?,
        value: integer(record, field::VALUE)?,
        record_id: Some(record.id.clone()),
    })
}

pub fn constant_to_fields(value: i64) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::VALUE.into(), value.into());
    fields
}

//--------------------------------------       Purchasers       ------------------------------------------------------

pub fn purchaser_from_record(record: &StoreRecord) -> Result<Purchaser, RecordStoreError> {
    Ok(Purchaser {
        record_id: Some(record.id.clone()),
        username: required_text(record, field::USERNAME)?,
        ticket_limit: integer(record, field::TICKET_LIMIT)?,
        admission_level: text(record, field::ADMISSION_LEVEL).unwrap_or_default(),
        discount: optional_currency(record, field::DISCOUNT)?,
        order_id: text(record, field::ORDER_ID).map(OrderId::from),
        ticket_id: text(record, field::TICKET_ID),
    })
}

pub fn purchaser_to_fields(purchaser: &Purchaser) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::USERNAME.into(), purchaser.username.as_str().into());
    fields.insert(field::TICKET_LIMIT.into(), purchaser.ticket_limit.into());
    fields.insert(field::ADMISSION_LEVEL.into(), purchaser.admission_level.as_str().into());
    if let Some(d) = purchaser.discount {
        fields.insert(field::DISCOUNT.into(), currency_value(d));
    }
    if let Some(id) = &purchaser.order_id {
        fields.insert(field::ORDER_ID.into(), id.as_str().into());
    }
    if let Some(id) = &purchaser.ticket_id {
        fields.insert(field::TICKET_ID.into(), id.as_str().into());
    }
    fields
}
