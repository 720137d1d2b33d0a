use std::{
    collections::BTreeMap,
    convert::Infallible,
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
pub use tlg_common::{Currency, CurrencyError};

/// The line item id that carries a donation rather than a ticket.
pub const DONATION_ITEM_ID: &str = "donation";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct ParseKeyError {
    kind: &'static str,
    value: String,
}

impl ParseKeyError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        OrderId       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// A fresh, random order id. Orders get their id before they are persisted, so that the id can double as the
    /// payment processor's idempotency key.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for OrderId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     PaymentStatus     -------------------------------------------------------
/// Where an order is in its payment lifecycle.
///
/// Orders only ever move forward through these states:
///
/// | From \ To  | Pending | Processing | Success | Failed |
/// |------------|---------|------------|---------|--------|
/// | Unset      | ✅      | ✅         | ✅      | ✅     |
/// | Pending    |         | ✅         | ✅      | ✅     |
/// | Processing |         |            | ✅      | ✅     |
/// | Success    |         |            |         |        |
/// | Failed     |         |            |         |        |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unset,
    Pending,
    Processing,
    Success,
    Failed,
}

impl PaymentStatus {
    fn rank(&self) -> u8 {
        match self {
            PaymentStatus::Unset => 0,
            PaymentStatus::Pending => 1,
            PaymentStatus::Processing => 2,
            PaymentStatus::Success | PaymentStatus::Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
    }

    /// An order that can still be paid for, or have its cart replaced.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    /// The value written to the "Payment Status" cell. An unset status is an empty cell.
    pub fn as_remote_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unset => "",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unset => write!(f, "unset"),
            s => write!(f, "{}", s.as_remote_str()),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unset" => Ok(Self::Unset),
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "success" | "succeeded" => Ok(Self::Success),
            "failed" | "payment_failed" => Ok(Self::Failed),
            _ => Err(ParseKeyError::new("payment status", s)),
        }
    }
}

//--------------------------------------    Ticket categories    -----------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Admission {
    Cabin,
    Tent,
    Saturday,
}

impl Admission {
    pub fn key(&self) -> &'static str {
        match self {
            Admission::Cabin => "cabin",
            Admission::Tent => "tent",
            Admission::Saturday => "sat",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Admission::Cabin => "Cabin",
            Admission::Tent => "Tent",
            Admission::Saturday => "Saturday",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeGroup {
    Adult,
    Child,
    Toddler,
}

impl AgeGroup {
    pub fn key(&self) -> &'static str {
        match self {
            AgeGroup::Adult => "adult",
            AgeGroup::Child => "child",
            AgeGroup::Toddler => "toddler",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AgeGroup::Adult => "Adult",
            AgeGroup::Child => "Child",
            AgeGroup::Toddler => "Toddler",
        }
    }
}

/// A ticket type: an age group crossed with an admission tier. The string form is `"<age>-<admission>"`, e.g.
/// `"adult-cabin"` or `"toddler-sat"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketCategory {
    pub age: AgeGroup,
    pub admission: Admission,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 9] = [
        TicketCategory::new(AgeGroup::Adult, Admission::Cabin),
        TicketCategory::new(AgeGroup::Adult, Admission::Tent),
        TicketCategory::new(AgeGroup::Adult, Admission::Saturday),
        TicketCategory::new(AgeGroup::Child, Admission::Cabin),
        TicketCategory::new(AgeGroup::Child, Admission::Tent),
        TicketCategory::new(AgeGroup::Child, Admission::Saturday),
        TicketCategory::new(AgeGroup::Toddler, Admission::Cabin),
        TicketCategory::new(AgeGroup::Toddler, Admission::Tent),
        TicketCategory::new(AgeGroup::Toddler, Admission::Saturday),
    ];

    pub const fn new(age: AgeGroup, admission: Admission) -> Self {
        Self { age, admission }
    }

    pub fn key(&self) -> String {
        format!("{}-{}", self.age.key(), self.admission.key())
    }

    /// The column holding this category's quantity on an order record, e.g. "Adult Saturday Night".
    pub fn order_field(&self) -> String {
        match self.admission {
            Admission::Saturday => format!("{} Saturday Night", self.age.label()),
            a => format!("{} {}", self.age.label(), a.label()),
        }
    }

    /// The column holding the unit price an order was charged for this category, e.g. "Adult Cabin Unit Price".
    pub fn unit_price_field(&self) -> String {
        format!("{} Unit Price", self.order_field())
    }

    /// The name of the constant holding this category's list price in whole dollars, e.g. "Child Tent Price".
    pub fn price_constant(&self) -> String {
        format!("{} {} Price", self.age.label(), self.admission.label())
    }

    /// List price in whole dollars when no price constants are configured.
    pub fn default_price_dollars(&self) -> i64 {
        match (self.age, self.admission) {
            (AgeGroup::Adult, Admission::Cabin) => 590,
            (AgeGroup::Adult, Admission::Tent) => 420,
            (AgeGroup::Adult, Admission::Saturday) => 140,
            (AgeGroup::Child, Admission::Cabin) => 380,
            (AgeGroup::Child, Admission::Tent) => 210,
            (AgeGroup::Child, Admission::Saturday) => 70,
            (AgeGroup::Toddler, _) => 0,
        }
    }
}

impl Display for TicketCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.age.key(), self.admission.key())
    }
}

impl FromStr for TicketCategory {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketCategory::ALL
            .into_iter()
            .find(|c| c.key() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ParseKeyError::new("ticket category", s))
    }
}

impl TryFrom<String> for TicketCategory {
    type Error = ParseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TicketCategory> for String {
    fn from(value: TicketCategory) -> Self {
        value.key()
    }
}

//--------------------------------------       LineItem        -------------------------------------------------------
/// One row of a submitted cart. For tickets, `id` is a category key and `amount` is ignored. For the donation row,
/// `id` is [`DONATION_ITEM_ID`] and `amount` is the donation in whole dollars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub quantity: i64,
    #[serde(default)]
    pub amount: i64,
}

impl LineItem {
    pub fn ticket(category: TicketCategory, quantity: i64) -> Self {
        Self { id: category.key(), quantity, amount: 0 }
    }

    pub fn donation(dollars: i64) -> Self {
        Self { id: DONATION_ITEM_ID.to_string(), quantity: 1, amount: dollars }
    }

    pub fn is_donation(&self) -> bool {
        self.id == DONATION_ITEM_ID
    }
}

//--------------------------------------         Cart          -------------------------------------------------------
/// The priced-independent contents of an order: how many tickets of each category, plus a donation.
///
/// Zero quantities are never stored, so two carts with the same tickets compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    quantities: BTreeMap<TicketCategory, i64>,
    pub donation: Currency,
}

impl Cart {
    pub fn with_tickets(mut self, category: TicketCategory, quantity: i64) -> Self {
        self.set_quantity(category, quantity);
        self
    }

    pub fn with_donation(mut self, donation: Currency) -> Self {
        self.donation = donation;
        self
    }

    pub fn set_quantity(&mut self, category: TicketCategory, quantity: i64) {
        if quantity == 0 {
            self.quantities.remove(&category);
        } else {
            self.quantities.insert(category, quantity);
        }
    }

    pub fn quantity(&self, category: TicketCategory) -> i64 {
        self.quantities.get(&category).copied().unwrap_or(0)
    }

    pub fn tickets(&self) -> impl Iterator<Item = (TicketCategory, i64)> + '_ {
        self.quantities.iter().map(|(c, q)| (*c, *q))
    }

    /// Number of tickets in the cart, or `None` if the count does not fit in an `i64`.
    pub fn total_tickets(&self) -> Option<i64> {
        self.quantities.values().try_fold(0i64, |total, q| total.checked_add(*q))
    }

    /// Number of tickets whose category satisfies `predicate`. Saturates rather than overflowing.
    pub fn count_where<F: Fn(&TicketCategory) -> bool>(&self, predicate: F) -> i64 {
        self.quantities.iter().filter(|(c, _)| predicate(c)).fold(0i64, |total, (_, q)| total.saturating_add(*q))
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty() && self.donation.is_zero()
    }
}

//--------------------------------------         Order         -------------------------------------------------------
/// One checkout attempt by a purchaser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    /// The record store's identity for this order. `None` until the order has been persisted.
    pub record_id: Option<String>,
    pub purchaser: String,
    pub cart: Cart,
    /// The ticket portion of the order, after any sponsorship discount. Excludes the fee and the donation.
    pub subtotal: Currency,
    pub processing_fee: Currency,
    pub total: Currency,
    pub total_tickets: i64,
    /// The list price charged per ticket, for every category in the cart, as of when the cart was priced.
    #[serde(default)]
    pub unit_prices: BTreeMap<TicketCategory, Currency>,
    pub external_payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn donation(&self) -> Currency {
        self.cart.donation
    }

    pub fn unit_price(&self, category: TicketCategory) -> Option<Currency> {
        self.unit_prices.get(&category).copied()
    }

    /// True if some ticket in the cart has no recorded unit price. Orders saved before prices were recorded look
    /// like this.
    pub fn is_missing_unit_prices(&self) -> bool {
        self.cart.tickets().any(|(c, _)| !self.unit_prices.contains_key(&c))
    }

    /// List value of the tickets whose category satisfies `predicate`, at the prices this order was charged.
    /// Categories without a recorded price are valued from `fallback`.
    pub fn ticket_value_where<F: Fn(&TicketCategory) -> bool>(
        &self,
        fallback: &PriceTable,
        predicate: F,
    ) -> Result<Currency, CurrencyError> {
        self.cart.tickets().filter(|(c, _)| predicate(c)).try_fold(Currency::default(), |total, (c, q)| {
            let unit_price = self.unit_price(c).or_else(|| fallback.price(c)).unwrap_or_default();
            total.checked_add(unit_price.checked_mul(q)?)
        })
    }

    /// True if `other` asks for exactly the same tickets and donation at the same price. Identity and status fields
    /// are not compared.
    pub fn has_same_cart(&self, other: &Order) -> bool {
        self.cart == other.cart &&
            self.unit_prices == other.unit_prices &&
            self.subtotal == other.subtotal &&
            self.processing_fee == other.processing_fee &&
            self.total == other.total
    }
}

//--------------------------------------      Aggregation      -------------------------------------------------------
/// A named running counter of tickets sold and revenue received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub name: String,
    pub quantity: i64,
    pub revenue: Currency,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregationBucket {
    TotalSold,
    FullSold,
    CabinSold,
    TentSold,
    SaturdaySold,
    AdultSold,
    ChildSold,
    ToddlerSold,
    DonationsReceived,
}

impl AggregationBucket {
    pub const ALL: [AggregationBucket; 9] = [
        AggregationBucket::TotalSold,
        AggregationBucket::FullSold,
        AggregationBucket::CabinSold,
        AggregationBucket::TentSold,
        AggregationBucket::SaturdaySold,
        AggregationBucket::AdultSold,
        AggregationBucket::ChildSold,
        AggregationBucket::ToddlerSold,
        AggregationBucket::DonationsReceived,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AggregationBucket::TotalSold => "Total Tickets Sold",
            AggregationBucket::FullSold => "Full Tickets Sold",
            AggregationBucket::CabinSold => "Cabin Tickets Sold",
            AggregationBucket::TentSold => "Tent Tickets Sold",
            AggregationBucket::SaturdaySold => "Saturday Night Tickets Sold",
            AggregationBucket::AdultSold => "Adult Tickets Sold",
            AggregationBucket::ChildSold => "Child Tickets Sold",
            AggregationBucket::ToddlerSold => "Toddler Tickets Sold",
            AggregationBucket::DonationsReceived => "Donations Received",
        }
    }

    /// Whether tickets of `category` are counted in this bucket. The donations bucket counts no tickets.
    pub fn counts(&self, category: &TicketCategory) -> bool {
        match self {
            AggregationBucket::TotalSold => true,
            AggregationBucket::FullSold => category.admission != Admission::Saturday,
            AggregationBucket::CabinSold => category.admission == Admission::Cabin,
            AggregationBucket::TentSold => category.admission == Admission::Tent,
            AggregationBucket::SaturdaySold => category.admission == Admission::Saturday,
            AggregationBucket::AdultSold => category.age == AgeGroup::Adult,
            AggregationBucket::ChildSold => category.age == AgeGroup::Child,
            AggregationBucket::ToddlerSold => category.age == AgeGroup::Toddler,
            AggregationBucket::DonationsReceived => false,
        }
    }
}

impl Display for AggregationBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregationBucket {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationBucket::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseKeyError::new("aggregation", s))
    }
}

//--------------------------------------       Constant        -------------------------------------------------------
/// A named integer configuration value, such as a sales cap or a list price in dollars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub record_id: Option<String>,
}

pub const SALES_CAP: &str = "Sales Cap";
pub const CABIN_CAP: &str = "Cabin Cap";
pub const SATURDAY_CAP: &str = "Saturday Night Cap";

/// An inventory pool with a fixed cap, and the aggregation that tracks how much of it has been sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPool {
    /// Every cabin and tent ticket, across all ages. Saturday-only tickets are not counted.
    Overall,
    Cabin,
    Saturday,
}

impl CapacityPool {
    pub const ALL: [CapacityPool; 3] = [CapacityPool::Overall, CapacityPool::Cabin, CapacityPool::Saturday];

    pub fn bucket(&self) -> AggregationBucket {
        match self {
            CapacityPool::Overall => AggregationBucket::FullSold,
            CapacityPool::Cabin => AggregationBucket::CabinSold,
            CapacityPool::Saturday => AggregationBucket::SaturdaySold,
        }
    }

    pub fn cap_name(&self) -> &'static str {
        match self {
            CapacityPool::Overall => SALES_CAP,
            CapacityPool::Cabin => CABIN_CAP,
            CapacityPool::Saturday => SATURDAY_CAP,
        }
    }

    /// How many tickets from `cart` draw on this pool.
    pub fn demand(&self, cart: &Cart) -> i64 {
        let bucket = self.bucket();
        cart.count_where(|c| bucket.counts(c))
    }
}

impl Display for CapacityPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityPool::Overall => write!(f, "overall"),
            CapacityPool::Cabin => write!(f, "cabin"),
            CapacityPool::Saturday => write!(f, "Saturday night"),
        }
    }
}

//--------------------------------------      PriceTable       -------------------------------------------------------
/// List price per ticket category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: BTreeMap<TicketCategory, Currency>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let prices = TicketCategory::ALL
            .into_iter()
            .map(|c| (c, Currency::from_dollars(c.default_price_dollars())))
            .collect();
        Self { prices }
    }
}

impl PriceTable {
    /// Builds a table from price constants (whole dollars). Categories without a constant keep their default price.
    pub fn from_constants(constants: &[Constant]) -> Self {
        let mut table = Self::default();
        for category in TicketCategory::ALL {
            let name = category.price_constant();
            if let Some(c) = constants.iter().find(|c| c.name == name) {
                table.prices.insert(category, Currency::from_dollars(c.value));
            }
        }
        table
    }

    pub fn with_price(mut self, category: TicketCategory, price: Currency) -> Self {
        self.prices.insert(category, price);
        self
    }

    pub fn price(&self, category: TicketCategory) -> Option<Currency> {
        self.prices.get(&category).copied()
    }

}

//--------------------------------------       Purchaser       -------------------------------------------------------
/// The slice of an attendee record that the ledger reads. Only `order_id` and `ticket_id` are ever written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchaser {
    pub record_id: Option<String>,
    pub username: String,
    /// Maximum quantity on any single adult ticket line.
    pub ticket_limit: i64,
    pub admission_level: String,
    /// Amount taken off the ticket subtotal for sponsored purchasers.
    pub discount: Option<Currency>,
    pub order_id: Option<OrderId>,
    pub ticket_id: Option<String>,
}
