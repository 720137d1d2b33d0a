use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{
        AgeGroup,
        Cart,
        Currency,
        CurrencyError,
        LineItem,
        Order,
        OrderId,
        PaymentStatus,
        PriceTable,
        Purchaser,
        TicketCategory,
    },
    tle_api::{errors::ValidationError, ledger_api::DEFAULT_FEE_RATE_BPS},
};

/// Turns submitted line items into a priced, not yet persisted, [`Order`].
///
/// All amounts are integer cents. The only rounding step is the processing fee, which is rounded half-up.
#[derive(Debug, Clone)]
pub struct CartPricer {
    prices: PriceTable,
    fee_rate_bps: i64,
}

impl Default for CartPricer {
    fn default() -> Self {
        Self::new(PriceTable::default(), DEFAULT_FEE_RATE_BPS)
    }
}

impl CartPricer {
    pub fn new(prices: PriceTable, fee_rate_bps: i64) -> Self {
        Self { prices, fee_rate_bps }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Prices `items` for `purchaser`.
    ///
    /// * Adult ticket lines may not exceed the purchaser's ticket limit. The limit applies per line, not per order.
    /// * The donation line is in whole dollars. It is added to the total but carries no processing fee.
    /// * A sponsorship discount comes off the ticket subtotal (never below zero). The fee is charged on what remains.
    ///
    /// Quantities and amounts come straight from the purchaser, so all arithmetic is checked. A cart whose totals
    /// do not fit is malformed.
    ///
    /// The returned order has a fresh id, no record id and an unset payment status.
    pub fn price(&self, purchaser: &Purchaser, items: &[LineItem]) -> Result<Order, ValidationError> {
        let too_large = |e: CurrencyError| ValidationError::MalformedCart(format!("the amounts are too large. {e}"));
        let mut cart = Cart::default();
        let mut unit_prices = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut donation_seen = false;
        let mut subtotal = Currency::default();
        for item in items {
            if item.quantity < 0 {
                return Err(ValidationError::MalformedCart(format!("negative quantity for '{}'", item.id)));
            }
            if item.is_donation() {
                if donation_seen {
                    return Err(ValidationError::MalformedCart("more than one donation".into()));
                }
                donation_seen = true;
                if item.amount < 0 {
                    return Err(ValidationError::MalformedCart("negative donation".into()));
                }
                if item.quantity > 0 {
                    cart.donation = Currency::try_from_dollars(item.amount).map_err(too_large)?;
                }
                continue;
            }
            let category = item
                .id
                .parse::<TicketCategory>()
                .map_err(|_| ValidationError::UnknownCategory(item.id.clone()))?;
            if !seen.insert(category) {
                return Err(ValidationError::MalformedCart(format!("'{category}' appears more than once")));
            }
            if item.quantity == 0 {
                continue;
            }
            if category.age == AgeGroup::Adult && item.quantity > purchaser.ticket_limit {
                return Err(ValidationError::TicketLimitExceeded {
                    category: category.key(),
                    limit: purchaser.ticket_limit,
                    requested: item.quantity,
                });
            }
            let unit_price =
                self.prices.price(category).ok_or_else(|| ValidationError::UnknownCategory(item.id.clone()))?;
            subtotal = unit_price.checked_mul(item.quantity).and_then(|v| subtotal.checked_add(v)).map_err(too_large)?;
            cart.set_quantity(category, item.quantity);
            unit_prices.insert(category, unit_price);
        }
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        let total_tickets =
            cart.total_tickets().ok_or_else(|| ValidationError::MalformedCart("too many tickets".into()))?;
        if let Some(discount) = purchaser.discount {
            trace!("🛒️ Applying sponsorship discount of {discount} for {}", purchaser.username);
            subtotal = subtotal.checked_sub(discount).map_err(too_large)?.max(Currency::default());
        }
        let processing_fee = subtotal.apply_rate_bps(self.fee_rate_bps);
        let total = subtotal.checked_add(processing_fee).and_then(|t| t.checked_add(cart.donation)).map_err(too_large)?;
        let order = Order {
            order_id: OrderId::random(),
            record_id: None,
            purchaser: purchaser.username.clone(),
            total_tickets,
            unit_prices,
            cart,
            subtotal,
            processing_fee,
            total,
            external_payment_id: None,
            payment_status: PaymentStatus::Unset,
            created_at: Utc::now(),
        };
        debug!(
            "🛒️ Priced cart for {}: {} tickets, subtotal {subtotal}, fee {processing_fee}, total {total}",
            order.purchaser, order.total_tickets
        );
        Ok(order)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::Admission;

    fn purchaser(limit: i64) -> Purchaser {
        Purchaser {
            record_id: None,
            username: "alice".into(),
            ticket_limit: limit,
            admission_level: "FCFS".into(),
            discount: None,
            order_id: None,
            ticket_id: None,
        }
    }

    fn item(id: &str, quantity: i64) -> LineItem {
        LineItem { id: id.into(), quantity, amount: 0 }
    }

    #[test]
    fn one_adult_cabin() {
        let order = CartPricer::default().price(&purchaser(1), &[item("adult-cabin", 1)]).unwrap();
        assert_eq!(order.subtotal, Currency::from(59_000));
        assert_eq!(order.processing_fee, Currency::from(1_770));
        assert_eq!(order.total, Currency::from(60_770));
        assert_eq!(order.total.to_remote_string(), "607.70");
        assert_eq!(order.total_tickets, 1);
        assert_eq!(order.payment_status, PaymentStatus::Unset);
        assert!(order.record_id.is_none());
    }

    #[test]
    fn donation_carries_no_fee() {
        let items = [item("adult-tent", 2), item("child-sat", 1), LineItem::donation(50)];
        let order = CartPricer::default().price(&purchaser(2), &items).unwrap();
        // 2 * 420 + 70 = 910
        assert_eq!(order.subtotal, Currency::from_dollars(910));
        assert_eq!(order.processing_fee, Currency::new(27, 30).unwrap());
        assert_eq!(order.donation(), Currency::from_dollars(50));
        assert_eq!(order.total, Currency::new(987, 30).unwrap());
    }

    #[test]
    fn fee_rounds_half_up() {
        let child_tent = TicketCategory::new(AgeGroup::Child, Admission::Tent);
        let prices = PriceTable::default().with_price(child_tent, Currency::from(50));
        let order = CartPricer::new(prices, 300).price(&purchaser(1), &[item("child-tent", 1)]).unwrap();
        // 3% of 50 cents is 1.5 cents
        assert_eq!(order.processing_fee, Currency::from(2));
    }

    #[test]
    fn ticket_limit_applies_to_adult_lines_only() {
        let pricer = CartPricer::default();
        let err = pricer.price(&purchaser(1), &[item("adult-cabin", 2)]).unwrap_err();
        let expected = ValidationError::TicketLimitExceeded { category: "adult-cabin".into(), limit: 1, requested: 2 };
        assert_eq!(err, expected);
        let items = [item("adult-cabin", 1), item("adult-tent", 1), item("child-cabin", 3)];
        assert!(pricer.price(&purchaser(1), &items).is_ok());
    }

    #[test]
    fn malformed_carts() {
        let pricer = CartPricer::default();
        let p = purchaser(4);
        assert_eq!(
            pricer.price(&p, &[item("adult-yurt", 1)]).unwrap_err(),
            ValidationError::UnknownCategory("adult-yurt".into())
        );
        assert!(matches!(
            pricer.price(&p, &[item("adult-tent", 1), item("adult-tent", 1)]),
            Err(ValidationError::MalformedCart(_))
        ));
        assert!(matches!(pricer.price(&p, &[item("adult-tent", -1)]), Err(ValidationError::MalformedCart(_))));
        assert!(matches!(
            pricer.price(&p, &[LineItem::donation(5), LineItem::donation(5)]),
            Err(ValidationError::MalformedCart(_))
        ));
        assert_eq!(pricer.price(&p, &[]).unwrap_err(), ValidationError::EmptyCart);
        assert_eq!(pricer.price(&p, &[item("adult-tent", 0)]).unwrap_err(), ValidationError::EmptyCart);
    }

    #[test]
    fn oversized_carts_are_malformed() {
        let pricer = CartPricer::default();
        let p = purchaser(1);
        let err = pricer.price(&p, &[item("child-cabin", i64::MAX / 1_000)]).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedCart(_)));
        let err = pricer.price(&p, &[LineItem::donation(i64::MAX / 10)]).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedCart(_)));
        // Wraps to 84 cents when multiplied without a check
        let err = pricer.price(&p, &[LineItem::donation(184_467_440_737_095_517)]).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedCart(_)));
        // Each line fits, but the sum does not
        let items = [item("child-cabin", i64::MAX / 38_000), item("child-tent", i64::MAX / 21_000)];
        assert!(matches!(pricer.price(&p, &items), Err(ValidationError::MalformedCart(_))));
        // Free tickets cannot overflow the subtotal, only the ticket count
        let items = [item("toddler-cabin", i64::MAX), item("toddler-tent", i64::MAX)];
        assert!(matches!(pricer.price(&p, &items), Err(ValidationError::MalformedCart(_))));
        let items = [item("child-cabin", 1), LineItem::donation(i64::MAX / 100)];
        assert!(matches!(pricer.price(&p, &items), Err(ValidationError::MalformedCart(_))));
    }

    #[test]
    fn unit_prices_are_recorded() {
        let adult_cabin = TicketCategory::new(AgeGroup::Adult, Admission::Cabin);
        let prices = PriceTable::default().with_price(adult_cabin, Currency::from_dollars(600));
        let items = [item("adult-cabin", 1), item("child-tent", 0), LineItem::donation(5)];
        let order = CartPricer::new(prices, 300).price(&purchaser(1), &items).unwrap();
        assert_eq!(order.unit_price(adult_cabin), Some(Currency::from_dollars(600)));
        assert_eq!(order.unit_prices.len(), 1);
        assert!(!order.is_missing_unit_prices());
    }

    #[test]
    fn sponsorship_discount() {
        let mut p = purchaser(1);
        p.discount = Some(Currency::from_dollars(400));
        let order = CartPricer::default().price(&p, &[item("adult-cabin", 1)]).unwrap();
        assert_eq!(order.subtotal, Currency::from_dollars(190));
        assert_eq!(order.processing_fee, Currency::new(5, 70).unwrap());
        p.discount = Some(Currency::from_dollars(1_000));
        let order = CartPricer::default().price(&p, &[item("adult-cabin", 1)]).unwrap();
        assert_eq!(order.subtotal, Currency::default());
        assert_eq!(order.total, Currency::default());
    }

    #[test]
    fn same_cart_same_price() {
        let pricer = CartPricer::default();
        let a = pricer.price(&purchaser(2), &[item("adult-cabin", 2), LineItem::donation(5)]).unwrap();
        let b = pricer.price(&purchaser(2), &[LineItem::donation(5), item("adult-cabin", 2)]).unwrap();
        assert_ne!(a.order_id, b.order_id);
        assert!(a.has_same_cart(&b));
    }
}
