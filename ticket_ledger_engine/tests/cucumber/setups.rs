use cucumber::given;
use ticket_ledger_engine::db_types::{Currency, Purchaser};

use crate::{cucumber::LedgerWorld, support::TestLedger};

#[given("a fresh ledger")]
async fn fresh_ledger(world: &mut LedgerWorld) {
    world.system = Some(TestLedger::new().await);
}

#[given(expr = "the caps are {int} overall, {int} cabin and {int} Saturday night")]
async fn set_caps(world: &mut LedgerWorld, sales: i64, cabin: i64, saturday: i64) {
    world.ledger().set_caps(sales, cabin, saturday).await;
}

#[given(expr = "{int} cabin tickets have already been sold")]
async fn cabins_sold(world: &mut LedgerWorld, quantity: i64) {
    let revenue = Currency::from_dollars(590) * quantity;
    world.ledger().ledger().update_aggregation("Cabin Tickets Sold", quantity, revenue).await.unwrap();
}

#[given(expr = "purchaser '{word}' with a ticket limit of {int}")]
async fn purchaser(world: &mut LedgerWorld, username: String, limit: i64) {
    world.ledger().register(&username, limit).await;
}

#[given(expr = "sponsored purchaser '{word}' with a discount of ${int}")]
async fn sponsored_purchaser(world: &mut LedgerWorld, username: String, discount: i64) {
    let purchaser = Purchaser {
        record_id: None,
        username,
        ticket_limit: 1,
        admission_level: "Sponsored".into(),
        discount: Some(Currency::from_dollars(discount)),
        order_id: None,
        ticket_id: None,
    };
    world.ledger().checkout.purchasers().register_purchaser(purchaser).await.unwrap();
}
