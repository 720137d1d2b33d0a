use cucumber::{then, when};
use ticket_ledger_engine::{
    db_types::{LineItem, OrderId, PaymentStatus, TicketCategory},
    LedgerError,
    ReconcileOutcome,
    ValidationError,
};

use crate::cucumber::LedgerWorld;

async fn checkout(world: &mut LedgerWorld, username: &str, items: Vec<LineItem>) {
    let result = world.ledger().checkout.checkout(username, &items).await;
    match result {
        Ok(session) => {
            world.intents.insert(username.to_string(), session.payment_intent_id.clone());
            world.last_session = Some(session);
            world.last_error = None;
        },
        Err(e) => {
            world.last_session = None;
            world.last_error = Some(e);
        },
    }
}

fn tickets(key: &str, quantity: i64) -> LineItem {
    LineItem::ticket(key.parse::<TicketCategory>().expect("Not a ticket category"), quantity)
}

#[when(expr = "'{word}' checks out {int} {word} ticket(s)")]
async fn check_out(world: &mut LedgerWorld, username: String, quantity: i64, category: String) {
    checkout(world, &username, vec![tickets(&category, quantity)]).await;
}

#[when(expr = "'{word}' checks out {int} {word} ticket(s) and donates ${int}")]
async fn check_out_with_donation(
    world: &mut LedgerWorld,
    username: String,
    quantity: i64,
    category: String,
    donation: i64,
) {
    checkout(world, &username, vec![tickets(&category, quantity), LineItem::donation(donation)]).await;
}

async fn deliver(world: &mut LedgerWorld, username: &str, kind: &str) {
    let intent = world.intents.get(username).cloned().expect("Purchaser has not checked out");
    let outcome = world.ledger().deliver(kind, &intent).await.expect("Error handling payment event");
    world.last_outcome = Some(outcome);
}

#[when(expr = "the payment for '{word}' succeeds")]
async fn payment_succeeds(world: &mut LedgerWorld, username: String) {
    deliver(world, &username, "succeeded").await;
}

#[when(expr = "the payment for '{word}' fails")]
async fn payment_fails(world: &mut LedgerWorld, username: String) {
    deliver(world, &username, "payment_failed").await;
}

#[when(expr = "the payment for '{word}' is processing")]
async fn payment_processing(world: &mut LedgerWorld, username: String) {
    deliver(world, &username, "processing").await;
}

#[then(expr = "the checkout total is {word}")]
async fn checkout_total(world: &mut LedgerWorld, total: String) {
    let session = world.last_session.as_ref().expect("Checkout did not succeed");
    assert_eq!(session.total.to_remote_string(), total);
}

#[then(expr = "the checkout is refused because {string}")]
async fn checkout_refused(world: &mut LedgerWorld, reason: String) {
    let err = world.last_error.as_ref().expect("Checkout did not fail");
    let matched = match reason.as_str() {
        "the ticket limit was exceeded" => {
            matches!(err, LedgerError::Validation(ValidationError::TicketLimitExceeded { .. }))
        },
        "the tickets have sold out" => matches!(err, LedgerError::Capacity { .. }),
        "a ticket was already purchased" => {
            matches!(err, LedgerError::Validation(ValidationError::AlreadyPurchased))
        },
        _ => panic!("Unknown refusal reason: {reason}"),
    };
    assert!(matched, "Unexpected error: {err}");
}

#[then(expr = "the payment event is {word}")]
async fn payment_outcome(world: &mut LedgerWorld, outcome: String) {
    let expected = match outcome.as_str() {
        "applied" => ReconcileOutcome::Applied,
        "ignored" => ReconcileOutcome::Ignored,
        "duplicate" => ReconcileOutcome::AlreadyProcessed,
        "failed" => ReconcileOutcome::StatusUpdated(PaymentStatus::Failed),
        "processing" => ReconcileOutcome::StatusUpdated(PaymentStatus::Processing),
        _ => panic!("Unknown outcome: {outcome}"),
    };
    assert_eq!(world.last_outcome, Some(expected));
}

#[then(expr = "{string} stands at {int} for {word}")]
async fn aggregation_is(world: &mut LedgerWorld, name: String, quantity: i64, revenue: String) {
    let aggregation = world.ledger().aggregation(&name).await;
    assert_eq!(aggregation.quantity, quantity, "Wrong quantity for {name}");
    assert_eq!(aggregation.revenue.to_remote_string(), revenue, "Wrong revenue for {name}");
}

#[then(expr = "'{word}' has no open order")]
async fn no_open_order(world: &mut LedgerWorld, username: String) {
    assert!(world.ledger().purchaser(&username).await.order_id.is_none());
}

#[then(expr = "'{word}' holds a ticket")]
async fn holds_ticket(world: &mut LedgerWorld, username: String) {
    let purchaser = world.ledger().purchaser(&username).await;
    assert!(purchaser.ticket_id.is_some());
    assert_eq!(purchaser.ticket_id.map(OrderId::from), purchaser.order_id);
}

#[then(expr = "{int} payment intent(s) has/have been created")]
async fn intents_created(world: &mut LedgerWorld, count: usize) {
    assert_eq!(world.ledger().processor.intents_created(), count);
}
