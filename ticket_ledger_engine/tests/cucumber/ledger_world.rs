use std::collections::HashMap;

use cucumber::World;
use ticket_ledger_engine::{CheckoutSession, LedgerError, ReconcileOutcome};

use crate::support::TestLedger;

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<TestLedger>,
    /// The payment intent of each purchaser's most recent checkout
    pub intents: HashMap<String, String>,
    pub last_session: Option<CheckoutSession>,
    pub last_error: Option<LedgerError>,
    pub last_outcome: Option<ReconcileOutcome>,
}

impl LedgerWorld {
    pub fn ledger(&self) -> &TestLedger {
        self.system.as_ref().expect("Ledger not initialised")
    }
}
