//! Adapters that plug the HTTP clients into the ledger's backend traits.
#[cfg(feature = "airtable")]
pub mod airtable;
pub mod stripe;
