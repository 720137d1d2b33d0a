//! # Backend contracts
//!
//! The ledger talks to two external collaborators, and this module defines what it needs from each of them.
//!
//! * [`RecordStore`] is a table/record/field store in the shape of a spreadsheet-style database. It has no
//!   transactions and no compare-and-swap, only query, list, create and partial update. The ledger keeps its orders,
//!   counters, constants and purchaser back-references there.
//! * [`PaymentProcessor`] creates and updates payment intents and authenticates the lifecycle events that the
//!   processor later delivers to our webhook.
//!
//! Implementations live elsewhere: a SQLite record store in [`crate::db::sqlite`], and HTTP adapters in the server
//! crate.
mod data_objects;
mod payment_processor;
mod record_store;

pub use data_objects::{
    Fields,
    NewPaymentIntent,
    PaymentEvent,
    PaymentEventKind,
    PaymentIntent,
    StoreRecord,
    Table,
};
pub use payment_processor::{PaymentProcessor, ProcessorError};
pub use record_store::{RecordStore, RecordStoreError};
