mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

pub use api::AirtableApi;
pub use config::AirtableConfig;
pub use data_objects::{AirtableRecord, RecordList};
pub use error::AirtableApiError;
pub use helpers::{equals_formula, escape_formula_string};
