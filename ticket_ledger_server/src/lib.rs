//! # Ticket ledger server
//! This crate hosts the HTTP front end of the ticket ledger. It is responsible for:
//! * Pricing carts and starting checkout for purchasers.
//! * Receiving payment webhooks from Stripe and recording completed sales.
//! * Serving the sales counters and configuration constants.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/cart/price` and `/api/checkout`: Price a cart, or price it and open a payment intent.
//! * `/api/aggregations[/{name}]` and `/api/constants/{name}`: Read the ledger.
//! * `/webhook/payments`: The webhook route for payment lifecycle events from Stripe.

pub mod cache_worker;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod hooks;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
