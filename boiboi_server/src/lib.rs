//! # Boiboi server
//! This crate hosts the HTTP server for the Boiboi marketplace. It is responsible for:
//! * Serving the marketplace REST API to the customer, merchant and rider apps.
//! * Receiving Paystack webhooks and crediting wallet top-ups.
//! * Running the background workers: withdrawal payouts, rating aggregation and the keep-alive pinger.
//! * Sending push notifications when orders are placed and move along.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/api/ping`: Health check.
//! * `/api/...`: The marketplace API. Requires a bearer access token.
//! * `/api/admin/...`: Back-office endpoints. Requires the admin key.
//! * `/webhook/paystack`: Paystack webhooks. Requests must come from a whitelisted IP and carry a valid signature.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
