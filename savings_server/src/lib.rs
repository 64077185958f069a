//! # Cooperative Savings Gateway server
//! This module hosts the HTTP surface of the gateway. It is responsible for:
//! * Listening for incoming webhook deliveries from the bank rail and handing them to the reconciler.
//! * The wallet, withdrawal and remediation endpoints.
//! * Running the recurring-charge worker on its single, well-defined cadence.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `/health`: a health check route that returns a 200 OK response.
//! * `/vant/webhook/inward_transfer`: HMAC-verified inward-transfer notifications from the rail.
//! * `/api/wallet/{account}`, `/api/wallet/{account}/transactions`: wallet queries.
//! * `/api/withdraw`: outward transfers.
//! * `/api/failed_transactions`, `/api/cards/{card_id}/reset_failures`,
//!   `/api/circles/members/{member_id}/reset_failures`: manual remediation.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod server;
pub mod vant_routes;
pub mod worker;

#[cfg(test)]
mod endpoint_tests;
