//! HTTP clients for the gateway's external money partners.
//!
//! [`VantApi`] talks to the Vant-like bank rail (reserved accounts, account resolution, outward
//! transfers); [`ChargeApi`] talks to the Paystack-like card-charge provider. Both carry bounded request
//! timeouts, and the rail's bearer token lives in an injected [`TokenCache`] rather than module state.
mod api;
mod charge;
mod config;
pub mod data_objects;
mod error;

pub use api::{TokenCache, VantApi};
pub use charge::ChargeApi;
pub use config::{ChargeConfig, VantConfig};
pub use error::{ChargeApiError, VantApiError};
