use std::{env, time::Duration};

use csg_common::Secret;
use log::*;

const DEFAULT_VANT_BASE_URL: &str = "https://api.vant.ng";
const DEFAULT_CHARGE_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Debug, Default)]
pub struct VantConfig {
    /// e.g. "https://api.vant.ng"
    pub base_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Bound on every HTTP call so a hung rail request cannot stall a batch item indefinitely.
    pub request_timeout: Duration,
}

impl VantConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("CSG_VANT_BASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CSG_VANT_BASE_URL is not set. Using the default, {DEFAULT_VANT_BASE_URL}.");
            DEFAULT_VANT_BASE_URL.into()
        });
        let client_id = env::var("CSG_VANT_CLIENT_ID").ok().unwrap_or_else(|| {
            error!("🪛️ CSG_VANT_CLIENT_ID is not set. Rail calls will be rejected.");
            String::default()
        });
        let client_secret = env::var("CSG_VANT_CLIENT_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ CSG_VANT_CLIENT_SECRET is not set. Rail calls will be rejected.");
            String::default()
        });
        Self {
            base_url,
            client_id,
            client_secret: Secret::new(client_secret),
            request_timeout: request_timeout_from_env(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChargeConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub request_timeout: Duration,
}

impl ChargeConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("CSG_CHARGE_BASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CSG_CHARGE_BASE_URL is not set. Using the default, {DEFAULT_CHARGE_BASE_URL}.");
            DEFAULT_CHARGE_BASE_URL.into()
        });
        let secret_key = env::var("CSG_CHARGE_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ CSG_CHARGE_SECRET_KEY is not set. Scheduled charges will be declined.");
            String::default()
        });
        Self { base_url, secret_key: Secret::new(secret_key), request_timeout: request_timeout_from_env() }
    }
}

fn request_timeout_from_env() -> Duration {
    let secs = env::var("CSG_PROVIDER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for CSG_PROVIDER_TIMEOUT_SECS. {e}"))
                .ok()
        })
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    Duration::from_secs(secs)
}
