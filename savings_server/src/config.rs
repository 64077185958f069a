use std::{env, net::IpAddr, time::Duration};

use csg_common::{parse_boolean_flag, Secret};
use log::*;
use vant_tools::{ChargeConfig, VantConfig};

const DEFAULT_CSG_HOST: &str = "127.0.0.1";
const DEFAULT_CSG_PORT: u16 = 8360;
/// One well-defined cadence for both the contribution and circle sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_CHARGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HMAC_HEADER: &str = "x-vant-signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than
    /// the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// How often the recurring-charge worker sweeps for due contributions and circles.
    pub sweep_interval: Duration,
    /// Bound on a single charge-provider call inside a sweep.
    pub charge_timeout: Duration,
    pub webhook: WebhookConfig,
    pub vant_config: VantConfig,
    pub charge_config: ChargeConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// Header carrying the rail's HMAC signature of the raw body.
    pub hmac_header: String,
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, requests against /vant endpoints will be checked against a whitelist of rail IP
    /// addresses. To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CSG_HOST.to_string(),
            port: DEFAULT_CSG_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            charge_timeout: Duration::from_secs(DEFAULT_CHARGE_TIMEOUT_SECS),
            webhook: WebhookConfig::default(),
            vant_config: VantConfig::default(),
            charge_config: ChargeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CSG_HOST").ok().unwrap_or_else(|| DEFAULT_CSG_HOST.into());
        let port = env::var("CSG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CSG_PORT. {e} Using the default, {DEFAULT_CSG_PORT}, instead."
                    );
                    DEFAULT_CSG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CSG_PORT);
        let database_url = env::var("CSG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CSG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("CSG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("CSG_USE_FORWARDED").ok(), false);
        let sweep_interval = duration_from_env("CSG_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);
        let charge_timeout = duration_from_env("CSG_CHARGE_TIMEOUT_SECS", DEFAULT_CHARGE_TIMEOUT_SECS);
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            sweep_interval,
            charge_timeout,
            webhook: WebhookConfig::from_env_or_default(),
            vant_config: VantConfig::new_from_env_or_default(),
            charge_config: ChargeConfig::new_from_env_or_default(),
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_header = env::var("CSG_VANT_HMAC_HEADER").ok().unwrap_or_else(|| DEFAULT_HMAC_HEADER.into());
        let hmac_secret = env::var("CSG_VANT_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ CSG_VANT_WEBHOOK_SECRET is not set. Please set it to the signing key the rail uses for \
                 webhook deliveries."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("CSG_VANT_HMAC_CHECKS").ok(), true);
        let whitelist = env::var("CSG_VANT_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ The rail IP whitelist is disabled. If this is not what you want, set \
                     CSG_VANT_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|e| {
                            warn!("🪛️ Ignoring invalid IP address ({s}) in CSG_VANT_IP_WHITELIST: {e}");
                            None::<IpAddr>
                        })
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The rail IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming webhook deliveries."
                );
            },
            None => {
                info!("🪛️ No rail IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Rail IP whitelist: {addrs}");
            },
        }
        Self { hmac_header, hmac_secret: Secret::new(hmac_secret), hmac_checks, whitelist }
    }
}

fn duration_from_env(name: &str, default_secs: u64) -> Duration {
    let secs = env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default_secs} s."))
        .and_then(|s| {
            s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
        })
        .ok()
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}
