use chrono::Duration;
use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{config_error, Error};

/// Deployment knobs, read once at startup. The commission rate is carried
/// here and injected into settlement instead of living as a module constant
/// so it can differ per deployment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_address: SocketAddr,
    pub commission_rate: Decimal,
    pub negotiation_window_mins: i64,
    pub driver_location_ttl_secs: i64,
    pub search_radius_km: f64,
    pub search_limit: usize,
    pub pickup_window_mins: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            max_connections: parse_var("MAX_DB_CONNECTIONS", "5")?,
            bind_address: parse_var("BIND_ADDRESS", "127.0.0.1:3000")?,
            commission_rate: parse_var("COMMISSION_RATE", "0.15")?,
            negotiation_window_mins: parse_var("NEGOTIATION_WINDOW_MINS", "5")?,
            driver_location_ttl_secs: parse_var("DRIVER_LOCATION_TTL_SECS", "60")?,
            search_radius_km: parse_var("SEARCH_RADIUS_KM", "10")?,
            search_limit: parse_var("SEARCH_LIMIT", "20")?,
            pickup_window_mins: parse_var("PICKUP_WINDOW_MINS", "30")?,
        })
    }

    pub fn negotiation_window(&self) -> Duration {
        Duration::minutes(self.negotiation_window_mins)
    }

    pub fn driver_location_ttl(&self) -> Duration {
        Duration::seconds(self.driver_location_ttl_secs)
    }

    pub fn pickup_window(&self) -> Duration {
        Duration::minutes(self.pickup_window_mins)
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, Error>
where
    T: FromStr,
{
    let raw = env::var(name).unwrap_or_else(|_| default.into());

    raw.parse()
        .map_err(|_| config_error(format!("could not parse {name}={raw}")))
}
