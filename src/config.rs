use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveTime;
use thiserror::Error;

use crate::calendar::WorkingHours;
use crate::models::validate_duration;

/// Application-level constants
pub const APP_NAME: &str = "turnero";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_DB: &str = "turnero.db";
const DEFAULT_DURATION_MINUTES: i64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "turnero=info"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub hours: WorkingHours,
    pub default_duration_minutes: i64,
}

impl Config {
    /// Read configuration from `TURNERO_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup("TURNERO_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse::<SocketAddr>().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            key: "TURNERO_BIND",
            value: bind.clone(),
            reason: e.to_string(),
        })?;

        let database_path =
            PathBuf::from(lookup("TURNERO_DB").unwrap_or_else(|| DEFAULT_DB.to_string()));

        let defaults = WorkingHours::default();
        let day_start = time_var(&lookup, "TURNERO_DAY_START", defaults.day_start)?;
        let day_end = time_var(&lookup, "TURNERO_DAY_END", defaults.day_end)?;
        let slot_minutes = minutes_var(&lookup, "TURNERO_SLOT_MINUTES", defaults.slot_minutes)?;
        let hours = WorkingHours::new(day_start, day_end, slot_minutes).map_err(|e| {
            ConfigError::Invalid {
                key: "TURNERO_DAY_START/TURNERO_DAY_END/TURNERO_SLOT_MINUTES",
                value: format!("{day_start}-{day_end}/{slot_minutes}"),
                reason: e.to_string(),
            }
        })?;

        let default_duration_minutes =
            minutes_var(&lookup, "TURNERO_DEFAULT_DURATION", DEFAULT_DURATION_MINUTES)?;
        validate_duration(default_duration_minutes).map_err(|e| ConfigError::Invalid {
            key: "TURNERO_DEFAULT_DURATION",
            value: default_duration_minutes.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Config {
            bind_addr,
            database_path,
            hours,
            default_duration_minutes,
        })
    }
}

fn time_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: NaiveTime,
) -> Result<NaiveTime, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                key,
                value,
                reason: e.to_string(),
            }
        }),
    }
}

fn minutes_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<i64>().map_err(|e: std::num::ParseIntError| {
            ConfigError::Invalid {
                key,
                value,
                reason: e.to_string(),
            }
        }),
    }
}
