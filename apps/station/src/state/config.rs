//! # Configuration State
//!
//! Station settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`KIOSK_*`)
//! 2. Defaults (this file)
//!
//! | Variable                     | Field                  | Default          |
//! |------------------------------|------------------------|------------------|
//! | `KIOSK_STORE_NAME`           | `store_name`           | Kiosk Play Area  |
//! | `KIOSK_TERMINAL_ID`          | `terminal_id`          | caja-01          |
//! | `KIOSK_CASHIER`              | `cashier`              | caja             |
//! | `KIOSK_GRACE_MINUTES`        | `grace_minutes`        | 5                |
//! | `KIOSK_DEFAULT_DISCOUNT_BPS` | `default_discount_bps` | 0                |
//! | `KIOSK_SCAN_DEBOUNCE_MS`     | `scan_debounce_ms`     | 3000             |
//! | `KIOSK_DB_PATH`              | `db_path`              | platform dir     |
//!
//! Read-only after initialization, so no mutex.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use kiosk_core::validation::validate_discount_bps;

/// Station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Printed on receipts
    pub store_name: String,

    /// Identifies this register on receipts and in logs
    pub terminal_id: String,

    /// Recorded on sessions, sales and drawer movements when a command is
    /// not given a user
    pub cashier: String,

    pub currency_symbol: String,

    pub currency_decimals: u8,

    /// Minutes forgiven at check-out before tier selection
    pub grace_minutes: i64,

    /// Discount applied to sessions opened by a plain scan
    pub default_discount_bps: i64,

    /// Repeated scans of the same tag inside this window are ignored
    pub scan_debounce_ms: u64,

    /// Database file override; `None` uses the platform data directory
    pub db_path: Option<PathBuf>,
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState {
            store_name: "Kiosk Play Area".to_string(),
            terminal_id: "caja-01".to_string(),
            cashier: "caja".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            grace_minutes: 5,
            default_discount_bps: 0,
            scan_debounce_ms: 3000,
            db_path: None,
        }
    }
}

impl ConfigState {
    /// Defaults overridden by `KIOSK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `KIOSK_*`
    /// key. Values that do not parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(store_name) = lookup("KIOSK_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(terminal_id) = lookup("KIOSK_TERMINAL_ID") {
            config.terminal_id = terminal_id;
        }

        if let Some(cashier) = lookup("KIOSK_CASHIER") {
            config.cashier = cashier;
        }

        if let Some(minutes) = parse_var::<i64, _>(&lookup, "KIOSK_GRACE_MINUTES") {
            if minutes >= 0 {
                config.grace_minutes = minutes;
            } else {
                warn!(minutes, "Ignoring negative KIOSK_GRACE_MINUTES");
            }
        }

        if let Some(bps) = parse_var::<i64, _>(&lookup, "KIOSK_DEFAULT_DISCOUNT_BPS") {
            match validate_discount_bps(bps) {
                Ok(()) => config.default_discount_bps = bps,
                Err(e) => warn!(error = %e, "Ignoring KIOSK_DEFAULT_DISCOUNT_BPS"),
            }
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "KIOSK_SCAN_DEBOUNCE_MS") {
            config.scan_debounce_ms = ms;
        }

        if let Some(path) = lookup("KIOSK_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        config
    }

    pub fn scan_debounce(&self) -> Duration {
        Duration::from_millis(self.scan_debounce_ms)
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = (cents / divisor).abs();
        let frac = (cents % divisor).abs();
        let sign = if cents < 0 { "-" } else { "" };

        if self.currency_decimals > 0 {
            format!(
                "{}{}{}.{:0width$}",
                sign,
                self.currency_symbol,
                whole,
                frac,
                width = self.currency_decimals as usize
            )
        } else {
            format!("{}{}{}", sign, self.currency_symbol, whole)
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}
