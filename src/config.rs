// config.rs
// Settings read from the environment (after `.env` is loaded). CLI flags override them.

use anyhow::{Context, Result, bail};
use std::env;

use crate::migration::MissingSecretPolicy;
use crate::totp::{DEFAULT_DIGITS, DEFAULT_PERIOD, DEFAULT_WINDOW};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub period: u64,
    pub digits: u32,
    pub window: u64,
    pub missing_secret: MissingSecretPolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            period: DEFAULT_PERIOD,
            digits: DEFAULT_DIGITS,
            window: DEFAULT_WINDOW,
            missing_secret: MissingSecretPolicy::Reject,
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();

        let period = match lookup("OTPIMPORT_PERIOD") {
            Some(v) => v.trim().parse::<u64>().context("OTPIMPORT_PERIOD must be an integer")?,
            None => defaults.period,
        };
        if period == 0 {
            bail!("OTPIMPORT_PERIOD must be at least 1 second");
        }

        let digits = match lookup("OTPIMPORT_DIGITS") {
            Some(v) => v.trim().parse::<u32>().context("OTPIMPORT_DIGITS must be an integer")?,
            None => defaults.digits,
        };
        if digits != 6 && digits != 8 {
            bail!("OTPIMPORT_DIGITS must be 6 or 8, got {digits}");
        }

        let window = match lookup("OTPIMPORT_WINDOW") {
            Some(v) => v.trim().parse::<u64>().context("OTPIMPORT_WINDOW must be an integer")?,
            None => defaults.window,
        };

        let missing_secret = match lookup("OTPIMPORT_MISSING_SECRET").as_deref().map(str::trim) {
            None | Some("reject") => MissingSecretPolicy::Reject,
            Some("placeholder") => MissingSecretPolicy::Placeholder,
            Some(other) => bail!("OTPIMPORT_MISSING_SECRET must be reject or placeholder, got {other:?}"),
        };

        let log_filter = lookup("OTPIMPORT_LOG").unwrap_or(defaults.log_filter);

        Ok(Settings {
            period,
            digits,
            window,
            missing_secret,
            log_filter,
        })
    }
}
