use std::{env, time::Duration};

use chrono::NaiveDate;

use crate::{domain::SearchProfile, errors::Error, Result};

/// Typed configuration for the poller, read from the environment once at
/// startup. Missing or invalid required values fail fast before the
/// scheduler starts; nothing here is re-read at runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Personal identifier injected into the booking session.
    pub ssn: String,
    pub telegram_bot_token: String,
    pub chat_id: String,
    pub notify_window: NotifyWindow,
    pub search_profile: SearchProfile,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

/// Date range whose occasions trigger an outbound notification.
/// Both bounds are exclusive.
#[derive(Clone, Copy, Debug)]
pub struct NotifyWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl NotifyWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::Config(format!(
                "notify window start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date > self.start && date < self.end
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let ssn = require_env("SSN")?;
        let telegram_bot_token = require_env("TELEGRAM_BOT_TOKEN")?;
        let chat_id = require_env("CHAT_ID")?;

        let notify_window = NotifyWindow::new(
            require_date("TIME_WINDOW_START")?,
            require_date("TIME_WINDOW_END")?,
        )?;

        let search_profile = match env_str("SEARCH_PROFILE") {
            Some(raw) => raw.parse()?,
            None => SearchProfile::TheoryPersian,
        };

        let poll_minutes = require_nonzero(
            "POLL_INTERVAL_MINUTES",
            env_u64("POLL_INTERVAL_MINUTES")?.unwrap_or(30),
        )?;
        let poll_interval = Duration::from_secs(60 * poll_minutes);

        let timeout_secs = require_nonzero(
            "HTTP_TIMEOUT_SECS",
            env_u64("HTTP_TIMEOUT_SECS")?.unwrap_or(30),
        )?;
        let http_timeout = Duration::from_secs(timeout_secs);

        Ok(Self {
            ssn,
            telegram_bot_token,
            chat_id,
            notify_window,
            search_profile,
            poll_interval,
            http_timeout,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    env_str(key).map(|raw| parse_u64(key, &raw)).transpose()
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| {
        Error::Config(format!(
            "{key}: expected an unsigned integer, got {raw:?}: {e}"
        ))
    })
}

fn require_nonzero(key: &str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(Error::Config(format!("{key} must be at least 1")));
    }
    Ok(value)
}

fn require_env(key: &str) -> Result<String> {
    env_str(key)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn require_date(key: &str) -> Result<NaiveDate> {
    let raw = require_env(key)?;
    parse_date(&raw).map_err(|e| Error::Config(format!("{key}: {e}")))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| Error::Config(format!("expected YYYY-MM-DD, got {raw:?}: {e}")))
}
