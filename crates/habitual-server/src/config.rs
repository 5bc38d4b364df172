use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;

use habitual_reminder::TelegramConfig;

const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub timezone: Tz,
    pub send_timeout: Duration,
    /// Reminders sent concurrently within one cycle.
    pub max_in_flight: usize,
    /// `None` when no bot token is configured: reminders are disabled.
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port: u16 = var("HABITUAL_PORT", "3000")
            .parse()
            .context("HABITUAL_PORT must be a port number")?;
        let timezone: Tz = var("HABITUAL_TIMEZONE", "UTC")
            .parse()
            .map_err(|e| anyhow::anyhow!("HABITUAL_TIMEZONE: {}", e))?;
        let timeout_secs: u64 = var("HABITUAL_SEND_TIMEOUT_SECS", "10")
            .parse()
            .context("HABITUAL_SEND_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            anyhow::bail!("HABITUAL_SEND_TIMEOUT_SECS must be at least 1");
        }
        let send_timeout = Duration::from_secs(timeout_secs);
        let max_in_flight: usize = var("HABITUAL_SEND_CONCURRENCY", "8")
            .parse()
            .context("HABITUAL_SEND_CONCURRENCY must be a whole number")?;
        if max_in_flight == 0 {
            anyhow::bail!("HABITUAL_SEND_CONCURRENCY must be at least 1");
        }

        let token = var("TELEGRAM_BOT_TOKEN", "");
        let telegram = (!token.is_empty()).then(|| TelegramConfig {
            token,
            api_base: var("TELEGRAM_API_BASE", DEFAULT_TELEGRAM_API),
            timeout: send_timeout,
        });

        Ok(Self {
            db_path: var("HABITUAL_DB_PATH", "habitual.db").into(),
            host: var("HABITUAL_HOST", "0.0.0.0"),
            port,
            timezone,
            send_timeout,
            max_in_flight,
            telegram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_disable_reminders() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.db_path, PathBuf::from("habitual.db"));
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.send_timeout, Duration::from_secs(10));
        assert_eq!(config.max_in_flight, 8);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn token_enables_telegram() {
        let config = config(&[
            ("TELEGRAM_BOT_TOKEN", " abc "),
            ("HABITUAL_TIMEZONE", "Europe/Moscow"),
            ("HABITUAL_SEND_TIMEOUT_SECS", "3"),
            ("HABITUAL_SEND_CONCURRENCY", "2"),
        ])
        .unwrap();
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.token, "abc");
        assert_eq!(telegram.api_base, DEFAULT_TELEGRAM_API);
        assert_eq!(telegram.timeout, Duration::from_secs(3));
        assert_eq!(config.timezone, chrono_tz::Europe::Moscow);
        assert_eq!(config.max_in_flight, 2);
    }

    #[test]
    fn blank_token_keeps_reminders_off() {
        assert!(config(&[("TELEGRAM_BOT_TOKEN", "   ")]).unwrap().telegram.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("HABITUAL_PORT", "http")]).is_err());
        assert!(config(&[("HABITUAL_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(config(&[("HABITUAL_SEND_TIMEOUT_SECS", "0")]).is_err());
        assert!(config(&[("HABITUAL_SEND_CONCURRENCY", "0")]).is_err());
        assert!(config(&[("HABITUAL_SEND_CONCURRENCY", "many")]).is_err());
    }
}
