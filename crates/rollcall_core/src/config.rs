//! Runtime configuration read from environment variables.
//!
//! # Invariants
//! - Every value has a default except the log directory and the notification
//!   channel, whose absence disables file logging and notifications.
//! - A present but unparsable value is an error, never silently defaulted.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "rollcall.db";
const DEFAULT_COOLDOWN_SECONDS: i64 = 60;
const DEFAULT_RECONCILE_INTERVAL_SECONDS: i64 = 300;
const DEFAULT_REMOTE_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_SIGNAL_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Configuration of the sync engine and its ambient stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// `ROLLCALL_DB_PATH`
    pub db_path: PathBuf,
    /// `ROLLCALL_LOG_LEVEL`
    pub log_level: String,
    /// `ROLLCALL_LOG_DIR`; must be absolute when set.
    pub log_dir: Option<String>,
    /// `ROLLCALL_COOLDOWN_SECONDS`; `<= 0` disables suppression.
    pub cooldown_seconds: i64,
    /// `ROLLCALL_RECONCILE_INTERVAL_SECONDS`; `<= 0` disables the periodic pass.
    pub reconcile_interval_seconds: i64,
    /// `ROLLCALL_NOTIFICATION_CHANNEL_ID`
    pub notification_channel_id: Option<String>,
    /// `ROLLCALL_REMOTE_TIMEOUT_SECONDS`
    pub remote_timeout_seconds: u64,
    /// `ROLLCALL_SIGNAL_TIMEOUT_SECONDS`
    pub signal_timeout_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            reconcile_interval_seconds: DEFAULT_RECONCILE_INTERVAL_SECONDS,
            notification_channel_id: None,
            remote_timeout_seconds: DEFAULT_REMOTE_TIMEOUT_SECONDS,
            signal_timeout_seconds: DEFAULT_SIGNAL_TIMEOUT_SECONDS,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            db_path: text("ROLLCALL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: text("ROLLCALL_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: text("ROLLCALL_LOG_DIR"),
            cooldown_seconds: parse_or(
                text("ROLLCALL_COOLDOWN_SECONDS"),
                "ROLLCALL_COOLDOWN_SECONDS",
                defaults.cooldown_seconds,
            )?,
            reconcile_interval_seconds: parse_or(
                text("ROLLCALL_RECONCILE_INTERVAL_SECONDS"),
                "ROLLCALL_RECONCILE_INTERVAL_SECONDS",
                defaults.reconcile_interval_seconds,
            )?,
            notification_channel_id: text("ROLLCALL_NOTIFICATION_CHANNEL_ID"),
            remote_timeout_seconds: parse_timeout(
                text("ROLLCALL_REMOTE_TIMEOUT_SECONDS"),
                "ROLLCALL_REMOTE_TIMEOUT_SECONDS",
                defaults.remote_timeout_seconds,
            )?,
            signal_timeout_seconds: parse_timeout(
                text("ROLLCALL_SIGNAL_TIMEOUT_SECONDS"),
                "ROLLCALL_SIGNAL_TIMEOUT_SECONDS",
                defaults.signal_timeout_seconds,
            )?,
        })
    }

    /// Cooldown window, or `None` when suppression is disabled.
    pub fn cooldown_window(&self) -> Option<chrono::Duration> {
        (self.cooldown_seconds > 0).then(|| chrono::Duration::seconds(self.cooldown_seconds))
    }

    /// Periodic reconciliation interval, or `None` when disabled.
    pub fn reconcile_interval(&self) -> Option<Duration> {
        u64::try_from(self.reconcile_interval_seconds)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_seconds)
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_secs(self.signal_timeout_seconds)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// Timeouts must be at least one second; zero would fail every call.
fn parse_timeout(
    value: Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match parse_or(value, key, default)? {
        0 => Err(ConfigError::InvalidValue {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(secs),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SyncConfig};
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.cooldown_window(), Some(chrono::Duration::seconds(60)));
        assert_eq!(config.reconcile_interval(), Some(Duration::from_secs(300)));
        assert!(config.notification_channel_id.is_none());
    }

    #[test]
    fn non_positive_values_disable_cooldown_and_periodic_pass() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("ROLLCALL_COOLDOWN_SECONDS", "0"),
            ("ROLLCALL_RECONCILE_INTERVAL_SECONDS", "-5"),
            ("ROLLCALL_NOTIFICATION_CHANNEL_ID", " 1287444752421097493 "),
        ]))
        .unwrap();
        assert_eq!(config.cooldown_window(), None);
        assert_eq!(config.reconcile_interval(), None);
        assert_eq!(
            config.notification_channel_id.as_deref(),
            Some("1287444752421097493")
        );
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let err = SyncConfig::from_lookup(lookup(&[("ROLLCALL_COOLDOWN_SECONDS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "ROLLCALL_COOLDOWN_SECONDS",
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        for key in [
            "ROLLCALL_REMOTE_TIMEOUT_SECONDS",
            "ROLLCALL_SIGNAL_TIMEOUT_SECONDS",
        ] {
            let err = SyncConfig::from_lookup(lookup(&[(key, "0")])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidValue {
                    key,
                    value: "0".to_string(),
                }
            );
        }

        let config =
            SyncConfig::from_lookup(lookup(&[("ROLLCALL_SIGNAL_TIMEOUT_SECONDS", "3")])).unwrap();
        assert_eq!(config.signal_timeout(), Duration::from_secs(3));
    }
}
