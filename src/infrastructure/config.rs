use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_DATA_FILE: &str = "splitbill-data.json";
const DEV_TOKEN_SECRET: &str = "splitbill-local-development-secret";
const DEFAULT_AUTH_LATENCY_MS: u64 = 600;
const DEFAULT_BILL_LATENCY_MS: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    Argon2,
    Legacy,
}

impl std::str::FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "argon2" => Ok(PasswordScheme::Argon2),
            "legacy" | "base64" => Ok(PasswordScheme::Legacy),
            other => bail!("unknown password scheme: {}", other),
        }
    }
}

/// Artificial delay applied before storage access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub auth: Duration,
    pub bills: Duration,
}

impl Latency {
    pub const NONE: Latency = Latency {
        auth: Duration::ZERO,
        bills: Duration::ZERO,
    };
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            auth: Duration::from_millis(DEFAULT_AUTH_LATENCY_MS),
            bills: Duration::from_millis(DEFAULT_BILL_LATENCY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_file: PathBuf,
    pub token_secret: String,
    pub latency: Latency,
    pub password_scheme: PasswordScheme,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            token_secret: DEV_TOKEN_SECRET.to_string(),
            latency: Latency::default(),
            password_scheme: PasswordScheme::Argon2,
        }
    }
}

impl StoreConfig {
    /// Configuration for tests and embedding: no latency.
    pub fn immediate(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            latency: Latency::NONE,
            ..Self::default()
        }
    }

    /// Reads `SPLITBILL_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_file = lookup("SPLITBILL_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_file);

        let token_secret = match lookup("SPLITBILL_TOKEN_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("SPLITBILL_TOKEN_SECRET not set, using the development secret");
                defaults.token_secret
            }
        };

        let auth = parse_millis(&lookup, "SPLITBILL_AUTH_LATENCY_MS")?
            .unwrap_or(defaults.latency.auth);
        let bills = parse_millis(&lookup, "SPLITBILL_BILL_LATENCY_MS")?
            .unwrap_or(defaults.latency.bills);

        let password_scheme = match lookup("SPLITBILL_PASSWORD_SCHEME") {
            Some(raw) => raw.parse()?,
            None => defaults.password_scheme,
        };

        Ok(Self {
            data_file,
            token_secret,
            latency: Latency { auth, bills },
            password_scheme,
        })
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("{} must be a number of milliseconds, got {:?}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.data_file, PathBuf::from("splitbill-data.json"));
        assert_eq!(config.token_secret, DEV_TOKEN_SECRET);
        assert_eq!(config.latency.auth, Duration::from_millis(600));
        assert_eq!(config.latency.bills, Duration::from_millis(400));
        assert_eq!(config.password_scheme, PasswordScheme::Argon2);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("SPLITBILL_DATA_FILE", "/tmp/bills.json"),
            ("SPLITBILL_TOKEN_SECRET", "s3cret"),
            ("SPLITBILL_AUTH_LATENCY_MS", "0"),
            ("SPLITBILL_BILL_LATENCY_MS", " 25 "),
            ("SPLITBILL_PASSWORD_SCHEME", "Legacy"),
        ]))
        .unwrap();

        assert_eq!(config.data_file, PathBuf::from("/tmp/bills.json"));
        assert_eq!(config.token_secret, "s3cret");
        assert_eq!(config.latency.auth, Duration::ZERO);
        assert_eq!(config.latency.bills, Duration::from_millis(25));
        assert_eq!(config.password_scheme, PasswordScheme::Legacy);
    }

    #[test]
    fn test_invalid_latency_is_rejected() {
        let result =
            StoreConfig::from_lookup(lookup_from(&[("SPLITBILL_AUTH_LATENCY_MS", "fast")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_password_scheme_is_rejected() {
        let result =
            StoreConfig::from_lookup(lookup_from(&[("SPLITBILL_PASSWORD_SCHEME", "md5")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_immediate_has_no_latency() {
        let config = StoreConfig::immediate("secret");
        assert_eq!(config.latency, Latency::NONE);
        assert_eq!(config.token_secret, "secret");
    }
}
