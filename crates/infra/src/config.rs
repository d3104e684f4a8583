//! Process configuration loaded from the environment.

use std::time::Duration;

use anyhow::{Context, bail};

use menugate_auth::{DEFAULT_TOKEN_TTL_SECS, Hs256TokenSigner, MAX_TOKEN_TTL_SECS, TokenError};

use crate::request_tracker::{DEFAULT_CAPACITY, DEFAULT_WINDOW, RepeatRequestTracker};

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiration: chrono::Duration,
    pub database_url: Option<String>,
    pub tracker_capacity: usize,
    pub tracker_window: Duration,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration", &self.jwt_expiration)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("tracker_capacity", &self.tracker_capacity)
            .field("tracker_window", &self.tracker_window)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let expiration_secs: i64 =
            parse_or(get("JWT_EXPIRATION_SECS"), "JWT_EXPIRATION_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if expiration_secs <= 0 {
            bail!("JWT_EXPIRATION_SECS must be positive, got {expiration_secs}");
        }
        if expiration_secs > MAX_TOKEN_TTL_SECS {
            bail!("JWT_EXPIRATION_SECS must be at most {MAX_TOKEN_TTL_SECS}, got {expiration_secs}");
        }
        let Some(jwt_expiration) = chrono::TimeDelta::try_seconds(expiration_secs) else {
            bail!("JWT_EXPIRATION_SECS is out of range: {expiration_secs}");
        };

        let tracker_capacity: usize =
            parse_or(get("REQUEST_TRACKER_CAPACITY"), "REQUEST_TRACKER_CAPACITY", DEFAULT_CAPACITY)?;
        if tracker_capacity == 0 {
            bail!("REQUEST_TRACKER_CAPACITY must be at least 1");
        }

        let window_ms: u64 = parse_or(
            get("REQUEST_TRACKER_WINDOW_MS"),
            "REQUEST_TRACKER_WINDOW_MS",
            DEFAULT_WINDOW.as_millis() as u64,
        )?;

        Ok(Self {
            jwt_secret,
            jwt_expiration,
            database_url: get("DATABASE_URL"),
            tracker_capacity,
            tracker_window: Duration::from_millis(window_ms),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn token_signer(&self) -> Result<Hs256TokenSigner, TokenError> {
        Hs256TokenSigner::new(&self.jwt_secret, self.jwt_expiration)
    }

    pub fn request_tracker(&self) -> RepeatRequestTracker {
        RepeatRequestTracker::new(self.tracker_capacity, self.tracker_window)
    }
}

fn parse_or<T>(raw: Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.uses_dev_secret());
        assert_eq!(config.jwt_expiration, chrono::Duration::hours(1));
        assert_eq!(config.database_url, None);
        assert_eq!(config.tracker_capacity, 1000);
        assert_eq!(config.tracker_window, Duration::from_millis(100));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRATION_SECS", "120"),
            ("DATABASE_URL", "postgres://localhost/menugate"),
            ("REQUEST_TRACKER_CAPACITY", "50"),
        ]))
        .unwrap();
        assert!(!config.uses_dev_secret());
        assert_eq!(config.jwt_expiration, chrono::Duration::seconds(120));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/menugate"));
        assert_eq!(config.request_tracker().capacity(), 50);
    }

    #[test]
    fn malformed_numbers_are_errors_naming_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_EXPIRATION_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRATION_SECS"));

        assert!(AppConfig::from_lookup(lookup(&[("JWT_EXPIRATION_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("REQUEST_TRACKER_CAPACITY", "-1")])).is_err());
    }

    #[test]
    fn huge_expiration_is_an_error_not_a_panic() {
        for raw in ["9223372036854775807", "31536001"] {
            let err = AppConfig::from_lookup(lookup(&[("JWT_EXPIRATION_SECS", raw)])).unwrap_err();
            assert!(err.to_string().contains("JWT_EXPIRATION_SECS"), "{err}");
        }

        let config = AppConfig::from_lookup(lookup(&[("JWT_EXPIRATION_SECS", "31536000")])).unwrap();
        assert!(config.token_signer().is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}
