use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::models::submission::SubmissionType;
use crate::services::refund::{FeeRate, FeeSchedule};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("invalid value for '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub server_addr: SocketAddr,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
    pub run_migrations: bool,
    pub log_dir: Option<PathBuf>,
    pub fee_schedule: FeeSchedule,
}

impl Config {
    /// ✅ Load environment variables and set defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env only once
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let mut fee_schedule = FeeSchedule::default();
        for submission_type in SubmissionType::ALL {
            let name = fee_rate_var(submission_type);
            if let Some(raw) = lookup(&name) {
                let bps: u32 = parse(&name, &raw)?;
                let rate = FeeRate::from_bps(bps).ok_or_else(|| ConfigError::Invalid {
                    name: name.clone(),
                    reason: format!("{} exceeds {} basis points", bps, FeeRate::MAX_BPS),
                })?;
                fee_schedule.set(submission_type, rate);
            }
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl: Duration::from_secs(
                parse::<u64>("JWT_TTL_HOURS", &lookup("JWT_TTL_HOURS").unwrap_or_else(|| "24".into()))? * 3600,
            ),
            server_addr: parse(
                "SERVER_ADDR",
                &lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
            )?,
            db_max_connections: parse(
                "DB_MAX_CONNECTIONS",
                &lookup("DB_MAX_CONNECTIONS").unwrap_or_else(|| "10".into()),
            )?,
            request_timeout: Duration::from_secs(parse(
                "REQUEST_TIMEOUT_SECS",
                &lookup("REQUEST_TIMEOUT_SECS").unwrap_or_else(|| "30".into()),
            )?),
            run_migrations: parse(
                "RUN_MIGRATIONS",
                &lookup("RUN_MIGRATIONS").unwrap_or_else(|| "true".into()),
            )?,
            log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()).map(PathBuf::from),
            fee_schedule,
        })
    }
}

/// e.g. `FEE_RATE_BPS_KAKAOMAP_REVIEW`
pub fn fee_rate_var(submission_type: SubmissionType) -> String {
    format!("FEE_RATE_BPS_{}", submission_type.as_str().to_uppercase())
}

fn parse<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
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
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/refunds"), ("JWT_SECRET", "s3cret")];

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let config = Config::from_lookup(lookup_from(&BASE)).unwrap();
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.jwt_ttl, Duration::from_secs(24 * 3600));
        assert!(config.run_migrations);
        assert!(config.log_dir.is_none());
        assert_eq!(config.fee_schedule, FeeSchedule::default());
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = Config::from_lookup(lookup_from(&BASE[..1])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn fee_rates_can_be_overridden_per_category() {
        let mut pairs = BASE.to_vec();
        pairs.push(("FEE_RATE_BPS_BLOG_DISTRIBUTION", "2000"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.fee_schedule.rate_for(SubmissionType::BlogDistribution).bps(), 2000);
        assert_eq!(config.fee_schedule.rate_for(SubmissionType::Reward).bps(), 1000);
    }

    #[test]
    fn fee_rate_above_one_hundred_percent_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("FEE_RATE_BPS_REWARD", "12000"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == "FEE_RATE_BPS_REWARD"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("REQUEST_TIMEOUT_SECS", "soon"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
