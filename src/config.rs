/*
 * Responsibility
 * - Load the issuer identity (issuer / audience / algorithm / JWKS endpoint) from the environment
 * - Validate it up front (missing or unsafe values fail startup, never a request)
 */
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::services::auth::jwks::RefreshPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub algorithm: Algorithm,
    pub jwks_url: Url,
    pub jwks_timeout: Duration,
    pub refresh: RefreshPolicy,
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Config with defaults for everything but the issuer identity.
    pub fn new(issuer: &str, audience: &str, jwks_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            algorithm: Algorithm::RS256,
            jwks_url: parse_jwks_url(jwks_url)?,
            jwks_timeout: Duration::from_secs(5),
            refresh: RefreshPolicy::default(),
            leeway_seconds: 60,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let issuer = lookup("AUTH_ISSUER")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let audience = lookup("AUTH_AUDIENCE")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let algorithm = match lookup("AUTH_ALGORITHM") {
            Some(v) => Algorithm::from_str(v.trim())
                .map_err(|_| ConfigError::Invalid("AUTH_ALGORITHM"))?,
            None => Algorithm::RS256,
        };
        if is_symmetric(algorithm) {
            return Err(ConfigError::Invalid("AUTH_ALGORITHM"));
        }

        let jwks_url = lookup("AUTH_JWKS_URL").unwrap_or_else(|| {
            format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/'))
        });
        let jwks_url = parse_jwks_url(&jwks_url)?;

        let jwks_timeout = Duration::from_secs(
            parse_or(&lookup, "JWKS_TIMEOUT_SECONDS", 5)?,
        );

        let defaults = RefreshPolicy::default();
        let refresh = RefreshPolicy {
            refresh_on_miss: match lookup("JWKS_REFRESH_ON_MISS") {
                Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("JWKS_REFRESH_ON_MISS"))?,
                None => defaults.refresh_on_miss,
            },
            min_refresh_interval: Duration::from_secs(parse_or(
                &lookup,
                "JWKS_MIN_REFRESH_INTERVAL_SECONDS",
                defaults.min_refresh_interval.as_secs(),
            )?),
            max_age: match lookup("JWKS_MAX_AGE_SECONDS") {
                Some(v) => Some(Duration::from_secs(
                    v.trim()
                        .parse()
                        .map_err(|_| ConfigError::Invalid("JWKS_MAX_AGE_SECONDS"))?,
                )),
                None => defaults.max_age,
            },
        };

        let leeway_seconds = parse_or(&lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        Ok(Self {
            issuer,
            audience,
            algorithm,
            jwks_url,
            jwks_timeout,
            refresh,
            leeway_seconds,
        })
    }
}

pub(crate) fn is_symmetric(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

// https everywhere; plain http only for exact loopback hosts (local issuers, tests).
fn parse_jwks_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("AUTH_JWKS_URL"))?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if matches!(url.host_str(), Some("localhost") | Some("127.0.0.1")) => Ok(url),
        _ => Err(ConfigError::Invalid("AUTH_JWKS_URL")),
    }
}

fn parse_or<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
