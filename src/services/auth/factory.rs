/// Factory: build `AuthService` from `AuthConfig`.
use std::sync::Arc;

use crate::config::{AuthConfig, ConfigError};
use crate::services::auth::AuthService;
use crate::services::auth::jwks::HttpJwksFetcher;

pub fn build_auth_service(config: &AuthConfig) -> Result<Arc<AuthService>, ConfigError> {
    let fetcher = HttpJwksFetcher::new(config.jwks_url.clone(), config.jwks_timeout).map_err(|e| {
        tracing::warn!(error = %e, "failed to build jwks http client");
        ConfigError::Invalid("AUTH_JWKS_URL")
    })?;

    let auth = AuthService::with_fetcher(config, Arc::new(fetcher))?;

    tracing::info!(
        issuer = %config.issuer,
        audience = %config.audience,
        algorithm = ?config.algorithm,
        jwks_url = %config.jwks_url,
        "auth service ready"
    );

    Ok(Arc::new(auth))
}
