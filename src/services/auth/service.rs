use std::sync::Arc;

use crate::config::{AuthConfig, ConfigError};
use crate::error::AuthError;
use crate::services::auth::access_jwt::TokenVerifier;
use crate::services::auth::bearer::parse_bearer;
use crate::services::auth::claims::VerifiedClaims;
use crate::services::auth::jwks::{JwksCache, JwksFetcher};
use crate::services::auth::permissions::check_permissions;

/// Authorization pipeline: header -> token -> verified claims -> permission.
///
/// Built once at startup and shared (`Arc<AuthService>`) by every guarded
/// route; the only state it holds across requests is the key set cache.
#[derive(Debug, Clone)]
pub struct AuthService {
    issuer: String,
    audience: String,
    verifier: TokenVerifier,
}

impl AuthService {
    pub fn with_fetcher(
        config: &AuthConfig,
        fetcher: Arc<dyn JwksFetcher>,
    ) -> Result<Self, ConfigError> {
        let keys = Arc::new(JwksCache::new(fetcher, config.refresh));

        let verifier = TokenVerifier::new(
            keys,
            config.algorithm,
            &config.issuer,
            &config.audience,
            config.leeway_seconds,
        )
        .map_err(|reason| {
            tracing::warn!(reason = %reason, "rejecting auth configuration");
            ConfigError::Invalid("AUTH_ALGORITHM")
        })?;

        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            verifier,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn jwks(&self) -> &Arc<JwksCache> {
        self.verifier.keys()
    }

    /// Verify the bearer token in `header` without requiring a permission.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<VerifiedClaims, AuthError> {
        let token = parse_bearer(header)?;
        self.verifier.verify(&token).await
    }

    /// Verify the bearer token in `header` and require `permission`.
    pub async fn authorize(
        &self,
        header: Option<&str>,
        permission: &str,
    ) -> Result<VerifiedClaims, AuthError> {
        let claims = self.authenticate(header).await?;
        check_permissions(&claims, permission)?;
        Ok(claims)
    }
}
