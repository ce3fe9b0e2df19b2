/*
 * Responsibility
 * - Bearer-token authorization for axum services whose tokens are issued by an
 *   external OIDC provider (JWKS-published RSA/EC keys)
 * - Public surface: config -> build_auth_service -> permission guard / AuthCtx
 */
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod services;

#[cfg(test)]
mod test_support;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthErrorCode};
pub use extractors::{AuthCtx, AuthCtxExtractor};
pub use services::auth::{AuthService, VerifiedClaims, build_auth_service};
