pub mod access_jwt;
pub mod bearer;
pub mod claims;
pub mod factory;
pub mod jwks;
pub mod permissions;
pub mod service;

pub use access_jwt::TokenVerifier;
pub use bearer::{BearerToken, parse_bearer};
pub use claims::{Audience, VerifiedClaims};
pub use factory::build_auth_service;
pub use permissions::check_permissions;
pub use service::AuthService;
