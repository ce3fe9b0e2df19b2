use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::config::is_symmetric;
use crate::error::AuthError;
use crate::services::auth::bearer::BearerToken;
use crate::services::auth::claims::VerifiedClaims;
use crate::services::auth::jwks::JwksCache;

/// Access-token verifier backed by the issuer's JWKS.
///
/// - Exactly one (asymmetric) algorithm is accepted.
/// - The key is chosen by exact `kid` match in the key set cache.
/// - `jsonwebtoken::Validation` checks signature, `exp`, `nbf`, `iss`, `aud`.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<JwksCache>,
    algorithm: Algorithm,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &self.algorithm)
            .field("validation", &self.validation)
            .field("keys", &self.keys)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(
        keys: Arc<JwksCache>,
        algorithm: Algorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, String> {
        if is_symmetric(algorithm) {
            return Err(format!("{algorithm:?} is symmetric, an asymmetric algorithm is required"));
        }

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;

        Ok(Self {
            keys,
            algorithm,
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn keys(&self) -> &Arc<JwksCache> {
        &self.keys
    }

    /// Verify the token and return its claims.
    ///
    /// Every failure is classified: key set trouble is `jwks_unreachable`,
    /// `exp` is `token_expired`, `iss`/`aud`/`nbf` is `invalid_claims`,
    /// everything else (algorithm, key, signature, encoding) is `invalid_header`.
    pub async fn verify(&self, token: &BearerToken) -> Result<VerifiedClaims, AuthError> {
        // Never let the token pick the algorithm.
        if token.meta.alg != self.algorithm {
            return Err(AuthError::invalid_header(format!(
                "Unsupported token algorithm {:?}.",
                token.meta.alg
            )));
        }

        let jwk = self.keys.key_for(&token.meta.kid).await?;
        let decoding_key = signing_key(&jwk)?;

        let data = jsonwebtoken::decode::<serde_json::Value>(
            token.raw.as_str(),
            &decoding_key,
            &self.validation,
        )
        .map_err(classify)?;

        // Presence of exp/iss/aud was enforced above; what fails here is a
        // well-known claim with the wrong type (e.g. `permissions: "x"`).
        serde_json::from_value::<VerifiedClaims>(data.claims).map_err(|e| {
            tracing::debug!(error = %e, "verified token has malformed claims");
            AuthError::invalid_header("Unable to parse authentication token.")
        })
    }
}

fn signing_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err(AuthError::invalid_header(
            "Unable to find the appropriate key.",
        ));
    }

    DecodingKey::from_jwk(jwk).map_err(|e| {
        tracing::warn!(error = %e, kid = ?jwk.common.key_id, "jwk cannot be used as a decoding key");
        AuthError::invalid_header("Unable to find the appropriate key.")
    })
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::token_expired(),
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => {
            AuthError::invalid_claims("Incorrect claims. Please, check the audience and issuer.")
        }
        ErrorKind::InvalidSignature => {
            AuthError::invalid_header("Token signature verification failed.")
        }
        _ => {
            tracing::debug!(error = %err, "token rejected while decoding");
            AuthError::invalid_header("Unable to parse authentication token.")
        }
    }
}
