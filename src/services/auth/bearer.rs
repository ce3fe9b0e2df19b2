//! `Authorization: Bearer <jwt>` parsing.
//!
//! Syntactic only: the decoded JOSE header picks a verification key and
//! nothing else. No claim is read here.

use jsonwebtoken::Algorithm;

use crate::error::AuthError;

/// The compact JWT exactly as presented by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct RawToken(String);

impl RawToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RawToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Bearer credentials must not end up in logs
        f.write_str("RawToken(..)")
    }
}

/// Unverified header fields. Only used to select the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeaderMeta {
    pub alg: Algorithm,
    pub kid: String,
}

#[derive(Debug, Clone)]
pub struct BearerToken {
    pub raw: RawToken,
    pub meta: TokenHeaderMeta,
}

/// Parse the raw `Authorization` header value.
///
/// - absent / blank -> `authorization_header_missing`
/// - not exactly `Bearer <token>` (one space, no padding) -> `invalid_header`
/// - JOSE header undecodable, unknown `alg` (incl. `none`) or no `kid` -> `invalid_header`
pub fn parse_bearer(header: Option<&str>) -> Result<BearerToken, AuthError> {
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(AuthError::header_missing)?;

    // exactly one ASCII space between scheme and token
    let parts: Vec<&str> = header.split(' ').collect();
    let token = match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => *token,
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => {
            return Err(AuthError::invalid_header(
                "Authorization header must start with \"Bearer\".",
            ));
        }
        [_] => return Err(AuthError::invalid_header("Token not found.")),
        _ => {
            return Err(AuthError::invalid_header(
                "Authorization header must be bearer token.",
            ));
        }
    };

    let decoded = jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(error = %e, "undecodable token header");
        AuthError::invalid_header("Unable to parse authentication token.")
    })?;

    let kid = decoded
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| AuthError::invalid_header("Authorization malformed."))?;

    Ok(BearerToken {
        raw: RawToken(token.to_string()),
        meta: TokenHeaderMeta {
            alg: decoded.alg,
            kid,
        },
    })
}
