use crate::error::AuthError;
use crate::services::auth::claims::VerifiedClaims;

/// Require `permission` in the token's `permissions` claim (exact match).
///
/// - claim absent -> `invalid_claims` (400)
/// - claim present without `permission` -> `unauthorized` (403)
pub fn check_permissions(claims: &VerifiedClaims, permission: &str) -> Result<(), AuthError> {
    let granted = claims
        .permissions()
        .ok_or_else(|| AuthError::invalid_claims("Permissions not included in JWT."))?;

    if !granted.contains(permission) {
        return Err(AuthError::unauthorized());
    }

    Ok(())
}
