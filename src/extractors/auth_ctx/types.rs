/*
 * Responsibility
 * - The "authorized context" type handlers see
 * - The permission guard verifies the token and stores it in request extensions;
 *   handlers only ever receive this type
 */

use std::collections::BTreeSet;

use crate::services::auth::VerifiedClaims;

/// Context attached to a request that passed the permission guard.
#[derive(Debug, Clone)]
pub struct AuthCtx {
    claims: VerifiedClaims,
}

impl AuthCtx {
    pub fn new(claims: VerifiedClaims) -> Self {
        Self { claims }
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.subject()
    }

    pub fn permissions(&self) -> Option<&BTreeSet<String>> {
        self.claims.permissions()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.claims.has_permission(permission)
    }

    pub fn claims(&self) -> &VerifiedClaims {
        &self.claims
    }

    pub fn into_claims(self) -> VerifiedClaims {
        self.claims
    }
}
