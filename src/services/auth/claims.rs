use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `aud` is either a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::Single(aud) => aud == audience,
            Self::Multiple(auds) => auds.iter().any(|aud| aud == audience),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::Single(aud) => std::slice::from_ref(aud),
            Self::Multiple(auds) => auds,
        };
        items.iter().map(String::as_str)
    }
}

/// Claims of an access token whose signature, `exp`, `iss` and `aud` have
/// been checked.
///
/// NOTE:
/// - Only built by the verifier, after `jsonwebtoken` validation succeeded.
/// - `permissions: None` (claim absent) and `Some(empty)` are different
///   outcomes for the permission check.
/// - Claims not modelled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub iss: String,
    pub aud: Audience,
    pub exp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl VerifiedClaims {
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    pub fn permissions(&self) -> Option<&BTreeSet<String>> {
        self.permissions.as_ref()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|granted| granted.contains(permission))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.exp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Any claim not modelled as a field (e.g. `azp`, `gty`, namespaced claims).
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}
