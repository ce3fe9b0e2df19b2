//! JWKS document retrieval.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use super::JwksError;

/// Raw JWKS document. Records stay untyped here so one unsupported key
/// does not poison the whole set; `KeySet` parses them one by one.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<serde_json::Value>,
}

/// Source of the issuer's key set.
///
/// Implementations are shared across requests (`Arc<dyn JwksFetcher>`).
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch_jwks(&self) -> Result<JwksDocument, JwksError>;
}

/// Fetches the JWKS document over HTTPS with a bounded request time.
#[derive(Debug, Clone)]
pub struct HttpJwksFetcher {
    client: reqwest::Client,
    url: Url,
}

impl HttpJwksFetcher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("drinks-auth/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    async fn fetch_jwks(&self) -> Result<JwksDocument, JwksError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| JwksError::Unreachable(e.to_string()))?;

        response
            .json::<JwksDocument>()
            .await
            .map_err(|e| JwksError::Unreachable(format!("malformed JWKS document: {e}")))
    }
}
