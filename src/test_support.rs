//! Fixtures shared by unit tests: RSA keys, signed tokens and in-memory fetchers.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::json;

use crate::services::auth::jwks::{JwksDocument, JwksError, JwksFetcher};

pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "coffee";
pub const KID: &str = "test-key-1";

pub struct TestKeys {
    encoding: EncodingKey,
    n: String,
    e: String,
    public_pem: String,
}

static SHARED: LazyLock<TestKeys> = LazyLock::new(TestKeys::generate);
static OTHER: LazyLock<TestKeys> = LazyLock::new(TestKeys::generate);

impl TestKeys {
    fn generate() -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_key = private_key.to_public_key();

        let pem = private_key.to_pkcs1_pem(LineEnding::LF).unwrap();
        let encoding = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();

        Self {
            encoding,
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            public_pem: public_key.to_public_key_pem(LineEnding::LF).unwrap(),
        }
    }

    /// The key published in `jwks_document()`.
    pub fn shared() -> &'static TestKeys {
        &SHARED
    }

    /// A different key pair; tokens it signs carry the same `kid` as `shared()`.
    pub fn other() -> &'static TestKeys {
        &OTHER
    }

    pub fn jwk(&self, kid: &str) -> serde_json::Value {
        json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.n,
            "e": self.e
        })
    }

    pub fn jwks_document(&self) -> JwksDocument {
        JwksDocument {
            keys: vec![self.jwk(KID)],
        }
    }

    pub fn modulus_b64(&self) -> String {
        self.n.clone()
    }

    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.sign_full(Algorithm::RS256, KID, claims)
    }

    pub fn sign_with_kid(&self, claims: &serde_json::Value, kid: &str) -> String {
        self.sign_full(Algorithm::RS256, kid, claims)
    }

    pub fn sign_with(&self, alg: Algorithm, claims: &serde_json::Value) -> String {
        self.sign_full(alg, KID, claims)
    }

    fn sign_full(&self, alg: Algorithm, kid: &str, claims: &serde_json::Value) -> String {
        let mut header = Header::new(alg);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding).unwrap()
    }
}

pub fn sign_hs256(claims: &serde_json::Value, kid: &str, secret: &[u8]) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
}

/// `<header>.<payload>.` with an empty signature.
pub fn unsigned_token(alg: &str, claims: &serde_json::Value) -> String {
    let header = json!({"alg": alg, "typ": "JWT", "kid": KID});
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub fn future_exp() -> u64 {
    (chrono::Utc::now().timestamp() + 3600) as u64
}

pub fn past_exp() -> u64 {
    (chrono::Utc::now().timestamp() - 3600) as u64
}

pub struct StaticFetcher {
    doc: JwksDocument,
}

impl StaticFetcher {
    pub fn new(doc: JwksDocument) -> Arc<Self> {
        Arc::new(Self { doc })
    }
}

#[async_trait]
impl JwksFetcher for StaticFetcher {
    async fn fetch_jwks(&self) -> Result<JwksDocument, JwksError> {
        Ok(self.doc.clone())
    }
}

pub struct CountingFetcher {
    doc: JwksDocument,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(doc: JwksDocument) -> Arc<Self> {
        Arc::new(Self {
            doc,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JwksFetcher for CountingFetcher {
    async fn fetch_jwks(&self) -> Result<JwksDocument, JwksError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.doc.clone())
    }
}

pub struct FailingFetcher;

impl FailingFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl JwksFetcher for FailingFetcher {
    async fn fetch_jwks(&self) -> Result<JwksDocument, JwksError> {
        Err(JwksError::Unreachable("connection refused".into()))
    }
}
