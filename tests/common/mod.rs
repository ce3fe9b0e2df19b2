//! Shared fixtures for the guard integration tests: RSA keys, a wiremock
//! JWKS endpoint and a small drinks router.
use std::sync::{Arc, LazyLock};

use axum::{
    Json, Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drinks_auth::middleware::auth::permission;
use drinks_auth::{AuthConfig, AuthCtxExtractor, AuthService, build_auth_service};

pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "coffee";
pub const KID: &str = "integration-key";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub struct TestKeys {
    encoding: EncodingKey,
    n: String,
    e: String,
}

static KEYS: LazyLock<TestKeys> = LazyLock::new(|| {
    let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let public_key = private_key.to_public_key();
    let pem = private_key.to_pkcs1_pem(LineEnding::LF).unwrap();

    TestKeys {
        encoding: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
        n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
});

pub fn keys() -> &'static TestKeys {
    &KEYS
}

impl TestKeys {
    pub fn jwk(&self, kid: &str) -> Value {
        json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.n,
            "e": self.e
        })
    }

    pub fn jwks(&self, kids: &[&str]) -> Value {
        json!({ "keys": kids.iter().map(|kid| self.jwk(kid)).collect::<Vec<_>>() })
    }

    pub fn sign(&self, claims: &Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding).unwrap()
    }
}

pub fn claims(permissions: Option<&[&str]>) -> Value {
    let mut claims = json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|barista",
        "iat": chrono::Utc::now().timestamp(),
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    if let Some(permissions) = permissions {
        claims["permissions"] = json!(permissions);
    }
    claims
}

pub fn bearer(permissions: &[&str]) -> String {
    format!("Bearer {}", keys().sign(&claims(Some(permissions)), KID))
}

pub async fn jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(keys().jwks(&[KID])))
        .mount(&server)
        .await;
    server
}

pub fn config_for(server: &MockServer) -> AuthConfig {
    AuthConfig::new(ISSUER, AUDIENCE, &format!("{}{JWKS_PATH}", server.uri())).unwrap()
}

pub fn auth_for(server: &MockServer) -> Arc<AuthService> {
    build_auth_service(&config_for(server)).unwrap()
}

async fn list_drinks() -> Json<Value> {
    Json(json!({ "success": true, "drinks": [] }))
}

async fn drinks_detail(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<Value> {
    Json(json!({
        "success": true,
        "sub": ctx.subject(),
        "permissions": ctx.permissions(),
    }))
}

async fn create_drink(AuthCtxExtractor(ctx): AuthCtxExtractor) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "created_by": ctx.subject() })),
    )
}

/// `GET /drinks` public, `POST /drinks` needs `post:drinks`,
/// `GET /drinks-detail` needs `get:drinks-detail`.
pub fn app(auth: Arc<AuthService>) -> Router {
    let detail = Router::new().route("/drinks-detail", get(drinks_detail));
    let detail = permission::apply(detail, auth.clone(), "get:drinks-detail");

    Router::new()
        .route(
            "/drinks",
            get(list_drinks).merge(permission::apply_method(
                post(create_drink),
                auth,
                "post:drinks",
            )),
        )
        .merge(detail)
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        req = req.header(header::AUTHORIZATION, value);
    }

    let response = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}
