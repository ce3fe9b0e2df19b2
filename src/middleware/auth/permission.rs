//! Permission guard: verify the bearer token, require a permission, then hand
//! `AuthCtx` to the handler through request extensions.
//!
//! The guard is a `route_layer`, so it only runs for requests that matched a
//! route (unknown paths stay 404, not 401).

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::AuthError;
use crate::extractors::AuthCtx;
use crate::services::auth::AuthService;

#[derive(Clone)]
struct PermissionGuard {
    auth: Arc<AuthService>,
    permission: Arc<str>,
}

/// Require `permission` on every route already added to `router`.
///
/// Must be called after the routes are added; axum's `route_layer` does not
/// apply to routes added later.
///
/// ```ignore
/// let admin = Router::new()
///     .route("/drinks/{id}", patch(update_drink).delete(delete_drink));
/// let admin = middleware::auth::permission::apply(admin, auth.clone(), "patch:drinks");
/// ```
pub fn apply<S>(router: Router<S>, auth: Arc<AuthService>, permission: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        guard(auth, permission),
        permission_middleware,
    ))
}

/// Require `permission` on a single method router, e.g. a guarded `post`
/// next to a public `get` on the same path.
///
/// ```ignore
/// let app = Router::new().route(
///     "/drinks",
///     get(list_drinks).merge(apply_method(post(create_drink), auth, "post:drinks")),
/// );
/// ```
pub fn apply_method<S>(
    method_router: MethodRouter<S>,
    auth: Arc<AuthService>,
    permission: &str,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    method_router.route_layer(middleware::from_fn_with_state(
        guard(auth, permission),
        permission_middleware,
    ))
}

fn guard(auth: Arc<AuthService>, permission: &str) -> PermissionGuard {
    PermissionGuard {
        auth,
        permission: Arc::from(permission),
    }
}

async fn permission_middleware(
    State(guard): State<PermissionGuard>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AuthError::invalid_header("Authorization header is not valid text."))?,
        ),
    };

    let claims = match guard.auth.authorize(header, &guard.permission).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                code = err.code().as_str(),
                description = err.description(),
                permission = %guard.permission,
                method = %req.method(),
                path = req.uri().path(),
                "request authorization failed"
            );
            return Err(err);
        }
    };

    tracing::debug!(
        sub = claims.subject().unwrap_or("-"),
        permission = %guard.permission,
        "request authorized"
    );

    // handed to AuthCtxExtractor
    req.extensions_mut().insert(AuthCtx::new(claims));

    Ok(next.run(req).await)
}
