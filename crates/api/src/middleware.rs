use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use menugate_auth::{AuthError, AuthResult, AuthStore, PolicyEvaluator, TokenSigner};
use menugate_infra::{RepeatRequestTracker, RequestKey};

use crate::app::errors;
use crate::context::AuthContext;

/// Resolves a bearer token into an authenticated caller.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, raw_token: &str) -> Result<AuthResult, AuthError>;
}

#[async_trait]
impl<S, T> Authenticator for PolicyEvaluator<S, T>
where
    S: AuthStore,
    T: TokenSigner,
{
    async fn authenticate(&self, raw_token: &str) -> Result<AuthResult, AuthError> {
        PolicyEvaluator::authenticate(self, raw_token).await
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<dyn Authenticator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(errors::auth_error_to_response)?;

    let result = state
        .authenticator
        .authenticate(token)
        .await
        .map_err(errors::auth_error_to_response)?;

    req.extensions_mut().insert(AuthContext::new(result));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let missing = || AuthError::Unauthenticated("missing bearer token".to_string());

    let header = headers.get(axum::http::header::AUTHORIZATION).ok_or_else(missing)?;
    let header = header.to_str().map_err(|_| missing())?;
    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}

/// Log rapid repeats of the same request. Never rejects anything.
pub async fn track_repeats(
    State(tracker): State<Arc<RepeatRequestTracker>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let key = RequestKey::new(client_of(req.headers()), format!("{} {}", req.method(), req.uri().path()));
    let observation = tracker.observe(key.clone());

    if observation.rapid {
        tracing::warn!(
            client = %key.client,
            endpoint = %key.endpoint,
            since_last_ms = observation.since_last.map(|d| d.as_millis() as u64),
            "rapid repeated request"
        );
    }

    next.run(req).await
}

fn client_of(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
