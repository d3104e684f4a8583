//! HTTP application wiring (Axum router).
//!
//! - `routes/`: handlers (diagnostics only; business routes live in the host)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use menugate_infra::RepeatRequestTracker;

use crate::middleware::{self, Authenticator};

pub mod errors;
pub mod routes;

/// Build the HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(authenticator: Arc<dyn Authenticator>, tracker: Arc<RepeatRequestTracker>) -> Router {
    let auth_state = middleware::AuthState { authenticator };

    // Protected routes: require a current session.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
            tracker,
            middleware::track_repeats,
        )))
}
