use axum::{Router, routing::get};

pub mod access;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/authz/check", get(access::check))
}
