use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::AuthContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller's identity and the permission tree the navigation UI renders.
pub async fn whoami(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "identity_id": ctx.identity_id().to_string(),
        "username": ctx.username(),
        "roles": ctx.roles().iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "permissions": ctx.permissions(),
    }))
}
