use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use menugate_auth::{AuthError, AuthzError};

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let status = match &err {
        AuthError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::TokenIssuance(_) | AuthError::StorageRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::Unauthenticated(_)
        | AuthError::TokenExpired
        | AuthError::SessionSuperseded
        | AuthError::IdentityDisabled
        | AuthError::IdentityNotFound
        | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
    };

    if status.is_server_error() {
        tracing::warn!(error = %err, "authentication failed on infrastructure");
    }

    json_error(status, err.code(), err.to_string())
}

/// 403 naming the permission that was required.
pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    let (resource, action) = err.required();
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({
            "error": "forbidden",
            "message": err.to_string(),
            "required": {
                "resource": resource,
                "action": action.as_str(),
                "permission": action.flag_name(),
            },
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
