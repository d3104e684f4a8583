//! Authorization diagnostics: "may I do X on Y, and why (not)?"

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use menugate_auth::{Action, explain_authorization};

use crate::app::errors;
use crate::authz;
use crate::context::AuthContext;

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub resource: String,
    pub action: String,
}

/// GET /authz/check?resource=..&action=..
///
/// 200 with an explanation when allowed, 403 naming the required permission
/// otherwise.
pub async fn check(Extension(ctx): Extension<AuthContext>, Query(query): Query<CheckQuery>) -> Response {
    let action: Action = match query.action.parse() {
        Ok(action) => action,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_action", format!("{e}")),
    };

    if let Err(response) = authz::require_permission(&ctx, &query.resource, action) {
        return response;
    }

    let explanation = explain_authorization(ctx.permissions(), &query.resource, action);
    (StatusCode::OK, Json(explanation)).into_response()
}
