//! Permission guard for handlers.
//!
//! Handlers call [`require_permission`] with the resource name and action
//! they serve before doing any work.

use axum::response::Response;

use menugate_auth::Action;

use crate::app::errors;
use crate::context::AuthContext;

pub fn require_permission(ctx: &AuthContext, resource: &str, action: Action) -> Result<(), Response> {
    ctx.require(resource, action).map_err(|e| {
        tracing::debug!(identity_id = %ctx.identity_id(), resource, action = %action, "request forbidden");
        errors::authz_error_to_response(e)
    })
}
