//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use buildestimate_core::SessionContext;
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::state::AppState;

/// Extracts the auth session id from the `session` cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and loads the caller.
///
/// If valid, inserts a `SessionContext` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Parse session ID from cookie
    let auth_session_id = session_cookie(req.headers())
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    // 2. Validate auth session, get user_id
    let registry = state.marketplace.registry();
    let user_id = registry
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

    // 3. Load the current user record so role and approval are never stale
    let user = registry.get_user_by_id(user_id).await.map_err(|e| {
        error!("Session {} points at a missing user: {:?}", auth_session_id, e);
        StatusCode::UNAUTHORIZED
    })?;

    // 4. Insert the session context into request extensions
    req.extensions_mut()
        .insert(SessionContext::new(user, auth_session_id));

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
