pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::ApiDoc;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use auth::{login_handler, logout_handler, signup_handler};
use rest::{
    create_project_handler, dashboard_handler, estimate_layouts_handler, estimate_tiers_handler,
    field_bot_greeting_handler, field_bot_handler, finalize_project_handler, get_me_handler, get_project_handler, list_messages_handler,
    post_message_handler, quote_project_handler, toggle_engineer_approval_handler,
    update_me_handler,
};
use state::AppState;

/// Chat attachments travel as data URLs inside JSON bodies.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Builds the API router with every public and protected route.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(get_me_handler).put(update_me_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/estimates/tiers", post(estimate_tiers_handler))
        .route("/estimates/layouts", post(estimate_layouts_handler))
        .route(
            "/estimates/fieldbot",
            get(field_bot_greeting_handler).post(field_bot_handler),
        )
        .route("/projects", post(create_project_handler))
        .route("/projects/{id}", get(get_project_handler))
        .route("/projects/{id}/quote", post(quote_project_handler))
        .route("/projects/{id}/finalize", post(finalize_project_handler))
        .route(
            "/projects/{id}/messages",
            get(list_messages_handler).post(post_message_handler),
        )
        .route(
            "/admin/engineers/{id}/approval",
            post(toggle_engineer_approval_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(app_state))
}
