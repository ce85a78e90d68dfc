//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{self, AuthResponse, LoginRequest, SignupRequest};
use crate::web::protocol::{
    AdminDashboardDto, AdminStatsDto, ChatMessageDto, ConstructionDetailsDto, CostTierDto,
    CustomerDashboardDto, DashboardDto, EngineerDashboardDto, EstimateDto, EstimateTiersRequest,
    EstimateTiersResponse, FieldBotRequest, FieldBotResponse, FloorConfigDto, LayoutOptionDto,
    LayoutRequest, LayoutResponse, PostMessageRequest, ProfileUpdateRequest, ProjectDto,
    QuoteRequestDto, SubmitProjectRequest, UserDto,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use buildestimate_core::{
    estimate::{DEFAULT_LAYOUT_STYLES, FIELD_BOT_GREETING},
    DomainError, LayoutOption, PortError, SessionContext,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        get_me_handler,
        update_me_handler,
        dashboard_handler,
        estimate_tiers_handler,
        estimate_layouts_handler,
        field_bot_greeting_handler,
        field_bot_handler,
        create_project_handler,
        get_project_handler,
        quote_project_handler,
        finalize_project_handler,
        list_messages_handler,
        post_message_handler,
        toggle_engineer_approval_handler,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, AuthResponse, UserDto, ProfileUpdateRequest,
            FloorConfigDto, ConstructionDetailsDto, CostTierDto, EstimateTiersRequest,
            EstimateTiersResponse, FieldBotRequest, FieldBotResponse, LayoutRequest,
            LayoutOptionDto, LayoutResponse, EstimateDto,
            ChatMessageDto, ProjectDto, SubmitProjectRequest, QuoteRequestDto, PostMessageRequest,
            DashboardDto, CustomerDashboardDto, EngineerDashboardDto, AdminDashboardDto,
            AdminStatsDto
        )
    ),
    tags(
        (name = "BuildEstimate API", description = "Construction estimates, layouts and engineer quotes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a core error onto the status code and message returned to the client.
pub fn domain_error(e: DomainError) -> (StatusCode, String) {
    let status = match &e {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidTransition { .. } | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
        DomainError::Port(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {:?}", e);
        (status, "Internal server error".to_string())
    } else {
        (status, e.to_string())
    }
}

//=========================================================================================
// Profile and Dashboard Handlers
//=========================================================================================

/// Returns the signed-in user's profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The current user", body = UserDto),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me_handler(Extension(session): Extension<SessionContext>) -> Json<UserDto> {
    Json(UserDto::from(&session.user))
}

/// Edits the signed-in user's profile. Role and email cannot be changed.
#[utoipa::path(
    put,
    path = "/me",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserDto),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn update_me_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = app_state
        .marketplace
        .update_profile(&session, req.into())
        .await
        .map_err(domain_error)?;
    Ok(Json(UserDto::from(&user)))
}

/// The dashboard for the caller's role.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Role-specific dashboard", body = DashboardDto),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn dashboard_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = app_state
        .marketplace
        .dashboard(&session)
        .await
        .map_err(domain_error)?;
    Ok(Json(DashboardDto::from(&view)))
}

//=========================================================================================
// Estimate Handlers
//=========================================================================================

/// Six cost tiers for the given details. Served from the fallback table when
/// the generative service is unavailable, so this never fails on AI errors.
#[utoipa::path(
    post,
    path = "/estimates/tiers",
    request_body = EstimateTiersRequest,
    responses(
        (status = 200, description = "Cost tiers", body = EstimateTiersResponse),
        (status = 400, description = "Invalid construction details")
    )
)]
pub async fn estimate_tiers_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(_session): Extension<SessionContext>,
    Json(req): Json<EstimateTiersRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let details = req.details.into_domain().map_err(domain_error)?;

    // Dropping the handler future (client went away) cancels the outbound call.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let tiers = app_state.engine.request_cost_tiers(&details, &cancel).await;
    Ok(Json(EstimateTiersResponse {
        tiers: tiers.into_iter().map(CostTierDto::from).collect(),
    }))
}

/// Renders one floor plan per style, in parallel. Failed styles are left out;
/// an empty `layouts` list means no layout could be generated.
#[utoipa::path(
    post,
    path = "/estimates/layouts",
    request_body = LayoutRequest,
    responses(
        (status = 200, description = "Generated layouts", body = LayoutResponse),
        (status = 400, description = "Invalid construction details")
    )
)]
pub async fn estimate_layouts_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(_session): Extension<SessionContext>,
    Json(req): Json<LayoutRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let details = req.details.into_domain().map_err(domain_error)?;

    let styles = select_styles(&req.styles, app_state.config.layout_style_count);

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let batch = app_state
        .engine
        .request_layout_images(&details, &styles, &cancel)
        .await;
    if batch.is_empty() {
        warn!("No layouts could be generated for {} styles", styles.len());
    }
    Ok(Json(LayoutResponse::from(batch)))
}

/// Trimmed caller styles, or the default styles when none are usable,
/// capped at `count` either way.
pub fn select_styles(requested: &[String], count: usize) -> Vec<&str> {
    let styles: Vec<&str> = requested
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(count)
        .collect();
    if styles.is_empty() {
        DEFAULT_LAYOUT_STYLES.iter().copied().take(count).collect()
    } else {
        styles
    }
}

/// FieldBot's opening line.
#[utoipa::path(
    get,
    path = "/estimates/fieldbot",
    responses(
        (status = 200, description = "FieldBot greeting", body = FieldBotResponse)
    )
)]
pub async fn field_bot_greeting_handler(
    Extension(_session): Extension<SessionContext>,
) -> Json<FieldBotResponse> {
    Json(FieldBotResponse {
        answer: FIELD_BOT_GREETING.to_string(),
    })
}

/// Asks FieldBot for a location-adjusted estimate. Service failures come
/// back as a canned reply with status 200.
#[utoipa::path(
    post,
    path = "/estimates/fieldbot",
    request_body = FieldBotRequest,
    responses(
        (status = 200, description = "FieldBot answer", body = FieldBotResponse),
        (status = 400, description = "Empty question")
    )
)]
pub async fn field_bot_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(_session): Extension<SessionContext>,
    Json(req): Json<FieldBotRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.question.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "question must not be empty".to_string()));
    }

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let answer = app_state.engine.ask_field_bot(&req.question, &cancel).await;
    Ok(Json(FieldBotResponse { answer }))
}

//=========================================================================================
// Project Handlers
//=========================================================================================

/// Submits a new project for engineer review. Customers only.
#[utoipa::path(
    post,
    path = "/projects",
    request_body = SubmitProjectRequest,
    responses(
        (status = 201, description = "Project submitted", body = ProjectDto),
        (status = 400, description = "Invalid construction details"),
        (status = 403, description = "Caller is not a customer")
    )
)]
pub async fn create_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<SubmitProjectRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let details = req.details.into_domain().map_err(domain_error)?;
    let history: Vec<LayoutOption> = req.layout_history.into_iter().map(Into::into).collect();
    let project = app_state
        .marketplace
        .submit_project(&session, details, req.selected_layout_url, history)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ProjectDto::from(&project))))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "The project id.")),
    responses(
        (status = 200, description = "The project", body = ProjectDto),
        (status = 403, description = "Project not visible to the caller"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let project = app_state
        .marketplace
        .project_for(&session, id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ProjectDto::from(&project)))
}

/// Attaches a verified engineer's quote and approves the project.
#[utoipa::path(
    post,
    path = "/projects/{id}/quote",
    params(("id" = Uuid, Path, description = "The project id.")),
    request_body = QuoteRequestDto,
    responses(
        (status = 200, description = "Project approved", body = ProjectDto),
        (status = 400, description = "Invalid quote"),
        (status = 403, description = "Caller is not a verified engineer"),
        (status = 409, description = "Project is no longer awaiting a quote")
    )
)]
pub async fn quote_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<QuoteRequestDto>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let project = app_state
        .marketplace
        .quote_project(&session, id, req.into())
        .await
        .map_err(domain_error)?;
    info!("Quote accepted on project {}", project.id);
    Ok(Json(ProjectDto::from(&project)))
}

/// The owning customer confirms an approved project.
#[utoipa::path(
    post,
    path = "/projects/{id}/finalize",
    params(("id" = Uuid, Path, description = "The project id.")),
    responses(
        (status = 200, description = "Project finalized", body = ProjectDto),
        (status = 403, description = "Caller does not own the project"),
        (status = 409, description = "Project is not approved")
    )
)]
pub async fn finalize_project_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let project = app_state
        .marketplace
        .finalize_project(&session, id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ProjectDto::from(&project)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/messages",
    params(("id" = Uuid, Path, description = "The project id.")),
    responses(
        (status = 200, description = "The message thread, oldest first", body = [ChatMessageDto]),
        (status = 403, description = "Caller is not a participant")
    )
)]
pub async fn list_messages_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let messages = app_state
        .marketplace
        .messages(&session, id)
        .await
        .map_err(domain_error)?;
    Ok(Json(
        messages.iter().map(ChatMessageDto::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/projects/{id}/messages",
    params(("id" = Uuid, Path, description = "The project id.")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = ChatMessageDto),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Thread closed or caller is not a participant")
    )
)]
pub async fn post_message_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let draft = req.into_draft().map_err(domain_error)?;
    let message = app_state
        .marketplace
        .post_message(&session, id, draft)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ChatMessageDto::from(&message))))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

/// Flips an engineer between verified and pending. Admins only.
#[utoipa::path(
    post,
    path = "/admin/engineers/{id}/approval",
    params(("id" = Uuid, Path, description = "The engineer's user id.")),
    responses(
        (status = 200, description = "Updated engineer", body = UserDto),
        (status = 400, description = "Target is not an engineer"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn toggle_engineer_approval_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let engineer = app_state
        .marketplace
        .toggle_engineer_approval(&session, id)
        .await
        .map_err(domain_error)?;
    Ok(Json(UserDto::from(&engineer)))
}
