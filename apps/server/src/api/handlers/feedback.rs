//! Feedback/issue endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db,
    models::{IssueStatus, ReporterType},
    state::AppState,
    Error, Result,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/issues", post(create).get(list))
        .route("/issues/:id/status", patch(set_status))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct IssueRequest {
    #[validate(length(min = 1))]
    title: String,
    #[validate(length(min = 1))]
    description: String,
}

/// Any authenticated user can file an issue; it lands with the
/// companyAdmin who owns the reporter's tenant.
async fn create(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<IssueRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let owner_id = principal.tenant_id().ok_or_else(|| {
        Error::Validation("The superAdmin has no tenant to file issues under".to_string())
    })?;

    let reporter_type = if principal.role == Role::Patient {
        ReporterType::Patient
    } else {
        ReporterType::Employee
    };

    let issue = db::feedback::create(
        &state.db,
        principal.user_id,
        reporter_type,
        owner_id,
        &payload.title,
        &payload.description,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(issue)))
}

/// A companyAdmin sees every issue in their tenant; everyone else sees
/// their own reports.
async fn list(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    let issues = if principal.role == Role::CompanyAdmin {
        db::feedback::list_for_owner(&state.db, principal.user_id).await?
    } else {
        db::feedback::list_for_reporter(&state.db, principal.user_id).await?
    };

    Ok(Json(issues))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    status: IssueStatus,
    solution: Option<String>,
}

async fn set_status(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&[Role::CompanyAdmin])?;

    let issue = db::feedback::set_status(
        &state.db,
        id,
        principal.user_id,
        payload.status,
        payload.solution.as_deref(),
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Issue {id}")))?;

    Ok(Json(issue))
}
