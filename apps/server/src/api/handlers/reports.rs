//! Reporting endpoints over paid billing data.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db,
    state::AppState,
    Result,
};

const REPORT_ROLES: [Role; 3] = [Role::SuperAdmin, Role::CompanyAdmin, Role::Accountant];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/doctor-commission", get(doctor_commission))
        .route("/reports/revenue-by-department", get(revenue_by_department))
        .route("/reports/revenue-per-month", get(revenue_per_month))
        .route("/reports/summary", get(summary))
}

async fn doctor_commission(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&REPORT_ROLES)?;
    Ok(Json(db::reports::doctor_commissions(&state.db).await?))
}

async fn revenue_by_department(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&REPORT_ROLES)?;
    Ok(Json(db::reports::revenue_by_department(&state.db).await?))
}

#[derive(Debug, Deserialize)]
struct YearQuery {
    year: Option<i32>,
}

async fn revenue_per_month(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<YearQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&REPORT_ROLES)?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(Json(db::reports::revenue_per_month(&state.db, year).await?))
}

async fn summary(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&REPORT_ROLES)?;
    Ok(Json(db::reports::summary(&state.db).await?))
}
