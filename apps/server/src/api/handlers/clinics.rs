//! Clinic endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db::{self, clinics::NewClinic},
    state::AppState,
    Error, Result,
};

const CLINIC_ROLES: [Role; 2] = [Role::SuperAdmin, Role::CompanyAdmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clinics", post(create).get(list))
        .route("/clinics/:id", get(read).put(update).delete(remove))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ClinicRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    location: String,
    phone: Option<String>,
    primary_doctor_id: Option<Uuid>,
}

impl ClinicRequest {
    fn as_new(&self) -> NewClinic<'_> {
        NewClinic {
            name: &self.name,
            location: &self.location,
            phone: self.phone.as_deref(),
            primary_doctor_id: self.primary_doctor_id,
        }
    }
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<ClinicRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINIC_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    if let Some(doctor_id) = payload.primary_doctor_id {
        if !db::users::has_role(&state.db, doctor_id, Role::Doctor).await? {
            return Err(Error::NotFound(format!("Doctor {doctor_id}")));
        }
    }

    let clinic = db::clinics::create(&state.db, principal.user_id, payload.as_new()).await?;
    Ok((StatusCode::CREATED, Json(clinic)))
}

async fn list(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&CLINIC_ROLES)?;
    Ok(Json(db::clinics::list(&state.db).await?))
}

async fn read(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINIC_ROLES)?;

    let clinic = db::clinics::get(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Clinic {id}")))?;
    Ok(Json(clinic))
}

async fn update(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClinicRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINIC_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let clinic = db::clinics::update(&state.db, id, payload.as_new())
        .await?
        .ok_or_else(|| Error::NotFound(format!("Clinic {id}")))?;
    Ok(Json(clinic))
}

async fn remove(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINIC_ROLES)?;

    if !db::clinics::delete(&state.db, id).await? {
        return Err(Error::NotFound(format!("Clinic {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
