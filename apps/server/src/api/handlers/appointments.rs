//! Appointment endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db::{self, scheduling::NewAppointment},
    models::{AppointmentStatus, AppointmentType},
    state::AppState,
    Error, Result,
};

const APPOINTMENT_ROLES: [Role; 2] = [Role::CompanyAdmin, Role::Doctor];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create).get(list))
        .route(
            "/appointments/:id",
            get(read).put(update).delete(remove),
        )
        .route("/appointments/:id/status", patch(set_status))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct AppointmentRequest {
    #[validate(length(min = 1))]
    patient_name: String,
    #[validate(length(min = 1))]
    contact: String,
    doctor_id: Option<Uuid>,
    date: NaiveDate,
    #[validate(length(min = 1))]
    time: String,
    #[serde(default)]
    services: Vec<String>,
    appointment_type: AppointmentType,
    #[serde(default)]
    status: Option<AppointmentStatus>,
    temperature: Option<String>,
    weight: Option<String>,
}

impl AppointmentRequest {
    fn as_new(&self) -> NewAppointment<'_> {
        NewAppointment {
            patient_name: &self.patient_name,
            contact: &self.contact,
            doctor_id: self.doctor_id,
            date: self.date,
            time: &self.time,
            services: &self.services,
            appointment_type: self.appointment_type,
            temperature: self.temperature.as_deref(),
            weight: self.weight.as_deref(),
        }
    }
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<AppointmentRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&APPOINTMENT_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let appointment = db::scheduling::create(&state.db, principal.user_id, payload.as_new()).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    date: Option<NaiveDate>,
    status: Option<AppointmentStatus>,
}

async fn list(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&APPOINTMENT_ROLES)?;

    let appointments = db::scheduling::list(&state.db, query.date, query.status).await?;
    Ok(Json(appointments))
}

async fn read(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&APPOINTMENT_ROLES)?;

    let appointment = db::scheduling::get(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Appointment {id}")))?;
    Ok(Json(appointment))
}

async fn update(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&APPOINTMENT_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let status = payload.status.unwrap_or(AppointmentStatus::Pending);
    let appointment = db::scheduling::update(&state.db, id, payload.as_new(), status)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Appointment {id}")))?;
    Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: AppointmentStatus,
}

async fn set_status(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&APPOINTMENT_ROLES)?;

    let appointment = db::scheduling::set_status(&state.db, id, payload.status)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Appointment {id}")))?;
    Ok(Json(appointment))
}

async fn remove(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&APPOINTMENT_ROLES)?;

    if !db::scheduling::delete(&state.db, id).await? {
        return Err(Error::NotFound(format!("Appointment {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
