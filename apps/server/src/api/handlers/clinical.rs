//! Clinical endpoints: consultations, prescriptions, lab tests, vaccination
//! doses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db::{
        self,
        clinical::{NewConsultation, NewDose, NewPrescription},
    },
    models::{DoseStatus, PrescriptionLine},
    state::AppState,
    Error, Result,
};

const CLINICAL_ROLES: [Role; 2] = [Role::CompanyAdmin, Role::Doctor];
const LAB_ROLES: [Role; 2] = [Role::CompanyAdmin, Role::LabTechnician];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/consultations", post(create_consultation).get(list_consultations))
        .route(
            "/consultations/:id",
            get(read_consultation)
                .put(update_consultation)
                .delete(remove_consultation),
        )
        .route("/prescriptions", post(create_prescription).get(list_prescriptions))
        .route(
            "/prescriptions/:id",
            get(read_prescription)
                .put(update_prescription)
                .delete(remove_prescription),
        )
        .route("/lab-tests", post(create_lab_test).get(list_lab_tests))
        .route("/lab-tests/:id", put(update_lab_test).delete(remove_lab_test))
        .route("/vaccination-doses", post(create_dose).get(list_doses))
        .route("/vaccination-doses/:id", get(read_dose).delete(remove_dose))
        .route("/vaccination-doses/:id/status", patch(set_dose_status))
}

#[derive(Debug, Deserialize)]
struct PatientQuery {
    patient_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ConsultationRequest {
    patient_id: Uuid,
    #[validate(length(min = 1))]
    services: Vec<String>,
    #[validate(length(min = 1))]
    details: String,
    #[validate(length(min = 1))]
    temperature: String,
    #[validate(length(min = 1))]
    weight: String,
    consultation_date: NaiveDate,
    #[validate(length(min = 1))]
    consultation_time: String,
    health: Option<String>,
    bmi: Option<String>,
}

async fn create_consultation(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<ConsultationRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let consultation = db::clinical::create_consultation(
        &state.db,
        principal.user_id,
        NewConsultation {
            patient_id: payload.patient_id,
            services: &payload.services,
            details: &payload.details,
            temperature: &payload.temperature,
            weight: &payload.weight,
            consultation_date: payload.consultation_date,
            consultation_time: &payload.consultation_time,
            health: payload.health.as_deref(),
            bmi: payload.bmi.as_deref(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(consultation)))
}

async fn list_consultations(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<PatientQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    Ok(Json(
        db::clinical::list_consultations(&state.db, query.patient_id).await?,
    ))
}

async fn read_consultation(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    let consultation = db::clinical::get_consultation(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Consultation {id}")))?;
    Ok(Json(consultation))
}

async fn update_consultation(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsultationRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let consultation = db::clinical::update_consultation(
        &state.db,
        id,
        NewConsultation {
            patient_id: payload.patient_id,
            services: &payload.services,
            details: &payload.details,
            temperature: &payload.temperature,
            weight: &payload.weight,
            consultation_date: payload.consultation_date,
            consultation_time: &payload.consultation_time,
            health: payload.health.as_deref(),
            bmi: payload.bmi.as_deref(),
        },
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Consultation {id}")))?;

    Ok(Json(consultation))
}

async fn remove_consultation(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    if !db::clinical::delete_consultation(&state.db, id).await? {
        return Err(Error::NotFound(format!("Consultation {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PrescriptionRequest {
    patient_id: Uuid,
    doctor_id: Uuid,
    #[validate(length(min = 1))]
    lines: Vec<PrescriptionLine>,
    notes: Option<String>,
}

async fn create_prescription(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<PrescriptionRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let prescription = db::clinical::create_prescription(
        &state.db,
        NewPrescription {
            patient_id: payload.patient_id,
            doctor_id: payload.doctor_id,
            lines: &payload.lines,
            notes: payload.notes.as_deref(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(prescription)))
}

async fn list_prescriptions(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<PatientQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    Ok(Json(
        db::clinical::list_prescriptions(&state.db, query.patient_id).await?,
    ))
}

async fn read_prescription(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    let prescription = db::clinical::get_prescription(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Prescription {id}")))?;
    Ok(Json(prescription))
}

async fn update_prescription(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<PrescriptionRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let prescription = db::clinical::update_prescription(
        &state.db,
        id,
        NewPrescription {
            patient_id: payload.patient_id,
            doctor_id: payload.doctor_id,
            lines: &payload.lines,
            notes: payload.notes.as_deref(),
        },
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Prescription {id}")))?;

    Ok(Json(prescription))
}

async fn remove_prescription(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    if !db::clinical::delete_prescription(&state.db, id).await? {
        return Err(Error::NotFound(format!("Prescription {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LabTestRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    unit: String,
    min: Decimal,
    max: Decimal,
}

async fn create_lab_test(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<LabTestRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&LAB_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let test = db::clinical::create_lab_test(
        &state.db,
        principal.user_id,
        &payload.name,
        &payload.unit,
        payload.min,
        payload.max,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(test)))
}

async fn list_lab_tests(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&LAB_ROLES)?;
    Ok(Json(db::clinical::list_lab_tests(&state.db).await?))
}

async fn update_lab_test(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<LabTestRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&LAB_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let test = db::clinical::update_lab_test(
        &state.db,
        id,
        &payload.name,
        &payload.unit,
        payload.min,
        payload.max,
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Lab test {id}")))?;

    Ok(Json(test))
}

async fn remove_lab_test(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&LAB_ROLES)?;

    if !db::clinical::delete_lab_test(&state.db, id).await? {
        return Err(Error::NotFound(format!("Lab test {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct DoseRequest {
    patient_id: Uuid,
    #[validate(length(min = 1))]
    vaccine: String,
    /// Dose label within the series, e.g. "1st" or "Booster".
    #[validate(length(min = 1))]
    dose: String,
    administered_on: NaiveDate,
    next_due_on: Option<NaiveDate>,
    clinic_id: Option<Uuid>,
    #[serde(default)]
    status: Option<DoseStatus>,
}

async fn create_dose(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<DoseRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let dose = db::clinical::create_dose(
        &state.db,
        principal.user_id,
        NewDose {
            patient_id: payload.patient_id,
            vaccine: &payload.vaccine,
            dose: &payload.dose,
            administered_on: payload.administered_on,
            next_due_on: payload.next_due_on,
            clinic_id: payload.clinic_id,
            status: payload.status.unwrap_or(DoseStatus::Completed),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(dose)))
}

async fn list_doses(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<PatientQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;
    Ok(Json(
        db::clinical::list_doses(&state.db, query.patient_id).await?,
    ))
}

async fn read_dose(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    let dose = db::clinical::get_dose(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Vaccination dose {id}")))?;
    Ok(Json(dose))
}

#[derive(Debug, Deserialize)]
struct DoseStatusRequest {
    status: DoseStatus,
}

async fn set_dose_status(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<DoseStatusRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    let dose = db::clinical::set_dose_status(&state.db, id, payload.status)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Vaccination dose {id}")))?;
    Ok(Json(dose))
}

async fn remove_dose(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&CLINICAL_ROLES)?;

    if !db::clinical::delete_dose(&state.db, id).await? {
        return Err(Error::NotFound(format!("Vaccination dose {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
