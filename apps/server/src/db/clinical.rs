//! Clinical records: consultations, prescriptions, lab-test catalog,
//! vaccination doses.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::sequences::{self, Sequence};
use super::users;
use crate::{
    auth::Role,
    models::{Consultation, DoseStatus, LabTest, Prescription, PrescriptionLine, VaccinationDose},
    Error, Result,
};

pub struct NewConsultation<'a> {
    pub patient_id: Uuid,
    pub services: &'a [String],
    pub details: &'a str,
    pub temperature: &'a str,
    pub weight: &'a str,
    pub consultation_date: NaiveDate,
    pub consultation_time: &'a str,
    pub health: Option<&'a str>,
    pub bmi: Option<&'a str>,
}

pub struct NewPrescription<'a> {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub lines: &'a [PrescriptionLine],
    pub notes: Option<&'a str>,
}

pub struct NewDose<'a> {
    pub patient_id: Uuid,
    pub vaccine: &'a str,
    pub dose: &'a str,
    pub administered_on: NaiveDate,
    pub next_due_on: Option<NaiveDate>,
    pub clinic_id: Option<Uuid>,
    pub status: DoseStatus,
}

fn map_consultation(row: &PgRow) -> Consultation {
    Consultation {
        id: row.get("id"),
        consultation_no: row.get("consultation_no"),
        patient_id: row.get("patient_id"),
        patient_name: row.get("patient_name"),
        services: row.get("services"),
        details: row.get("details"),
        temperature: row.get("temperature"),
        weight: row.get("weight"),
        consultation_date: row.get("consultation_date"),
        consultation_time: row.get("consultation_time"),
        health: row.get("health"),
        bmi: row.get("bmi"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn map_prescription(row: &PgRow) -> Result<Prescription> {
    let lines: serde_json::Value = row.get("lines");
    let lines: Vec<PrescriptionLine> = serde_json::from_value(lines)
        .map_err(|err| Error::Internal(format!("Malformed prescription lines: {err}")))?;

    Ok(Prescription {
        id: row.get("id"),
        prescription_no: row.get("prescription_no"),
        patient_id: row.get("patient_id"),
        patient_name: row.get("patient_name"),
        doctor_id: row.get("doctor_id"),
        doctor_name: row.get("doctor_name"),
        lines,
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    })
}

fn map_lab_test(row: &PgRow) -> LabTest {
    LabTest {
        id: row.get("id"),
        name: row.get("name"),
        unit: row.get("unit"),
        min: row.get("min_value"),
        max: row.get("max_value"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn map_dose(row: &PgRow) -> Result<VaccinationDose> {
    let status: String = row.get("status");
    Ok(VaccinationDose {
        id: row.get("id"),
        dose_no: row.get("dose_no"),
        patient_id: row.get("patient_id"),
        patient_name: row.get("patient_name"),
        vaccine: row.get("vaccine"),
        dose: row.get("dose"),
        administered_on: row.get("administered_on"),
        next_due_on: row.get("next_due_on"),
        clinic_id: row.get("clinic_id"),
        administered_by: row.get("administered_by"),
        status: status.parse().map_err(Error::Internal)?,
        created_at: row.get("created_at"),
    })
}

async fn require_patient(pool: &PgPool, patient_id: Uuid) -> Result<()> {
    if !users::has_role(pool, patient_id, Role::Patient).await? {
        return Err(Error::NotFound(format!("Patient {patient_id}")));
    }
    Ok(())
}

pub async fn create_consultation(
    pool: &PgPool,
    created_by: Uuid,
    new: NewConsultation<'_>,
) -> Result<Consultation> {
    require_patient(pool, new.patient_id).await?;

    let mut tx = pool.begin().await?;
    let consultation_no = sequences::next_code(&mut *tx, Sequence::Consultation).await?;

    let row = sqlx::query(
        "WITH inserted AS (
            INSERT INTO consultations (consultation_no, patient_id, services, details,
                                       temperature, weight, consultation_date,
                                       consultation_time, health, bmi, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
         )
         SELECT i.id, i.consultation_no, i.patient_id, u.name AS patient_name, i.services,
                i.details, i.temperature, i.weight, i.consultation_date, i.consultation_time,
                i.health, i.bmi, i.created_by, i.created_at
         FROM inserted i JOIN users u ON u.id = i.patient_id",
    )
    .bind(&consultation_no)
    .bind(new.patient_id)
    .bind(new.services)
    .bind(new.details)
    .bind(new.temperature)
    .bind(new.weight)
    .bind(new.consultation_date)
    .bind(new.consultation_time)
    .bind(new.health)
    .bind(new.bmi)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    let consultation = map_consultation(&row);
    tx.commit().await?;
    Ok(consultation)
}

pub async fn list_consultations(
    pool: &PgPool,
    patient_id: Option<Uuid>,
) -> Result<Vec<Consultation>> {
    let rows = sqlx::query(
        "SELECT c.id, c.consultation_no, c.patient_id, u.name AS patient_name, c.services,
                c.details, c.temperature, c.weight, c.consultation_date, c.consultation_time,
                c.health, c.bmi, c.created_by, c.created_at
         FROM consultations c
         JOIN users u ON u.id = c.patient_id
         WHERE ($1::UUID IS NULL OR c.patient_id = $1)
         ORDER BY c.consultation_date DESC, c.created_at DESC",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_consultation).collect())
}

pub async fn get_consultation(pool: &PgPool, id: Uuid) -> Result<Option<Consultation>> {
    let row = sqlx::query(
        "SELECT c.id, c.consultation_no, c.patient_id, u.name AS patient_name, c.services,
                c.details, c.temperature, c.weight, c.consultation_date, c.consultation_time,
                c.health, c.bmi, c.created_by, c.created_at
         FROM consultations c
         JOIN users u ON u.id = c.patient_id
         WHERE c.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_consultation))
}

pub async fn update_consultation(
    pool: &PgPool,
    id: Uuid,
    new: NewConsultation<'_>,
) -> Result<Option<Consultation>> {
    require_patient(pool, new.patient_id).await?;

    let row = sqlx::query(
        "WITH updated AS (
            UPDATE consultations
            SET patient_id = $2, services = $3, details = $4, temperature = $5,
                weight = $6, consultation_date = $7, consultation_time = $8,
                health = $9, bmi = $10
            WHERE id = $1
            RETURNING *
         )
         SELECT c.id, c.consultation_no, c.patient_id, u.name AS patient_name, c.services,
                c.details, c.temperature, c.weight, c.consultation_date, c.consultation_time,
                c.health, c.bmi, c.created_by, c.created_at
         FROM updated c JOIN users u ON u.id = c.patient_id",
    )
    .bind(id)
    .bind(new.patient_id)
    .bind(new.services)
    .bind(new.details)
    .bind(new.temperature)
    .bind(new.weight)
    .bind(new.consultation_date)
    .bind(new.consultation_time)
    .bind(new.health)
    .bind(new.bmi)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_consultation))
}

pub async fn delete_consultation(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM consultations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn create_prescription(pool: &PgPool, new: NewPrescription<'_>) -> Result<Prescription> {
    if new.lines.is_empty() {
        return Err(Error::Validation(
            "A prescription needs at least one medication line".into(),
        ));
    }
    require_patient(pool, new.patient_id).await?;
    if !users::has_role(pool, new.doctor_id, Role::Doctor).await? {
        return Err(Error::NotFound(format!("Doctor {}", new.doctor_id)));
    }

    let lines = serde_json::to_value(new.lines)
        .map_err(|err| Error::Internal(format!("Prescription lines encode: {err}")))?;

    let mut tx = pool.begin().await?;
    let prescription_no = sequences::next_code(&mut *tx, Sequence::Prescription).await?;

    let row = sqlx::query(
        "WITH inserted AS (
            INSERT INTO prescriptions (prescription_no, patient_id, doctor_id, lines, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
         )
         SELECT i.id, i.prescription_no, i.patient_id, p.name AS patient_name,
                i.doctor_id, d.name AS doctor_name, i.lines, i.notes, i.created_at
         FROM inserted i
         JOIN users p ON p.id = i.patient_id
         JOIN users d ON d.id = i.doctor_id",
    )
    .bind(&prescription_no)
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(lines)
    .bind(new.notes)
    .fetch_one(&mut *tx)
    .await?;

    let prescription = map_prescription(&row)?;
    tx.commit().await?;
    Ok(prescription)
}

pub async fn list_prescriptions(
    pool: &PgPool,
    patient_id: Option<Uuid>,
) -> Result<Vec<Prescription>> {
    let rows = sqlx::query(
        "SELECT r.id, r.prescription_no, r.patient_id, p.name AS patient_name,
                r.doctor_id, d.name AS doctor_name, r.lines, r.notes, r.created_at
         FROM prescriptions r
         JOIN users p ON p.id = r.patient_id
         JOIN users d ON d.id = r.doctor_id
         WHERE ($1::UUID IS NULL OR r.patient_id = $1)
         ORDER BY r.created_at DESC",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_prescription).collect()
}

pub async fn get_prescription(pool: &PgPool, id: Uuid) -> Result<Option<Prescription>> {
    let row = sqlx::query(
        "SELECT r.id, r.prescription_no, r.patient_id, p.name AS patient_name,
                r.doctor_id, d.name AS doctor_name, r.lines, r.notes, r.created_at
         FROM prescriptions r
         JOIN users p ON p.id = r.patient_id
         JOIN users d ON d.id = r.doctor_id
         WHERE r.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_prescription).transpose()
}

pub async fn update_prescription(
    pool: &PgPool,
    id: Uuid,
    new: NewPrescription<'_>,
) -> Result<Option<Prescription>> {
    if new.lines.is_empty() {
        return Err(Error::Validation(
            "A prescription needs at least one medication line".into(),
        ));
    }
    require_patient(pool, new.patient_id).await?;
    if !users::has_role(pool, new.doctor_id, Role::Doctor).await? {
        return Err(Error::NotFound(format!("Doctor {}", new.doctor_id)));
    }

    let lines = serde_json::to_value(new.lines)
        .map_err(|err| Error::Internal(format!("Prescription lines encode: {err}")))?;

    let row = sqlx::query(
        "WITH updated AS (
            UPDATE prescriptions
            SET patient_id = $2, doctor_id = $3, lines = $4, notes = $5
            WHERE id = $1
            RETURNING *
         )
         SELECT r.id, r.prescription_no, r.patient_id, p.name AS patient_name,
                r.doctor_id, d.name AS doctor_name, r.lines, r.notes, r.created_at
         FROM updated r
         JOIN users p ON p.id = r.patient_id
         JOIN users d ON d.id = r.doctor_id",
    )
    .bind(id)
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(lines)
    .bind(new.notes)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_prescription).transpose()
}

pub async fn delete_prescription(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn create_lab_test(
    pool: &PgPool,
    created_by: Uuid,
    name: &str,
    unit: &str,
    min: Decimal,
    max: Decimal,
) -> Result<LabTest> {
    if min > max {
        return Err(Error::Validation(
            "Reference range minimum exceeds maximum".into(),
        ));
    }

    let row = sqlx::query(
        "INSERT INTO lab_tests (name, unit, min_value, max_value, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, name, unit, min_value, max_value, created_by, created_at",
    )
    .bind(name)
    .bind(unit)
    .bind(min)
    .bind(max)
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    Ok(map_lab_test(&row))
}

pub async fn list_lab_tests(pool: &PgPool) -> Result<Vec<LabTest>> {
    let rows = sqlx::query(
        "SELECT id, name, unit, min_value, max_value, created_by, created_at
         FROM lab_tests ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_lab_test).collect())
}

pub async fn update_lab_test(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    unit: &str,
    min: Decimal,
    max: Decimal,
) -> Result<Option<LabTest>> {
    if min > max {
        return Err(Error::Validation(
            "Reference range minimum exceeds maximum".into(),
        ));
    }

    let row = sqlx::query(
        "UPDATE lab_tests SET name = $2, unit = $3, min_value = $4, max_value = $5
         WHERE id = $1
         RETURNING id, name, unit, min_value, max_value, created_by, created_at",
    )
    .bind(id)
    .bind(name)
    .bind(unit)
    .bind(min)
    .bind(max)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_lab_test))
}

pub async fn delete_lab_test(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM lab_tests WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn create_dose(
    pool: &PgPool,
    administered_by: Uuid,
    new: NewDose<'_>,
) -> Result<VaccinationDose> {
    require_patient(pool, new.patient_id).await?;

    let mut tx = pool.begin().await?;
    let dose_no = sequences::next_code(&mut *tx, Sequence::Dose).await?;

    let row = sqlx::query(
        "WITH inserted AS (
            INSERT INTO vaccination_doses (dose_no, patient_id, vaccine, dose, administered_on,
                                           next_due_on, clinic_id, administered_by, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
         )
         SELECT i.id, i.dose_no, i.patient_id, u.name AS patient_name, i.vaccine, i.dose,
                i.administered_on, i.next_due_on, i.clinic_id, i.administered_by, i.status,
                i.created_at
         FROM inserted i JOIN users u ON u.id = i.patient_id",
    )
    .bind(&dose_no)
    .bind(new.patient_id)
    .bind(new.vaccine)
    .bind(new.dose)
    .bind(new.administered_on)
    .bind(new.next_due_on)
    .bind(new.clinic_id)
    .bind(administered_by)
    .bind(new.status.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let dose = map_dose(&row)?;
    tx.commit().await?;
    Ok(dose)
}

pub async fn get_dose(pool: &PgPool, id: Uuid) -> Result<Option<VaccinationDose>> {
    let row = sqlx::query(
        "SELECT v.id, v.dose_no, v.patient_id, u.name AS patient_name, v.vaccine, v.dose,
                v.administered_on, v.next_due_on, v.clinic_id, v.administered_by, v.status,
                v.created_at
         FROM vaccination_doses v
         JOIN users u ON u.id = v.patient_id
         WHERE v.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_dose).transpose()
}

pub async fn set_dose_status(
    pool: &PgPool,
    id: Uuid,
    status: DoseStatus,
) -> Result<Option<VaccinationDose>> {
    let updated = sqlx::query("UPDATE vaccination_doses SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query(
        "SELECT v.id, v.dose_no, v.patient_id, u.name AS patient_name, v.vaccine, v.dose,
                v.administered_on, v.next_due_on, v.clinic_id, v.administered_by, v.status,
                v.created_at
         FROM vaccination_doses v
         JOIN users u ON u.id = v.patient_id
         WHERE v.id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    map_dose(&row).map(Some)
}

pub async fn delete_dose(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM vaccination_doses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_doses(pool: &PgPool, patient_id: Option<Uuid>) -> Result<Vec<VaccinationDose>> {
    let rows = sqlx::query(
        "SELECT v.id, v.dose_no, v.patient_id, u.name AS patient_name, v.vaccine, v.dose,
                v.administered_on, v.next_due_on, v.clinic_id, v.administered_by, v.status,
                v.created_at
         FROM vaccination_doses v
         JOIN users u ON u.id = v.patient_id
         WHERE ($1::UUID IS NULL OR v.patient_id = $1)
         ORDER BY v.administered_on DESC",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_dose).collect()
}
