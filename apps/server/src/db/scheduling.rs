//! Appointment repository.

use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::sequences::{self, Sequence};
use crate::{
    models::{Appointment, AppointmentStatus, AppointmentType},
    Error, Result,
};

pub struct NewAppointment<'a> {
    pub patient_name: &'a str,
    pub contact: &'a str,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: &'a str,
    pub services: &'a [String],
    pub appointment_type: AppointmentType,
    pub temperature: Option<&'a str>,
    pub weight: Option<&'a str>,
}

const APPOINTMENT_COLUMNS: &str = "id, appointment_no, patient_name, contact, doctor_id, date,
     time, services, appointment_type, status, temperature, weight, created_at";

fn map_appointment(row: &PgRow) -> Result<Appointment> {
    let appointment_type: String = row.get("appointment_type");
    let status: String = row.get("status");

    Ok(Appointment {
        id: row.get("id"),
        appointment_no: row.get("appointment_no"),
        patient_name: row.get("patient_name"),
        contact: row.get("contact"),
        doctor_id: row.get("doctor_id"),
        date: row.get("date"),
        time: row.get("time"),
        services: row.get("services"),
        appointment_type: appointment_type.parse().map_err(Error::Internal)?,
        status: status.parse().map_err(Error::Internal)?,
        temperature: row.get("temperature"),
        weight: row.get("weight"),
        created_at: row.get("created_at"),
    })
}

pub async fn create(
    pool: &PgPool,
    created_by: Uuid,
    new: NewAppointment<'_>,
) -> Result<Appointment> {
    let mut tx = pool.begin().await?;
    let appointment_no = sequences::next_code(&mut *tx, Sequence::Appointment).await?;

    let query = format!(
        "INSERT INTO appointments (appointment_no, patient_name, contact, doctor_id, date, time,
                                   services, appointment_type, temperature, weight, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {APPOINTMENT_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(&appointment_no)
        .bind(new.patient_name)
        .bind(new.contact)
        .bind(new.doctor_id)
        .bind(new.date)
        .bind(new.time)
        .bind(new.services)
        .bind(new.appointment_type.as_str())
        .bind(new.temperature)
        .bind(new.weight)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

    let appointment = map_appointment(&row)?;
    tx.commit().await?;
    Ok(appointment)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Appointment>> {
    let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(map_appointment).transpose()
}

pub async fn list(
    pool: &PgPool,
    date: Option<NaiveDate>,
    status: Option<AppointmentStatus>,
) -> Result<Vec<Appointment>> {
    let query = format!(
        "SELECT {APPOINTMENT_COLUMNS}
         FROM appointments
         WHERE ($1::DATE IS NULL OR date = $1)
           AND ($2::TEXT IS NULL OR status = $2)
         ORDER BY date DESC, created_at DESC"
    );
    let rows = sqlx::query(&query)
        .bind(date)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_appointment).collect()
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    new: NewAppointment<'_>,
    status: AppointmentStatus,
) -> Result<Option<Appointment>> {
    let query = format!(
        "UPDATE appointments
         SET patient_name = $2, contact = $3, doctor_id = $4, date = $5, time = $6,
             services = $7, appointment_type = $8, status = $9, temperature = $10,
             weight = $11, updated_at = now()
         WHERE id = $1
         RETURNING {APPOINTMENT_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(new.patient_name)
        .bind(new.contact)
        .bind(new.doctor_id)
        .bind(new.date)
        .bind(new.time)
        .bind(new.services)
        .bind(new.appointment_type.as_str())
        .bind(status.as_str())
        .bind(new.temperature)
        .bind(new.weight)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_appointment).transpose()
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<Option<Appointment>> {
    let query = format!(
        "UPDATE appointments SET status = $2, updated_at = now()
         WHERE id = $1
         RETURNING {APPOINTMENT_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_appointment).transpose()
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
