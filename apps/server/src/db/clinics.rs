//! Clinic repository.

use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{models::Clinic, Result};

pub struct NewClinic<'a> {
    pub name: &'a str,
    pub location: &'a str,
    pub phone: Option<&'a str>,
    pub primary_doctor_id: Option<Uuid>,
}

fn map_clinic(row: &PgRow) -> Clinic {
    Clinic {
        id: row.get("id"),
        name: row.get("name"),
        location: row.get("location"),
        phone: row.get("phone"),
        primary_doctor_id: row.get("primary_doctor_id"),
        created_at: row.get("created_at"),
    }
}

pub async fn create(pool: &PgPool, created_by: Uuid, new: NewClinic<'_>) -> Result<Clinic> {
    let row = sqlx::query(
        "INSERT INTO clinics (name, location, phone, primary_doctor_id, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, name, location, phone, primary_doctor_id, created_at",
    )
    .bind(new.name)
    .bind(new.location)
    .bind(new.phone)
    .bind(new.primary_doctor_id)
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    Ok(map_clinic(&row))
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Clinic>> {
    let row = sqlx::query(
        "SELECT id, name, location, phone, primary_doctor_id, created_at
         FROM clinics WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_clinic))
}

pub async fn list(pool: &PgPool) -> Result<Vec<Clinic>> {
    let rows = sqlx::query(
        "SELECT id, name, location, phone, primary_doctor_id, created_at
         FROM clinics ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_clinic).collect())
}

pub async fn update(pool: &PgPool, id: Uuid, new: NewClinic<'_>) -> Result<Option<Clinic>> {
    let row = sqlx::query(
        "UPDATE clinics SET name = $2, location = $3, phone = $4, primary_doctor_id = $5
         WHERE id = $1
         RETURNING id, name, location, phone, primary_doctor_id, created_at",
    )
    .bind(id)
    .bind(new.name)
    .bind(new.location)
    .bind(new.phone)
    .bind(new.primary_doctor_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_clinic))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM clinics WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
