//! User repository: provisioning, login lookups, password reset.

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::sequences::{self, Sequence};
use crate::{auth::Role, models::User, Error, Result};

/// Internal record carrying credentials. Never serialized.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_by: Option<Uuid>,
    pub password_hash: String,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub created_by: Option<Uuid>,
    pub registration_no: Option<&'a str>,
    pub phone: Option<&'a str>,
}

fn map_user(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: role.parse().map_err(Error::Internal)?,
        created_by: row.get("created_by"),
        registration_no: row.get("registration_no"),
        patient_code: row.get("patient_code"),
        phone: row.get("phone"),
        created_at: row.get("created_at"),
    })
}

fn map_auth_user(row: &PgRow) -> Result<AuthUser> {
    let role: String = row.get("role");
    Ok(AuthUser {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: role.parse().map_err(Error::Internal)?,
        created_by: row.get("created_by"),
        password_hash: row.get("password_hash"),
    })
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn role_exists(pool: &PgPool, role: Role) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM users WHERE role = $1 LIMIT 1")
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Login lookup keyed by email AND role, matching the original's contract:
/// the same message covers a wrong email, role, or password.
pub async fn find_for_login(pool: &PgPool, email: &str, role: Role) -> Result<Option<AuthUser>> {
    let row = sqlx::query(
        "SELECT id, email, name, role, created_by, password_hash
         FROM users WHERE email = $1 AND role = $2",
    )
    .bind(email)
    .bind(role.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_auth_user).transpose()
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<AuthUser>> {
    let row = sqlx::query(
        "SELECT id, email, name, role, created_by, password_hash
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_auth_user).transpose()
}

/// Insert a user. Patients get a sequential `patient_code`, allocated in the
/// same transaction as the insert.
pub async fn create(pool: &PgPool, new: NewUser<'_>) -> Result<User> {
    let mut tx = pool.begin().await?;

    let patient_code = if new.role == Role::Patient {
        Some(sequences::next_code(&mut *tx, Sequence::Patient).await?)
    } else {
        None
    };

    let row = sqlx::query(
        "INSERT INTO users (email, name, password_hash, role, created_by, registration_no, patient_code, phone)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, email, name, role, created_by, registration_no, patient_code, phone, created_at",
    )
    .bind(new.email)
    .bind(new.name)
    .bind(new.password_hash)
    .bind(new.role.as_str())
    .bind(new.created_by)
    .bind(new.registration_no)
    .bind(patient_code)
    .bind(new.phone)
    .fetch_one(&mut *tx)
    .await?;

    let user = map_user(&row)?;
    tx.commit().await?;
    Ok(user)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, email, name, role, created_by, registration_no, patient_code, phone, created_at
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_user).transpose()
}

/// Does `id` exist with the expected role? Used to resolve patient/doctor
/// references before writing records that point at them.
pub async fn has_role(pool: &PgPool, id: Uuid, role: Role) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM users WHERE id = $1 AND role = $2")
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Users visible to the caller. `None` tenant (superAdmin) sees everyone;
/// a companyAdmin sees themselves plus the accounts they own.
pub async fn list_visible(
    pool: &PgPool,
    tenant: Option<Uuid>,
    role: Option<Role>,
) -> Result<Vec<User>> {
    let rows = match tenant {
        None => {
            sqlx::query(
                "SELECT id, email, name, role, created_by, registration_no, patient_code, phone, created_at
                 FROM users
                 WHERE ($1::TEXT IS NULL OR role = $1)
                 ORDER BY created_at DESC",
            )
            .bind(role.map(|r| r.as_str()))
            .fetch_all(pool)
            .await?
        }
        Some(owner) => {
            sqlx::query(
                "SELECT id, email, name, role, created_by, registration_no, patient_code, phone, created_at
                 FROM users
                 WHERE (created_by = $1 OR id = $1)
                   AND ($2::TEXT IS NULL OR role = $2)
                 ORDER BY created_at DESC",
            )
            .bind(owner)
            .bind(role.map(|r| r.as_str()))
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(map_user).collect()
}

pub async fn set_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expires: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE users
         SET reset_token = $2, reset_token_expires = $3, updated_at = now()
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(token)
    .bind(expires)
    .execute(pool)
    .await?;
    Ok(())
}

/// Swap the password for a live reset token and clear the token. Returns
/// false when the token is unknown or expired.
pub async fn consume_reset_token(
    pool: &PgPool,
    token: &str,
    new_password_hash: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users
         SET password_hash = $2,
             reset_token = NULL,
             reset_token_expires = NULL,
             updated_at = now()
         WHERE reset_token = $1 AND reset_token_expires > now()",
    )
    .bind(token)
    .bind(new_password_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
