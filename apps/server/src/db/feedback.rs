//! Feedback/issue tickets.
//!
//! Issues carry the tenant owner they were filed under, so the companyAdmin
//! list query is a plain index lookup. The reporter display string is
//! resolved from the users table at read time, never stored.

use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{
    models::{Issue, IssueStatus, ReporterType},
    Error, Result,
};

const ISSUE_SELECT: &str = "SELECT i.id, i.title, i.description, i.status, i.solution,
            i.reported_by, u.role || ' - ' || u.name AS reporter, i.reporter_type,
            i.owner_id, i.created_at
     FROM issues i
     JOIN users u ON u.id = i.reported_by";

fn map_issue(row: &PgRow) -> Result<Issue> {
    let status: String = row.get("status");
    let reporter_type: String = row.get("reporter_type");

    Ok(Issue {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status: status.parse().map_err(Error::Internal)?,
        solution: row.get("solution"),
        reported_by: row.get("reported_by"),
        reporter: row.get("reporter"),
        reporter_type: reporter_type.parse().map_err(Error::Internal)?,
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
    })
}

pub async fn create(
    pool: &PgPool,
    reported_by: Uuid,
    reporter_type: ReporterType,
    owner_id: Uuid,
    title: &str,
    description: &str,
) -> Result<Issue> {
    let query = format!(
        "WITH inserted AS (
            INSERT INTO issues (title, description, reported_by, reporter_type, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
         )
         {}",
        ISSUE_SELECT.replace("FROM issues i", "FROM inserted i")
    );
    let row = sqlx::query(&query)
        .bind(title)
        .bind(description)
        .bind(reported_by)
        .bind(reporter_type.as_str())
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    map_issue(&row)
}

/// Issues in the given tenant, newest first.
pub async fn list_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Issue>> {
    let query = format!("{ISSUE_SELECT} WHERE i.owner_id = $1 ORDER BY i.created_at DESC");
    let rows = sqlx::query(&query).bind(owner_id).fetch_all(pool).await?;
    rows.iter().map(map_issue).collect()
}

/// Issues filed by the given user, newest first.
pub async fn list_for_reporter(pool: &PgPool, reported_by: Uuid) -> Result<Vec<Issue>> {
    let query = format!("{ISSUE_SELECT} WHERE i.reported_by = $1 ORDER BY i.created_at DESC");
    let rows = sqlx::query(&query)
        .bind(reported_by)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_issue).collect()
}

/// Mark an issue resolved (or reopen it) within the caller's tenant.
pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    status: IssueStatus,
    solution: Option<&str>,
) -> Result<Option<Issue>> {
    let updated = sqlx::query(
        "UPDATE issues SET status = $3, solution = $4, updated_at = now()
         WHERE id = $1 AND owner_id = $2",
    )
    .bind(id)
    .bind(owner_id)
    .bind(status.as_str())
    .bind(solution)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    let query = format!("{ISSUE_SELECT} WHERE i.id = $1");
    let row = sqlx::query(&query).bind(id).fetch_one(pool).await?;
    map_issue(&row).map(Some)
}
