//! Financial and operational report queries.
//!
//! Revenue figures count only bills whose status is `Paid`; outstanding
//! balances never appear in commission or trend numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use ward_billing::{monthly_buckets, CommissionSplit, MonthlyRevenue};

use crate::Result;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorCommission {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub bill_count: i64,
    #[serde(flatten)]
    pub split: CommissionSplit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRevenue {
    pub service: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub patients: i64,
    pub doctors: i64,
    pub appointments: i64,
    pub bills: i64,
    pub total_revenue: Decimal,
    pub outstanding: Decimal,
}

/// Per-doctor 70/30 split over paid bills, highest earner first.
pub async fn doctor_commissions(pool: &PgPool) -> Result<Vec<DoctorCommission>> {
    let rows = sqlx::query(
        "SELECT b.doctor_id, d.name AS doctor_name, COUNT(*) AS bill_count,
                SUM(b.amount) AS total
         FROM bills b
         JOIN users d ON d.id = b.doctor_id
         WHERE b.status = 'Paid'
         GROUP BY b.doctor_id, d.name
         ORDER BY total DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let total: Decimal = row.get("total");
            DoctorCommission {
                doctor_id: row.get("doctor_id"),
                doctor_name: row.get("doctor_name"),
                bill_count: row.get("bill_count"),
                split: CommissionSplit::of(total),
            }
        })
        .collect())
}

/// Paid revenue grouped by billed service name.
pub async fn revenue_by_department(pool: &PgPool) -> Result<Vec<DepartmentRevenue>> {
    let rows = sqlx::query(
        "SELECT i.service, SUM(i.qty * i.unit_price) AS total
         FROM bill_items i
         JOIN bills b ON b.id = i.bill_id
         WHERE b.status = 'Paid'
         GROUP BY i.service
         ORDER BY total DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DepartmentRevenue {
            service: row.get("service"),
            total: row.get("total"),
        })
        .collect())
}

/// Paid revenue bucketed by calendar month of `year`.
pub async fn revenue_per_month(pool: &PgPool, year: i32) -> Result<Vec<MonthlyRevenue>> {
    let rows = sqlx::query(
        "SELECT created_at, amount FROM bills
         WHERE status = 'Paid' AND EXTRACT(YEAR FROM created_at) = $1",
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    let entries = rows.iter().map(|row| {
        let at: DateTime<Utc> = row.get("created_at");
        let amount: Decimal = row.get("amount");
        (at, amount)
    });

    Ok(monthly_buckets(year, entries))
}

/// Headline counts for the dashboard.
pub async fn summary(pool: &PgPool) -> Result<Summary> {
    let row = sqlx::query(
        "SELECT (SELECT COUNT(*) FROM users WHERE role = 'patient') AS patients,
                (SELECT COUNT(*) FROM users WHERE role = 'doctor') AS doctors,
                (SELECT COUNT(*) FROM appointments) AS appointments,
                (SELECT COUNT(*) FROM bills) AS bills,
                COALESCE((SELECT SUM(amount) FROM bills WHERE status = 'Paid'), 0) AS total_revenue,
                COALESCE((SELECT SUM(b.amount) FROM bills b WHERE b.status = 'Unpaid'), 0)
                  - COALESCE((SELECT SUM(p.amount) FROM bill_payments p
                              JOIN bills b ON b.id = p.bill_id
                              WHERE b.status = 'Unpaid'), 0) AS outstanding",
    )
    .fetch_one(pool)
    .await?;

    Ok(Summary {
        patients: row.get("patients"),
        doctors: row.get("doctors"),
        appointments: row.get("appointments"),
        bills: row.get("bills"),
        total_revenue: row.get("total_revenue"),
        outstanding: row.get("outstanding"),
    })
}
