//! Billing ledger repository.
//!
//! Every mutation recomputes the bill's stored totals from its line items
//! and payments inside the same transaction, via `ward_billing::reconcile`,
//! so the `amount == Σ(qty × price)` and derived-status invariants cannot
//! drift. There is no direct status write path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;
use ward_billing::{
    outstanding, reconcile, validate_items, validate_payment_amount, LineItem, Payment,
    PaymentMethod,
};

use super::sequences::{self, Sequence};
use super::users;
use crate::{
    auth::Role,
    models::{Bill, BillDetail, BillItem, BillPayment},
    Error, Result,
};

const BILL_SELECT: &str = "SELECT b.id, b.bill_no, b.patient_id, p.name AS patient_name,
            b.doctor_id, d.name AS doctor_name, b.amount, b.status, b.created_at,
            COALESCE((SELECT SUM(amount) FROM bill_payments WHERE bill_id = b.id), 0) AS total_paid
     FROM bills b
     JOIN users p ON p.id = b.patient_id
     JOIN users d ON d.id = b.doctor_id";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStats {
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub total_due: Decimal,
    pub paid_count: i64,
    pub unpaid_count: i64,
}

#[derive(Debug, Default)]
pub struct BillFilter {
    pub status: Option<ward_billing::PaymentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn map_bill(row: &PgRow) -> Result<Bill> {
    let status: String = row.get("status");
    let amount: Decimal = row.get("amount");
    let total_paid: Decimal = row.get("total_paid");

    Ok(Bill {
        id: row.get("id"),
        bill_no: row.get("bill_no"),
        patient_id: row.get("patient_id"),
        patient_name: row.get("patient_name"),
        doctor_id: row.get("doctor_id"),
        doctor_name: row.get("doctor_name"),
        amount,
        total_paid,
        due_balance: outstanding(amount, total_paid),
        status: status.parse().map_err(Error::Internal)?,
        created_at: row.get("created_at"),
    })
}

fn map_item(row: &PgRow) -> BillItem {
    let qty: i32 = row.get("qty");
    let unit_price: Decimal = row.get("unit_price");
    BillItem {
        id: row.get("id"),
        service: row.get("service"),
        description: row.get("description"),
        qty,
        unit_price,
        subtotal: unit_price * Decimal::from(qty),
    }
}

fn map_payment(row: &PgRow) -> Result<BillPayment> {
    let method: String = row.get("method");
    Ok(BillPayment {
        id: row.get("id"),
        method: method.parse().map_err(Error::Internal)?,
        amount: row.get("amount"),
        reference: row.get("reference"),
        paid_at: row.get("paid_at"),
    })
}

/// Create a bill with its initial line items. The patient and doctor
/// references must resolve to users with those roles.
pub async fn create(
    pool: &PgPool,
    created_by: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    items: &[LineItem],
) -> Result<BillDetail> {
    validate_items(items)?;

    if !users::has_role(pool, patient_id, Role::Patient).await? {
        return Err(Error::NotFound(format!("Patient {patient_id}")));
    }
    if !users::has_role(pool, doctor_id, Role::Doctor).await? {
        return Err(Error::NotFound(format!("Doctor {doctor_id}")));
    }

    let totals = reconcile(items, &[])?;

    let mut tx = pool.begin().await?;

    let bill_no = sequences::next_code(&mut *tx, Sequence::Bill).await?;

    let bill_id: Uuid = sqlx::query(
        "INSERT INTO bills (bill_no, patient_id, doctor_id, amount, status, created_by)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(&bill_no)
    .bind(patient_id)
    .bind(doctor_id)
    .bind(totals.amount)
    .bind(totals.status.as_str())
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO bill_items (bill_id, position, service, description, qty, unit_price)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(bill_id)
        .bind(position as i32 + 1)
        .bind(&item.service)
        .bind(&item.description)
        .bind(item.qty)
        .bind(item.unit_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    get(pool, &bill_no)
        .await?
        .ok_or_else(|| Error::Internal(format!("Bill {bill_no} vanished after create")))
}

/// Append a line item and recompute totals in one transaction.
pub async fn add_item(pool: &PgPool, bill_no: &str, item: &LineItem) -> Result<BillDetail> {
    validate_items(std::slice::from_ref(item))?;

    let mut tx = pool.begin().await?;
    let bill_id = lock_bill(&mut tx, bill_no).await?;

    sqlx::query(
        "INSERT INTO bill_items (bill_id, position, service, description, qty, unit_price)
         SELECT $1, COALESCE(MAX(position), 0) + 1, $2, $3, $4, $5
         FROM bill_items WHERE bill_id = $1",
    )
    .bind(bill_id)
    .bind(&item.service)
    .bind(&item.description)
    .bind(item.qty)
    .bind(item.unit_price)
    .execute(&mut *tx)
    .await?;

    recompute(&mut tx, bill_id).await?;
    tx.commit().await?;

    get(pool, bill_no)
        .await?
        .ok_or_else(|| Error::Internal(format!("Bill {bill_no} vanished after item append")))
}

/// Record a payment and rederive the bill's status in one transaction.
pub async fn record_payment(
    pool: &PgPool,
    bill_no: &str,
    method: PaymentMethod,
    amount: Decimal,
    reference: Option<&str>,
) -> Result<BillDetail> {
    validate_payment_amount(amount)?;

    let mut tx = pool.begin().await?;
    let bill_id = lock_bill(&mut tx, bill_no).await?;

    sqlx::query(
        "INSERT INTO bill_payments (bill_id, method, amount, reference)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(bill_id)
    .bind(method.as_str())
    .bind(amount)
    .bind(reference)
    .execute(&mut *tx)
    .await?;

    recompute(&mut tx, bill_id).await?;
    tx.commit().await?;

    get(pool, bill_no)
        .await?
        .ok_or_else(|| Error::Internal(format!("Bill {bill_no} vanished after payment")))
}

pub async fn get(pool: &PgPool, bill_no: &str) -> Result<Option<BillDetail>> {
    let query = format!("{BILL_SELECT} WHERE b.bill_no = $1");
    let Some(row) = sqlx::query(&query)
        .bind(bill_no)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let bill = map_bill(&row)?;

    let item_rows = sqlx::query(
        "SELECT id, service, description, qty, unit_price
         FROM bill_items WHERE bill_id = $1 ORDER BY position",
    )
    .bind(bill.id)
    .fetch_all(pool)
    .await?;

    let payment_rows = sqlx::query(
        "SELECT id, method, amount, reference, paid_at
         FROM bill_payments WHERE bill_id = $1 ORDER BY paid_at",
    )
    .bind(bill.id)
    .fetch_all(pool)
    .await?;

    Ok(Some(BillDetail {
        bill,
        items: item_rows.iter().map(map_item).collect(),
        payments: payment_rows
            .iter()
            .map(map_payment)
            .collect::<Result<_>>()?,
    }))
}

pub async fn list(pool: &PgPool, filter: &BillFilter) -> Result<Vec<Bill>> {
    let query = format!(
        "{BILL_SELECT}
         WHERE ($1::TEXT IS NULL OR b.status = $1)
           AND ($2::TIMESTAMPTZ IS NULL OR b.created_at >= $2)
           AND ($3::TIMESTAMPTZ IS NULL OR b.created_at <= $3)
         ORDER BY b.created_at DESC"
    );

    let rows = sqlx::query(&query)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_bill).collect()
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<Bill>> {
    let query = format!("{BILL_SELECT} ORDER BY b.created_at DESC LIMIT $1");
    let rows = sqlx::query(&query).bind(limit).fetch_all(pool).await?;
    rows.iter().map(map_bill).collect()
}

pub async fn stats(pool: &PgPool) -> Result<BillingStats> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(b.amount), 0) AS total_billed,
                COALESCE((SELECT SUM(amount) FROM bill_payments), 0) AS total_paid,
                COUNT(*) FILTER (WHERE b.status = 'Paid') AS paid_count,
                COUNT(*) FILTER (WHERE b.status = 'Unpaid') AS unpaid_count
         FROM bills b",
    )
    .fetch_one(pool)
    .await?;

    let total_billed: Decimal = row.get("total_billed");
    let total_paid: Decimal = row.get("total_paid");

    Ok(BillingStats {
        total_billed,
        total_paid,
        total_due: outstanding(total_billed, total_paid),
        paid_count: row.get("paid_count"),
        unpaid_count: row.get("unpaid_count"),
    })
}

/// Explicit delete endpoint only; bills are never removed as a side effect.
pub async fn delete(pool: &PgPool, bill_no: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bills WHERE bill_no = $1")
        .bind(bill_no)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn lock_bill(tx: &mut Transaction<'_, Postgres>, bill_no: &str) -> Result<Uuid> {
    let row = sqlx::query("SELECT id FROM bills WHERE bill_no = $1 FOR UPDATE")
        .bind(bill_no)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Bill {bill_no}")))?;

    Ok(row.get("id"))
}

/// Rederive `amount` and `status` from the bill's current items and
/// payments. Must run inside the mutating transaction.
async fn recompute(tx: &mut Transaction<'_, Postgres>, bill_id: Uuid) -> Result<()> {
    let item_rows = sqlx::query(
        "SELECT service, description, qty, unit_price
         FROM bill_items WHERE bill_id = $1 ORDER BY position",
    )
    .bind(bill_id)
    .fetch_all(&mut **tx)
    .await?;

    let items: Vec<LineItem> = item_rows
        .iter()
        .map(|row| LineItem {
            service: row.get("service"),
            description: row.get("description"),
            qty: row.get("qty"),
            unit_price: row.get("unit_price"),
        })
        .collect();

    let payment_rows = sqlx::query(
        "SELECT method, amount, reference, paid_at
         FROM bill_payments WHERE bill_id = $1",
    )
    .bind(bill_id)
    .fetch_all(&mut **tx)
    .await?;

    let payments: Vec<Payment> = payment_rows
        .iter()
        .map(|row| -> Result<Payment> {
            let method: String = row.get("method");
            Ok(Payment {
                method: method.parse().map_err(Error::Internal)?,
                amount: row.get("amount"),
                reference: row.get("reference"),
                paid_at: row.get("paid_at"),
            })
        })
        .collect::<Result<_>>()?;

    let totals = reconcile(&items, &payments)?;

    sqlx::query("UPDATE bills SET amount = $2, status = $3, updated_at = now() WHERE id = $1")
        .bind(bill_id)
        .bind(totals.amount)
        .bind(totals.status.as_str())
        .execute(&mut **tx)
        .await?;

    Ok(())
}
