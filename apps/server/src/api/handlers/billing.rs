//! Billing endpoints: bill creation, item append, payments, reads.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use ward_billing::{LineItem, PaymentMethod};

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db::{self, billing::BillFilter},
    state::AppState,
    Error, Result,
};

const BILLING_ROLES: [Role; 2] = [Role::Accountant, Role::CompanyAdmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/billing", post(create).get(list))
        .route("/billing/recent", get(recent))
        .route("/billing/stats", get(stats))
        .route("/billing/:bill_no", get(read).delete(remove))
        .route("/billing/:bill_no/items", post(add_item))
        .route("/billing/:bill_no/payments", post(record_payment))
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LineItemRequest {
    #[validate(length(min = 1))]
    service: String,
    description: Option<String>,
    qty: i32,
    unit_price: Decimal,
}

impl From<LineItemRequest> for LineItem {
    fn from(req: LineItemRequest) -> Self {
        LineItem {
            service: req.service,
            description: req.description,
            qty: req.qty,
            unit_price: req.unit_price,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateBillRequest {
    patient_id: Uuid,
    doctor_id: Uuid,
    #[validate(nested)]
    items: Vec<LineItemRequest>,
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<CreateBillRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let items: Vec<LineItem> = payload.items.into_iter().map(Into::into).collect();
    let bill = db::billing::create(
        &state.db,
        principal.user_id,
        payload.patient_id,
        payload.doctor_id,
        &items,
    )
    .await?;

    tracing::info!(bill_no = %bill.bill.bill_no, amount = %bill.bill.amount, "Bill created");
    Ok((StatusCode::CREATED, Json(bill)))
}

async fn add_item(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(bill_no): Path<String>,
    Json(payload): Json<LineItemRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let bill = db::billing::add_item(&state.db, &bill_no, &payload.into()).await?;
    Ok(Json(bill))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PaymentRequest {
    method: PaymentMethod,
    amount: Decimal,
    reference: Option<String>,
}

async fn record_payment(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(bill_no): Path<String>,
    Json(payload): Json<PaymentRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;

    let bill = db::billing::record_payment(
        &state.db,
        &bill_no,
        payload.method,
        payload.amount,
        payload.reference.as_deref(),
    )
    .await?;

    tracing::info!(
        bill_no = %bill_no,
        outstanding = %bill.bill.due_balance,
        status = ?bill.bill.status,
        "Payment recorded"
    );
    Ok(Json(bill))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

async fn list(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;

    let status = query
        .status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(Error::Validation)?;

    let bills = db::billing::list(
        &state.db,
        &BillFilter {
            status,
            from: query.from,
            to: query.to,
        },
    )
    .await?;

    Ok(Json(bills))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

async fn recent(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<RecentQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;

    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let bills = db::billing::recent(&state.db, limit).await?;
    Ok(Json(bills))
}

async fn stats(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;

    let stats = db::billing::stats(&state.db).await?;
    Ok(Json(stats))
}

async fn read(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(bill_no): Path<String>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;

    let bill = db::billing::get(&state.db, &bill_no)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Bill {bill_no}")))?;
    Ok(Json(bill))
}

async fn remove(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(bill_no): Path<String>,
) -> Result<impl IntoResponse> {
    principal.require(&BILLING_ROLES)?;

    if !db::billing::delete(&state.db, &bill_no).await? {
        return Err(Error::NotFound(format!("Bill {bill_no}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
