//! Bills, line items, and payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use ward_billing::{PaymentMethod, PaymentStatus};

/// Bill header as returned from list endpoints. Patient and doctor display
/// names are resolved at read time; only the references are stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub bill_no: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub amount: Decimal,
    pub total_paid: Decimal,
    pub due_balance: Decimal,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Full bill with line items and payment history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub items: Vec<BillItem>,
    pub payments: Vec<BillPayment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub id: Uuid,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub qty: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPayment {
    pub id: Uuid,
    pub method: PaymentMethod,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}
