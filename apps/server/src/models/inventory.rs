//! Stock items, stock-out consumption records, and drugs.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub id: Uuid,
    pub stock_no: String,
    pub category: String,
    pub item_name: String,
    /// "product" or "service".
    pub stock_type: String,
    /// Quantity currently on hand; never negative.
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_purchase_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub supplier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A consumption event. `quantity_before`/`quantity_after` snapshot the item
/// state inside the transaction that recorded the event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOut {
    pub id: Uuid,
    pub stock_out_no: String,
    pub stock_item_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub quantity_before: i32,
    pub quantity_after: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub manufacturer: String,
    pub quantity: i32,
    pub price: Decimal,
    pub expiry: NaiveDate,
    pub created_at: DateTime<Utc>,
}
