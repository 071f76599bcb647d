//! Inventory: stock items, stock-out consumption, drug catalog.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::sequences::{self, Sequence};
use crate::{
    models::{Drug, StockItem, StockOut},
    Error, Result,
};

pub struct NewStockItem<'a> {
    pub category: &'a str,
    pub item_name: &'a str,
    pub stock_type: &'a str,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: &'a str,
    pub description: Option<&'a str>,
    pub clinic_id: Option<Uuid>,
}

pub struct StockItemUpdate<'a> {
    pub category: &'a str,
    pub item_name: &'a str,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: &'a str,
    pub description: Option<&'a str>,
}

pub struct NewDrug<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub manufacturer: &'a str,
    pub quantity: i32,
    pub price: Decimal,
    pub expiry: NaiveDate,
}

/// Per-item consumption totals over the stock-out history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionRow {
    pub stock_item_id: Uuid,
    pub item_name: String,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

const STOCK_ITEM_COLUMNS: &str = "id, stock_no, category, item_name, stock_type, quantity,
     unit_price, total_purchase_price, expiry_date, supplier, description,
     clinic_id, created_by, created_at";

fn map_stock_item(row: &PgRow) -> StockItem {
    StockItem {
        id: row.get("id"),
        stock_no: row.get("stock_no"),
        category: row.get("category"),
        item_name: row.get("item_name"),
        stock_type: row.get("stock_type"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_purchase_price: row.get("total_purchase_price"),
        expiry_date: row.get("expiry_date"),
        supplier: row.get("supplier"),
        description: row.get("description"),
        clinic_id: row.get("clinic_id"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn map_stock_out(row: &PgRow) -> StockOut {
    StockOut {
        id: row.get("id"),
        stock_out_no: row.get("stock_out_no"),
        stock_item_id: row.get("stock_item_id"),
        item_name: row.get("item_name"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_price: row.get("total_price"),
        quantity_before: row.get("quantity_before"),
        quantity_after: row.get("quantity_after"),
        description: row.get("description"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn map_drug(row: &PgRow) -> Drug {
    Drug {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        manufacturer: row.get("manufacturer"),
        quantity: row.get("quantity"),
        price: row.get("price"),
        expiry: row.get("expiry"),
        created_at: row.get("created_at"),
    }
}

pub async fn create_stock_item(
    pool: &PgPool,
    created_by: Uuid,
    new: NewStockItem<'_>,
) -> Result<StockItem> {
    if new.quantity < 0 {
        return Err(Error::Validation("Quantity must not be negative".into()));
    }
    if new.unit_price < Decimal::ZERO {
        return Err(Error::Validation("Unit price must not be negative".into()));
    }

    let total_purchase_price = new.unit_price * Decimal::from(new.quantity);

    let mut tx = pool.begin().await?;
    let stock_no = sequences::next_code(&mut *tx, Sequence::StockItem).await?;

    let query = format!(
        "INSERT INTO stock_items (stock_no, category, item_name, stock_type, quantity,
                                  unit_price, total_purchase_price, expiry_date, supplier,
                                  description, clinic_id, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {STOCK_ITEM_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(&stock_no)
        .bind(new.category)
        .bind(new.item_name)
        .bind(new.stock_type)
        .bind(new.quantity)
        .bind(new.unit_price)
        .bind(total_purchase_price)
        .bind(new.expiry_date)
        .bind(new.supplier)
        .bind(new.description)
        .bind(new.clinic_id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

    let item = map_stock_item(&row);
    tx.commit().await?;
    Ok(item)
}

pub async fn get_stock_item(pool: &PgPool, id: Uuid) -> Result<Option<StockItem>> {
    let query = format!("SELECT {STOCK_ITEM_COLUMNS} FROM stock_items WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(map_stock_item))
}

pub async fn list_stock_items(pool: &PgPool) -> Result<Vec<StockItem>> {
    let query = format!("SELECT {STOCK_ITEM_COLUMNS} FROM stock_items ORDER BY created_at DESC");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows.iter().map(map_stock_item).collect())
}

pub async fn update_stock_item(
    pool: &PgPool,
    id: Uuid,
    update: StockItemUpdate<'_>,
) -> Result<Option<StockItem>> {
    if update.quantity < 0 {
        return Err(Error::Validation("Quantity must not be negative".into()));
    }

    let total_purchase_price = update.unit_price * Decimal::from(update.quantity);

    let query = format!(
        "UPDATE stock_items
         SET category = $2, item_name = $3, quantity = $4, unit_price = $5,
             total_purchase_price = $6, expiry_date = $7, supplier = $8,
             description = $9, updated_at = now()
         WHERE id = $1
         RETURNING {STOCK_ITEM_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(update.category)
        .bind(update.item_name)
        .bind(update.quantity)
        .bind(update.unit_price)
        .bind(total_purchase_price)
        .bind(update.expiry_date)
        .bind(update.supplier)
        .bind(update.description)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(map_stock_item))
}

pub async fn delete_stock_item(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM stock_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// A guarded decrement that found no row either hit a missing item or one
/// with too little on hand. Overdraw is a 400, a missing item a 404.
fn decrement_miss_error(item_exists: bool, stock_item_id: Uuid) -> Error {
    if item_exists {
        Error::Validation("Insufficient stock".into())
    } else {
        Error::NotFound(format!("Stock item {stock_item_id}"))
    }
}

/// Record a consumption event. The decrement and the stock-out insert commit
/// together; the `quantity >= $2` guard rejects overdraw even under
/// concurrent consumers.
pub async fn create_stock_out(
    pool: &PgPool,
    created_by: Uuid,
    stock_item_id: Uuid,
    quantity: i32,
    description: Option<&str>,
) -> Result<StockOut> {
    if quantity <= 0 {
        return Err(Error::Validation("Quantity must be positive".into()));
    }

    let mut tx = pool.begin().await?;

    let Some(item_row) = sqlx::query(
        "UPDATE stock_items
         SET quantity = quantity - $2, updated_at = now()
         WHERE id = $1 AND quantity >= $2
         RETURNING item_name, unit_price, quantity + $2 AS quantity_before, quantity AS quantity_after",
    )
    .bind(stock_item_id)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?
    else {
        // Distinguish a missing item from insufficient stock for the caller.
        let exists = sqlx::query("SELECT 1 FROM stock_items WHERE id = $1")
            .bind(stock_item_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        return Err(decrement_miss_error(exists, stock_item_id));
    };

    let item_name: String = item_row.get("item_name");
    let unit_price: Decimal = item_row.get("unit_price");
    let quantity_before: i32 = item_row.get("quantity_before");
    let quantity_after: i32 = item_row.get("quantity_after");
    let total_price = unit_price * Decimal::from(quantity);

    let stock_out_no = sequences::next_code(&mut *tx, Sequence::StockOut).await?;

    let row = sqlx::query(
        "INSERT INTO stock_outs (stock_out_no, stock_item_id, quantity, unit_price, total_price,
                                 quantity_before, quantity_after, description, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id, stock_out_no, stock_item_id, quantity, unit_price, total_price,
                   quantity_before, quantity_after, description, created_by, created_at",
    )
    .bind(&stock_out_no)
    .bind(stock_item_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(total_price)
    .bind(quantity_before)
    .bind(quantity_after)
    .bind(description)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(StockOut {
        id: row.get("id"),
        stock_out_no: row.get("stock_out_no"),
        stock_item_id: row.get("stock_item_id"),
        item_name,
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_price: row.get("total_price"),
        quantity_before: row.get("quantity_before"),
        quantity_after: row.get("quantity_after"),
        description: row.get("description"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    })
}

pub async fn get_stock_out(pool: &PgPool, id: Uuid) -> Result<Option<StockOut>> {
    let row = sqlx::query(
        "SELECT s.id, s.stock_out_no, s.stock_item_id, i.item_name, s.quantity,
                s.unit_price, s.total_price, s.quantity_before, s.quantity_after,
                s.description, s.created_by, s.created_at
         FROM stock_outs s
         JOIN stock_items i ON i.id = s.stock_item_id
         WHERE s.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_stock_out))
}

pub async fn list_stock_outs(pool: &PgPool) -> Result<Vec<StockOut>> {
    let rows = sqlx::query(
        "SELECT s.id, s.stock_out_no, s.stock_item_id, i.item_name, s.quantity,
                s.unit_price, s.total_price, s.quantity_before, s.quantity_after,
                s.description, s.created_by, s.created_at
         FROM stock_outs s
         JOIN stock_items i ON i.id = s.stock_item_id
         ORDER BY s.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_stock_out).collect())
}

/// Aggregate consumption per stock item, highest value first.
pub async fn consumption_summary(pool: &PgPool) -> Result<Vec<ConsumptionRow>> {
    let rows = sqlx::query(
        "SELECT s.stock_item_id, i.item_name,
                SUM(s.quantity)::BIGINT AS total_quantity,
                SUM(s.total_price) AS total_value
         FROM stock_outs s
         JOIN stock_items i ON i.id = s.stock_item_id
         GROUP BY s.stock_item_id, i.item_name
         ORDER BY total_value DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ConsumptionRow {
            stock_item_id: row.get("stock_item_id"),
            item_name: row.get("item_name"),
            total_quantity: row.get("total_quantity"),
            total_value: row.get("total_value"),
        })
        .collect())
}

pub async fn create_drug(pool: &PgPool, new: NewDrug<'_>) -> Result<Drug> {
    let row = sqlx::query(
        "INSERT INTO drugs (name, category, manufacturer, quantity, price, expiry)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, name, category, manufacturer, quantity, price, expiry, created_at",
    )
    .bind(new.name)
    .bind(new.category)
    .bind(new.manufacturer)
    .bind(new.quantity)
    .bind(new.price)
    .bind(new.expiry)
    .fetch_one(pool)
    .await?;

    Ok(map_drug(&row))
}

pub async fn list_drugs(pool: &PgPool) -> Result<Vec<Drug>> {
    let rows = sqlx::query(
        "SELECT id, name, category, manufacturer, quantity, price, expiry, created_at
         FROM drugs ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_drug).collect())
}

pub async fn update_drug(pool: &PgPool, id: Uuid, new: NewDrug<'_>) -> Result<Option<Drug>> {
    let row = sqlx::query(
        "UPDATE drugs
         SET name = $2, category = $3, manufacturer = $4, quantity = $5,
             price = $6, expiry = $7, updated_at = now()
         WHERE id = $1
         RETURNING id, name, category, manufacturer, quantity, price, expiry, created_at",
    )
    .bind(id)
    .bind(new.name)
    .bind(new.category)
    .bind(new.manufacturer)
    .bind(new.quantity)
    .bind(new.price)
    .bind(new.expiry)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_drug))
}

pub async fn delete_drug(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM drugs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn overdraw_rejects_with_bad_request() {
        let err = decrement_miss_error(true, Uuid::nil());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Insufficient stock"));
    }

    #[test]
    fn missing_item_rejects_with_not_found() {
        let err = decrement_miss_error(false, Uuid::nil());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
