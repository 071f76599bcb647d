//! Inventory endpoints: stock items, stock-outs, drugs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db::{
        self,
        inventory::{NewDrug, NewStockItem, StockItemUpdate},
    },
    state::AppState,
    Error, Result,
};

const INVENTORY_ROLES: [Role; 2] = [Role::CompanyAdmin, Role::Accountant];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stock-items", post(create_item).get(list_items))
        .route(
            "/stock-items/:id",
            get(read_item).put(update_item).delete(remove_item),
        )
        .route("/stock-outs", post(create_stock_out).get(list_stock_outs))
        .route("/stock-outs/consumption", get(consumption))
        .route("/stock-outs/:id", get(read_stock_out))
        .route("/drugs", post(create_drug).get(list_drugs))
        .route("/drugs/:id", axum::routing::put(update_drug).delete(remove_drug))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct StockItemRequest {
    #[validate(length(min = 1))]
    category: String,
    #[validate(length(min = 1))]
    item_name: String,
    /// "product" or "service".
    #[validate(length(min = 1))]
    stock_type: String,
    quantity: i32,
    unit_price: Decimal,
    expiry_date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    supplier: String,
    description: Option<String>,
    clinic_id: Option<Uuid>,
}

async fn create_item(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<StockItemRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let item = db::inventory::create_stock_item(
        &state.db,
        principal.user_id,
        NewStockItem {
            category: &payload.category,
            item_name: &payload.item_name,
            stock_type: &payload.stock_type,
            quantity: payload.quantity,
            unit_price: payload.unit_price,
            expiry_date: payload.expiry_date,
            supplier: &payload.supplier,
            description: payload.description.as_deref(),
            clinic_id: payload.clinic_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

async fn list_items(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    Ok(Json(db::inventory::list_stock_items(&state.db).await?))
}

async fn read_item(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;

    let item = db::inventory::get_stock_item(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Stock item {id}")))?;
    Ok(Json(item))
}

async fn update_item(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockItemRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let item = db::inventory::update_stock_item(
        &state.db,
        id,
        StockItemUpdate {
            category: &payload.category,
            item_name: &payload.item_name,
            quantity: payload.quantity,
            unit_price: payload.unit_price,
            expiry_date: payload.expiry_date,
            supplier: &payload.supplier,
            description: payload.description.as_deref(),
        },
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Stock item {id}")))?;

    Ok(Json(item))
}

async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;

    if !db::inventory::delete_stock_item(&state.db, id).await? {
        return Err(Error::NotFound(format!("Stock item {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct StockOutRequest {
    stock_item_id: Uuid,
    #[validate(range(min = 1))]
    quantity: i32,
    description: Option<String>,
}

/// Consume stock. The decrement and the consumption record commit together;
/// overdrawing the on-hand quantity is rejected with no partial write.
async fn create_stock_out(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<StockOutRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let stock_out = db::inventory::create_stock_out(
        &state.db,
        principal.user_id,
        payload.stock_item_id,
        payload.quantity,
        payload.description.as_deref(),
    )
    .await?;

    tracing::info!(
        stock_out_no = %stock_out.stock_out_no,
        item = %stock_out.item_name,
        remaining = stock_out.quantity_after,
        "Stock consumed"
    );
    Ok((StatusCode::CREATED, Json(stock_out)))
}

async fn list_stock_outs(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    Ok(Json(db::inventory::list_stock_outs(&state.db).await?))
}

async fn read_stock_out(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;

    let stock_out = db::inventory::get_stock_out(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Stock out {id}")))?;
    Ok(Json(stock_out))
}

async fn consumption(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    Ok(Json(db::inventory::consumption_summary(&state.db).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct DrugRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    category: String,
    #[validate(length(min = 1))]
    manufacturer: String,
    #[validate(range(min = 0))]
    quantity: i32,
    price: Decimal,
    expiry: NaiveDate,
}

async fn create_drug(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<DrugRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let drug = db::inventory::create_drug(
        &state.db,
        NewDrug {
            name: &payload.name,
            category: &payload.category,
            manufacturer: &payload.manufacturer,
            quantity: payload.quantity,
            price: payload.price,
            expiry: payload.expiry,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(drug)))
}

async fn list_drugs(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    Ok(Json(db::inventory::list_drugs(&state.db).await?))
}

async fn update_drug(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<DrugRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let drug = db::inventory::update_drug(
        &state.db,
        id,
        NewDrug {
            name: &payload.name,
            category: &payload.category,
            manufacturer: &payload.manufacturer,
            quantity: payload.quantity,
            price: payload.price,
            expiry: payload.expiry,
        },
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Drug {id}")))?;

    Ok(Json(drug))
}

async fn remove_drug(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&INVENTORY_ROLES)?;

    if !db::inventory::delete_drug(&state.db, id).await? {
        return Err(Error::NotFound(format!("Drug {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
