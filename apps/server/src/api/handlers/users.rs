//! User directory queries.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db,
    state::AppState,
    Error, Result,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list))
        .route("/users/:id", get(read))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    role: Option<Role>,
}

/// Users visible to the caller through the ownership chain: superAdmin sees
/// everyone, a companyAdmin sees their own subtree.
async fn list(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    principal.require(&[Role::SuperAdmin, Role::CompanyAdmin])?;

    let users = db::users::list_visible(&state.db, principal.tenant_id(), query.role).await?;
    Ok(Json(users))
}

async fn read(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    principal.require(&[Role::SuperAdmin, Role::CompanyAdmin])?;

    let user = db::users::get(&state.db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {id}")))?;

    // A companyAdmin may only read accounts in their own subtree.
    if let Some(tenant) = principal.tenant_id() {
        if user.id != tenant && user.created_by != Some(tenant) {
            return Err(Error::Forbidden("Access denied".to_string()));
        }
    }

    Ok(Json(user))
}
