//! Registration, login, user provisioning, and password reset.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    auth::{AuthenticatedPrincipal, Role},
    db,
    services::password,
    state::AppState,
    Error, Result,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Routes that need an authenticated caller; mounted behind the auth
/// middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/company-admins", post(create_company_admin))
        .route("/users", post(create_user))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    role: Role,
}

/// Bootstrap-only: the very first account self-registers as superAdmin.
/// Any later registration, or any other role, is rejected.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    if payload.role != Role::SuperAdmin {
        return Err(Error::Forbidden(
            "Only the superAdmin account can self-register".to_string(),
        ));
    }
    if db::users::role_exists(&state.db, Role::SuperAdmin).await? {
        return Err(Error::Conflict("A superAdmin already exists".to_string()));
    }
    if db::users::email_exists(&state.db, &payload.email).await? {
        return Err(Error::Conflict("Email is already registered".to_string()));
    }

    let hash = password::hash(&payload.password, state.config.auth.bcrypt_cost)?;
    let user = db::users::create(
        &state.db,
        db::users::NewUser {
            email: &payload.email,
            name: &payload.name,
            password_hash: &hash,
            role: Role::SuperAdmin,
            created_by: None,
            registration_no: None,
            phone: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "superAdmin registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[validate(email)]
    email: String,
    role: Role,
    #[validate(length(min = 1))]
    password: String,
}

/// Email + role + password. A wrong email, role, or password all produce the
/// same message so credentials cannot be probed piecemeal.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let invalid = || Error::Validation("Invalid email, role, or password".to_string());

    let user = db::users::find_for_login(&state.db, &payload.email, payload.role)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id, user.role, user.created_by)?;
    let profile = db::users::get(&state.db, user.id)
        .await?
        .ok_or_else(|| Error::Internal(format!("User {} vanished after login", user.id)))?;

    tracing::info!(user_id = %user.id, role = %user.role, "Login");
    Ok(Json(json!({ "token": token, "user": profile })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateCompanyAdminRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    phone: Option<String>,
}

async fn create_company_admin(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<CreateCompanyAdminRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&[Role::SuperAdmin])?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    if db::users::email_exists(&state.db, &payload.email).await? {
        return Err(Error::Conflict("Email is already registered".to_string()));
    }

    let hash = password::hash(&payload.password, state.config.auth.bcrypt_cost)?;
    let user = db::users::create(
        &state.db,
        db::users::NewUser {
            email: &payload.email,
            name: &payload.name,
            password_hash: &hash,
            role: Role::CompanyAdmin,
            created_by: Some(principal.user_id),
            registration_no: None,
            phone: payload.phone.as_deref(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    role: Role,
    /// Medical council registration, required when role is doctor.
    registration_no: Option<String>,
    phone: Option<String>,
}

/// A companyAdmin provisions the accounts under their tenant.
async fn create_user(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    principal.require(&[Role::CompanyAdmin])?;
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    if !Role::PROVISIONABLE.contains(&payload.role) {
        return Err(Error::Validation(format!(
            "Role {} cannot be provisioned here",
            payload.role
        )));
    }
    if payload.role == Role::Doctor && payload.registration_no.is_none() {
        return Err(Error::Validation(
            "registrationNo is required for doctors".to_string(),
        ));
    }
    if db::users::email_exists(&state.db, &payload.email).await? {
        return Err(Error::Conflict("Email is already registered".to_string()));
    }

    let hash = password::hash(&payload.password, state.config.auth.bcrypt_cost)?;
    let user = db::users::create(
        &state.db,
        db::users::NewUser {
            email: &payload.email,
            name: &payload.name,
            password_hash: &hash,
            role: payload.role,
            created_by: Some(principal.user_id),
            registration_no: payload.registration_no.as_deref(),
            phone: payload.phone.as_deref(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ForgotPasswordRequest {
    #[validate(email)]
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let user = db::users::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| Error::NotFound("No account for that email".to_string()))?;

    let token = password::reset_token();
    let expires = Utc::now() + Duration::minutes(state.config.auth.reset_token_ttl_minutes);
    db::users::set_reset_token(&state.db, user.id, &token, expires).await?;

    let link = format!("{}?token={token}", state.config.auth.reset_url_base);
    state
        .mailer
        .send(
            &user.email,
            "Password reset",
            &format!("Use this link to reset your password: {link}"),
        )
        .await?;

    Ok(Json(json!({ "message": "Password reset link sent" })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    token: String,
    #[validate(length(min = 8))]
    password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| Error::Validation(e.to_string()))?;

    let hash = password::hash(&payload.password, state.config.auth.bcrypt_cost)?;
    let consumed = db::users::consume_reset_token(&state.db, &payload.token, &hash).await?;
    if !consumed {
        return Err(Error::Validation(
            "Reset token is invalid or expired".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Password updated" })))
}
