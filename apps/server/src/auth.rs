//! Authentication / authorization primitives.
//!
//! The server issues its own HS256 bearer tokens at login. Middleware
//! validates the token on protected routes and attaches a [`Principal`] to
//! the request; handlers authorize with per-route role allow-lists and the
//! `created_by` ownership chain (superAdmin owns companyAdmins, a
//! companyAdmin owns the employees and patients they provision).

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AuthConfig, state::AppState, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "superAdmin")]
    SuperAdmin,
    #[serde(rename = "companyAdmin")]
    CompanyAdmin,
    #[serde(rename = "doctor")]
    Doctor,
    #[serde(rename = "patient")]
    Patient,
    #[serde(rename = "labTechnician")]
    LabTechnician,
    #[serde(rename = "accountant")]
    Accountant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "superAdmin",
            Self::CompanyAdmin => "companyAdmin",
            Self::Doctor => "doctor",
            Self::Patient => "patient",
            Self::LabTechnician => "labTechnician",
            Self::Accountant => "accountant",
        }
    }

    /// Roles a companyAdmin is allowed to provision.
    pub const PROVISIONABLE: [Role; 4] = [
        Role::Doctor,
        Role::LabTechnician,
        Role::Patient,
        Role::Accountant,
    ];
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "superAdmin" => Ok(Self::SuperAdmin),
            "companyAdmin" => Ok(Self::CompanyAdmin),
            "doctor" => Ok(Self::Doctor),
            "patient" => Ok(Self::Patient),
            "labTechnician" => Ok(Self::LabTechnician),
            "accountant" => Ok(Self::Accountant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    /// `created_by` owner carried in the token so tenant scoping does not
    /// need a user lookup on every request.
    pub owner: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies the server's own bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_hours: config.token_ttl_hours,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role, owner: Option<Uuid>) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            owner,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.ttl_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Unauthorized(format!("Invalid bearer token: {e}")))
    }
}

/// The authenticated caller, attached to the request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub owner: Option<Uuid>,
}

impl Principal {
    /// Per-route role allow-list check.
    pub fn require(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden("Access denied".to_string()))
        }
    }

    /// The companyAdmin id this caller's records belong to. `None` means the
    /// caller is the superAdmin and sees everything.
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self.role {
            Role::SuperAdmin => None,
            Role::CompanyAdmin => Some(self.user_id),
            _ => self.owner,
        }
    }
}

/// Extractor for the principal attached by middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedPrincipal)
            .ok_or_else(|| {
                Error::Unauthorized("Missing bearer token".to_string()).into_response()
            })
    }
}

/// Middleware for protected routes: validates the bearer token and attaches
/// the [`Principal`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: Next,
) -> Response {
    let token = match bearer_token(req.headers()) {
        Some(token) => token,
        None => {
            return Error::Unauthorized("Missing bearer token".to_string()).into_response();
        }
    };

    match state.tokens.verify(token) {
        Ok(claims) => {
            req.extensions_mut().insert(Principal {
                user_id: claims.sub,
                role: claims.role,
                owner: claims.owner,
            });
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_service(ttl_hours: i64) -> TokenService {
        TokenService::new(&crate::config::AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            token_ttl_hours: ttl_hours,
            bcrypt_cost: 4,
            reset_token_ttl_minutes: 60,
            reset_url_base: "http://localhost/reset".to_string(),
        })
    }

    #[test]
    fn issued_token_verifies_with_same_claims() {
        let tokens = token_service(24);
        let user_id = Uuid::new_v4();
        let owner = Some(Uuid::new_v4());

        let token = tokens.issue(user_id, Role::Doctor, owner).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.owner, owner);
    }

    #[test]
    fn expired_token_rejected() {
        let tokens = token_service(-2);
        let token = tokens.issue(Uuid::new_v4(), Role::Patient, None).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        let tokens = token_service(24);
        assert!(tokens.verify("not.a.token").is_err());
    }

    #[test]
    fn role_round_trips_through_wire_names() {
        for role in [
            Role::SuperAdmin,
            Role::CompanyAdmin,
            Role::Doctor,
            Role::Patient,
            Role::LabTechnician,
            Role::Accountant,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn require_enforces_allow_list() {
        let principal = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Accountant,
            owner: Some(Uuid::new_v4()),
        };

        assert!(principal
            .require(&[Role::Accountant, Role::CompanyAdmin])
            .is_ok());
        assert!(principal.require(&[Role::Doctor]).is_err());
    }

    #[test]
    fn tenant_id_follows_ownership_chain() {
        let admin_id = Uuid::new_v4();

        let super_admin = Principal {
            user_id: Uuid::new_v4(),
            role: Role::SuperAdmin,
            owner: None,
        };
        assert_eq!(super_admin.tenant_id(), None);

        let company_admin = Principal {
            user_id: admin_id,
            role: Role::CompanyAdmin,
            owner: None,
        };
        assert_eq!(company_admin.tenant_id(), Some(admin_id));

        let doctor = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Doctor,
            owner: Some(admin_id),
        };
        assert_eq!(doctor.tenant_id(), Some(admin_id));
    }
}
