//! API layer - routes, handlers, and middleware

pub mod handlers;
pub mod middleware;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();
    let auth_state = state.clone();

    // Public login/registration plus the provisioning endpoints, which
    // carry the bearer-token middleware individually.
    let auth_routes = handlers::auth::routes().merge(
        handlers::auth::protected_routes().layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::auth_middleware,
        )),
    );

    // Everything else sits behind the bearer-token middleware.
    let protected = Router::new()
        .merge(handlers::users::routes())
        .merge(handlers::clinics::routes())
        .merge(handlers::appointments::routes())
        .merge(handlers::billing::routes())
        .merge(handlers::inventory::routes())
        .merge(handlers::clinical::routes())
        .merge(handlers::feedback::routes())
        .merge(handlers::reports::routes())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            crate::auth::auth_middleware,
        ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Root endpoint
        .route("/", get(root))
        // Favicon handler (returns 204 to prevent 404 logs)
        .route("/favicon.ico", get(favicon))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        // Add state
        .with_state(state)
        // Add middleware (applied in reverse order)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        // Limit request body size to prevent DoS via large payloads
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "ward-server"
    }))
}

async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "server": "Ward Clinic Backend",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running"
        })),
    )
}

async fn favicon() -> impl IntoResponse {
    // Return 204 No Content to indicate no favicon is available
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenService;
    use crate::config::{
        AuthConfig, Config, DatabaseConfig, LoggingConfig, MailConfig, ServerConfig,
    };
    use crate::services::mail::NoopMailer;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    // A lazy pool never connects until a query runs, so routing and the
    // auth middleware can be exercised without a database.
    fn test_state() -> AppState {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                cors_origins: vec![],
                max_request_body_size: 1024 * 1024,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/ward".to_string(),
                max_connections: 1,
                acquire_timeout_seconds: 1,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_ttl_hours: 24,
                bcrypt_cost: 4,
                reset_token_ttl_minutes: 60,
                reset_url_base: "http://localhost:5173/reset-password".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
                file_enabled: false,
                file_directory: "logs".to_string(),
                file_prefix: "ward".to_string(),
                file_rotation: "daily".to_string(),
            },
            mail: MailConfig {
                enabled: false,
                relay_url: None,
                from: "no-reply@ward.local".to_string(),
            },
        };
        let db = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database.url)
            .unwrap();
        AppState {
            tokens: TokenService::new(&config.auth),
            db,
            mailer: Arc::new(NoopMailer),
            config: Arc::new(config),
        }
    }

    async fn status_for(method: Method, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        create_router(test_state())
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_endpoint_is_public() {
        assert_eq!(status_for(Method::GET, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        assert_eq!(
            status_for(Method::GET, "/nope").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn record_routes_require_a_bearer_token() {
        let id = "00000000-0000-0000-0000-000000000000";
        for (method, uri) in [
            (Method::GET, format!("/api/stock-outs/{id}")),
            (Method::GET, format!("/api/vaccination-doses/{id}")),
            (Method::PUT, format!("/api/consultations/{id}")),
            (Method::PUT, format!("/api/prescriptions/{id}")),
            (Method::GET, "/api/billing".to_string()),
        ] {
            assert_eq!(
                status_for(method.clone(), &uri).await,
                StatusCode::UNAUTHORIZED,
                "{method} {uri}"
            );
        }
    }
}
