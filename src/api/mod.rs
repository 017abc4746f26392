//! API Gateway
//! Mission: Route `/api/v1` requests through the middleware chain to handlers

pub mod docs;

use crate::appointments::api as appointments_api;
use crate::auth::{api as auth_api, auth_middleware, require_admin};
use crate::error::{ApiError, ApiResult};
use crate::hospitals::api as hospitals_api;
use crate::middleware::{
    rate_limit_middleware, request_logging, sanitize_request, security_headers, RateLimitLayer,
};
use crate::state::AppState;
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

/// Build the full application router.
///
/// Requests pass, outermost first: logging, CORS, security headers,
/// rate limiting, sanitization, then the per-route auth guards.
pub fn create_router(state: AppState, limiter: RateLimitLayer) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.jwt_handler.clone(), auth_middleware);

    let public_hospitals = Router::new()
        .route("/hospitals", get(hospitals_api::get_hospitals))
        .route("/hospitals/vacCenters", get(hospitals_api::get_vac_centers))
        .route("/hospitals/:id", get(hospitals_api::get_hospital));

    // route_layer order: auth runs first, then the admin check
    let admin_hospitals = Router::new()
        .route("/hospitals", post(hospitals_api::create_hospital))
        .route(
            "/hospitals/:id",
            axum::routing::put(hospitals_api::update_hospital)
                .delete(hospitals_api::delete_hospital),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(auth_layer.clone());

    let appointments = Router::new()
        .route(
            "/hospitals/:id/appointments",
            get(appointments_api::get_hospital_appointments)
                .post(appointments_api::add_hospital_appointment),
        )
        .route(
            "/appointments",
            get(appointments_api::get_appointments).post(appointments_api::add_appointment),
        )
        .route(
            "/appointments/:id",
            get(appointments_api::get_appointment)
                .put(appointments_api::update_appointment)
                .delete(appointments_api::delete_appointment),
        )
        .route_layer(auth_layer.clone());

    let public_auth = Router::new()
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login))
        .route("/auth/logout", get(auth_api::logout));

    let protected_auth = Router::new()
        .route("/auth/me", get(auth_api::get_me))
        .route_layer(auth_layer);

    let api = Router::new()
        .merge(public_hospitals)
        .merge(admin_hospitals)
        .merge(appointments)
        .merge(public_auth)
        .merge(protected_auth);

    Router::new()
        .route("/health", get(health_check))
        .route("/api-docs", get(docs::api_docs))
        .nest("/api/v1", api)
        .fallback(route_not_found)
        .with_state(state)
        .layer(middleware::from_fn(sanitize_request))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_logging))
}

// ===== Response Envelopes =====

/// `{ success: true, data }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ success: true, count, data: [...] }`
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Parse a path or body id. Malformed ids can't match any record, so they
/// report the same way a missing record does.
pub fn parse_id(raw: &str, kind: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::not_found(format!("No {} with the id of {}", kind, raw)))
}

// ===== Route Handlers =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_counts() {
        let response = ListResponse::new(vec![1, 2, 3]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 3);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "hospital").unwrap(), id);
        assert!(matches!(
            parse_id("609bda561452242d88d36e37", "hospital"),
            Err(ApiError::NotFound(m)) if m == "No hospital with the id of 609bda561452242d88d36e37"
        ));
    }
}
