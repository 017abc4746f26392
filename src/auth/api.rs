//! Authentication API Endpoints
//! Mission: Register, login, logout and current-user endpoints

use crate::auth::{
    middleware::{CurrentUser, TOKEN_COOKIE},
    models::{LoginRequest, RegisterRequest, TokenResponse, User, UserRole},
};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::CookieJar;
use cookie::Cookie;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::info;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles");
}

/// Register endpoint - POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = required(payload.name.as_deref(), "Please add a name")?;
    let email = required(payload.email.as_deref(), "Please add an email")?;
    let password = required_secret(payload.password.as_deref(), "Please add a password")?;

    if !EMAIL_RE.is_match(email) {
        return Err(ApiError::validation("Please add a valid email"));
    }

    let user = state
        .users
        .create_user(name, email, payload.tel.as_deref(), password, UserRole::User)
        .await?;

    info!("Registered user: {}", user.email);
    send_token_response(&state, jar, &user, StatusCode::OK)
}

/// Login endpoint - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = required(payload.email.as_deref(), "Please provide an email and password")?;
    let password = required_secret(
        payload.password.as_deref(),
        "Please provide an email and password",
    )?;

    let user = state.users.verify_credentials(email, password).await?;

    info!("Login successful: {} ({})", user.email, user.role.as_str());
    send_token_response(&state, jar, &user, StatusCode::OK)
}

/// Logout endpoint - GET /api/v1/auth/logout
/// Overwrites the session cookie with a short-lived placeholder.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build((TOKEN_COOKIE, "none"))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::seconds(10))
        .build();

    (
        jar.add(cookie),
        Json(json!({ "success": true, "data": {} })),
    )
}

/// Current user - GET /api/v1/auth/me
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = claims
        .user_id()
        .ok_or(ApiError::Unauthorized("Not authorized to access this route"))?;

    let user = state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No user with the id of {}", user_id)))?;

    Ok(Json(json!({ "success": true, "data": user })))
}

fn send_token_response(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    status: StatusCode,
) -> ApiResult<impl IntoResponse> {
    let token = state.jwt_handler.generate_token(user)?;

    let max_age = state.config.cookie_max_age();
    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .http_only(true)
        .secure(state.config.is_production())
        .path("/")
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .build();

    Ok((
        status,
        jar.add(cookie),
        Json(TokenResponse {
            success: true,
            token,
        }),
    ))
}

fn required<'a>(value: Option<&'a str>, message: &str) -> ApiResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}

// Passwords are taken verbatim, whitespace included
fn required_secret<'a>(value: Option<&'a str>, message: &str) -> ApiResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}
