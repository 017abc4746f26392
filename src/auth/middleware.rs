//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation and role guards

use crate::auth::{
    jwt::JwtHandler,
    models::{Claims, UserRole},
};
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use tracing::debug;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// Auth middleware that validates JWT tokens.
/// Reads `Authorization: Bearer` first, then the session cookie.
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer
        .map(|TypedHeader(Authorization(b))| b.token().to_string())
        .or_else(|| {
            jar.get(TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty() && v != "none")
        })
        .ok_or(ApiError::Unauthorized("Not authorized to access this route"))?;

    let claims = jwt_handler.validate_token(&token).map_err(|e| {
        debug!("Rejected token: {:#}", e);
        ApiError::Unauthorized("Not authorized to access this route")
    })?;

    // Handlers read the identity back through `CurrentUser`
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Role predicate over a verified identity
pub fn authorize(claims: &Claims, roles: &[UserRole]) -> Result<(), ApiError> {
    if roles.contains(&claims.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            claims.role.as_str()
        )))
    }
}

/// Admin guard, layered after `auth_middleware`
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = extract_claims(&req)
        .ok_or(ApiError::Unauthorized("Not authorized to access this route"))?;
    authorize(claims, ADMIN_ONLY)?;
    Ok(next.run(req).await)
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

/// Verified identity of the caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized("Not authorized to access this route"))
    }
}
