//! Request gates: bearer-token authentication and role checks.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ktp_core::models::user::{Role, User};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// The user resolved by [`protect`], stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Roles allowed on read-only admin routes.
pub const STAFF: &[Role] = &[Role::Admin, Role::Moderator];

/// Roles allowed on mutating admin routes.
pub const ADMINS: &[Role] = &[Role::Admin];

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it and
/// loads the user, then injects `AuthenticatedUser` into request extensions.
pub async fn protect(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("You are not logged in".into()))?;

    let user = state.auth.authenticate(token).await?;
    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

fn check_role(request: &Request, allowed: &[Role]) -> Result<(), AppError> {
    let AuthenticatedUser(user) = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("You are not logged in".into()))?;
    if !allowed.contains(&user.role) {
        debug!(user_id = %user.id, role = %user.role, "role not allowed");
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".into(),
        ));
    }
    Ok(())
}

/// Admins and moderators. Must run inside [`protect`].
pub async fn require_staff(request: Request, next: Next) -> Result<Response, AppError> {
    check_role(&request, STAFF)?;
    Ok(next.run(request).await)
}

/// Admins only. Must run inside [`protect`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    check_role(&request, ADMINS)?;
    Ok(next.run(request).await)
}
