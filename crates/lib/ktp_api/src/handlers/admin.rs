//! Admin handlers. Role gating happens in the router.

use axum::Extension;
use axum::extract::{Path, State};
use ktp_core::models::user::Role;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ChangeRoleRequest, DataResponse, MessageResponse, RoleChangeResponse, SUCCESS, StatsResponse,
    UserListResponse,
};

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("User not found".into()))
}

/// `GET /api/admin/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<ApiJson<UserListResponse>> {
    let users = state.auth.accounts().list().await?;
    Ok(ApiJson(UserListResponse {
        status: SUCCESS,
        results: users.len(),
        data: users,
    }))
}

/// `PATCH /api/admin/users/{id}/role`
pub async fn change_role_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(actor)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ChangeRoleRequest>,
) -> AppResult<ApiJson<RoleChangeResponse>> {
    let role: Role = body.role.parse().map_err(|_| {
        AppError::Validation("Invalid role. Allowed: user, admin, moderator".into())
    })?;
    let target = parse_user_id(&id)?;
    let user = state
        .auth
        .accounts()
        .change_role(&actor, target, role)
        .await?;
    Ok(ApiJson(RoleChangeResponse {
        status: SUCCESS,
        message: format!("Role updated to {role}"),
        data: user,
    }))
}

/// `DELETE /api/admin/users/{id}`
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(actor)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<ApiJson<MessageResponse>> {
    let target = parse_user_id(&id)?;
    state.auth.accounts().delete(&actor, target).await?;
    Ok(ApiJson(MessageResponse::success("User deleted")))
}

/// `GET /api/admin/stats`
pub async fn stats_handler(State(state): State<AppState>) -> AppResult<ApiJson<StatsResponse>> {
    let counts = state.auth.accounts().stats().await?;
    Ok(ApiJson(DataResponse::success(counts)))
}
