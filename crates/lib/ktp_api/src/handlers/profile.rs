//! Own-profile handlers.

use axum::Extension;
use axum::extract::State;
use ktp_core::models::user::User;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{DataResponse, UpdateProfileRequest};

/// `GET /api/profile`
pub async fn get_profile_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> AppResult<ApiJson<DataResponse<User>>> {
    let user = state.auth.accounts().profile(user.id).await?;
    Ok(ApiJson(DataResponse::success(user)))
}

/// `PUT /api/profile`: change name and/or email.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> AppResult<ApiJson<DataResponse<User>>> {
    if body.name.is_none() && body.email.is_none() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    let updated = state
        .auth
        .accounts()
        .update_profile(user.id, body.name.as_deref(), body.email.as_deref())
        .await?;
    Ok(ApiJson(DataResponse::success(updated)))
}
