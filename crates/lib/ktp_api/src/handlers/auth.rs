//! Authentication request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use ktp_core::auth::reset::ResetRequestOutcome;
use ktp_core::auth::service::SignupInput;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::models::{
    AccessTokenResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
    MessageResponse, RefreshTokenRequest, ResetPasswordRequest, SUCCESS, SessionResponse,
    SignupRequest,
};

/// Same text whether or not the email is registered.
const RESET_SENT: &str = "If that email is registered, a reset link has been sent";

/// `POST /api/auth/signup`: create an account and sign it in.
pub async fn signup_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> AppResult<(StatusCode, ApiJson<SessionResponse>)> {
    let session = state
        .auth
        .signup(SignupInput {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok((StatusCode::CREATED, ApiJson(session.into())))
}

/// `POST /api/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<ApiJson<SessionResponse>> {
    let session = state.auth.login(&body.email, &body.password).await?;
    Ok(ApiJson(session.into()))
}

/// `POST /api/auth/refresh`: exchange a refresh token for a new access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshTokenRequest>,
) -> AppResult<ApiJson<AccessTokenResponse>> {
    let access_token = state.auth.refresh(&body.refresh_token).await?;
    Ok(ApiJson(AccessTokenResponse {
        status: SUCCESS,
        access_token,
    }))
}

/// `POST /api/auth/logout`: revoke a refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshTokenRequest>,
) -> AppResult<ApiJson<MessageResponse>> {
    state.auth.logout(&body.refresh_token).await?;
    Ok(ApiJson(MessageResponse::success("Logged out")))
}

/// `POST /api/auth/forgot-password`: mail a reset link.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> AppResult<ApiJson<ForgotPasswordResponse>> {
    let outcome = state.auth.forgot_password(&body.email).await?;
    let reset_token = match outcome {
        ResetRequestOutcome::Sent { secret } if state.config.expose_reset_token() => Some(secret),
        _ => None,
    };
    Ok(ApiJson(ForgotPasswordResponse {
        status: SUCCESS,
        message: RESET_SENT.into(),
        reset_token,
    }))
}

/// `POST /api/auth/reset-password/{token}`: set a new password.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> AppResult<ApiJson<SessionResponse>> {
    let session = state.auth.reset_password(&token, &body.password).await?;
    Ok(ApiJson(session.into()))
}
