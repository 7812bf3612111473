//! Liveness endpoint.

use axum::extract::State;

use crate::AppState;
use crate::extract::ApiJson;
use crate::models::HealthResponse;

/// `GET /healthz`: reports the core version and, when a pool is attached,
/// whether the database answers.
pub async fn healthz(State(state): State<AppState>) -> ApiJson<HealthResponse> {
    let database = match &state.pool {
        Some(pool) => Some(sqlx::query("SELECT 1").execute(pool).await.is_ok()),
        None => None,
    };
    ApiJson(HealthResponse {
        status: "ok",
        version: ktp_core::version(),
        database,
    })
}
