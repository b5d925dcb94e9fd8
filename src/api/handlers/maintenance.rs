use crate::AppState;
use crate::api::error::AppError;
use crate::models::SweepReport;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use chrono::Utc;
use subtle::ConstantTimeEq;

/// Run the expiration sweep now
#[utoipa::path(
    post,
    path = "/maintenance/sweep",
    responses(
        (status = 200, description = "Sweep completed", body = SweepReport),
        (status = 401, description = "Missing or wrong cron token"),
        (status = 503, description = "Sweep trigger disabled or store unavailable")
    ),
    tag = "maintenance"
)]
pub async fn trigger_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, AppError> {
    let expected = state.config.cron_auth_token.as_deref().ok_or_else(|| {
        AppError::UpstreamUnavailable("CRON_AUTH_TOKEN is not configured".to_string())
    })?;

    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !bool::from(supplied.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("Rejected sweep trigger with a wrong token");
        return Err(AppError::Unauthorized("Invalid cron token".to_string()));
    }

    let report = state.shares.sweep_expired(Utc::now()).await?;
    Ok(Json(report))
}
