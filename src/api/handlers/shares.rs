use crate::AppState;
use crate::api::error::AppError;
use crate::models::{NewShare, ShareStatus};
use crate::services::delivery::Delivery;
use crate::services::storage::attachment_disposition;
use crate::utils::validation::validate_share_id;
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// ── Request / Response Types ──────────────────────────────────────────

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateShareRequest {
    #[validate(length(min = 1, max = 1024, message = "Filename is required"))]
    pub filename: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Declared upload size in bytes
    pub size_bytes: i64,
    #[validate(range(min = 1, message = "Expiry must be at least one hour"))]
    pub expires_in_hours: i64,
    #[serde(default)]
    pub one_time: bool,
    #[serde(default)]
    pub delete_after_send: bool,
    #[validate(email(message = "Invalid email format"))]
    pub owner_email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateShareResponse {
    pub id: String,
    pub upload_url: String,
    pub upload_method: String,
    pub upload_expires_at: chrono::DateTime<Utc>,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct PasswordQuery {
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifySharePasswordRequest {
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifySharePasswordResponse {
    pub verified: bool,
}

#[derive(Deserialize, ToSchema, Validate, Default)]
pub struct NotifyRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct NotifyResponse {
    pub sent_to: String,
}

// ── Endpoints ─────────────────────────────────────────────────────────

/// Create a share link and obtain a signed upload URL
#[utoipa::path(
    post,
    path = "/shares",
    request_body = CreateShareRequest,
    responses(
        (status = 201, description = "Share link created", body = CreateShareResponse),
        (status = 400, description = "Bad request"),
        (status = 413, description = "Declared size exceeds the limit"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "shares"
)]
pub async fn create_share(
    State(state): State<AppState>,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<CreateShareResponse>), AppError> {
    req.validate()?;
    let ttl = chrono::Duration::try_hours(req.expires_in_hours)
        .ok_or_else(|| AppError::BadRequest("Expiry is out of range".to_string()))?;

    let ticket = state
        .shares
        .request_upload(NewShare {
            filename: req.filename,
            mime_type: req.mime_type.unwrap_or_default(),
            size_bytes: req.size_bytes,
            ttl,
            one_time_consume: req.one_time,
            delete_after_send: req.delete_after_send,
            owner_email: req.owner_email,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateShareResponse {
            id: ticket.id,
            upload_url: ticket.upload_target.url,
            upload_method: ticket.upload_target.method,
            upload_expires_at: ticket.upload_target.expires_at,
            expires_at: ticket.expires_at,
        }),
    ))
}

/// Public share info. Never consumes the share.
///
/// When `password` is supplied the full access check runs as well, so a
/// client can learn whether a download would currently succeed.
#[utoipa::path(
    get,
    path = "/shares/{id}",
    params(
        ("id" = String, Path, description = "Share ID"),
        ("password" = Option<String>, Query, description = "Share password")
    ),
    responses(
        (status = 200, description = "Share info", body = ShareStatus),
        (status = 400, description = "Malformed share ID"),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "Share not found"),
        (status = 410, description = "Share expired or already downloaded")
    ),
    tag = "shares"
)]
pub async fn get_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PasswordQuery>,
) -> Result<Json<ShareStatus>, AppError> {
    let id = validate_share_id(&id)?;

    if let Some(password) = query.password.as_deref() {
        state.shares.evaluate_access(&id, Some(password)).await?;
    }

    Ok(Json(state.shares.describe(&id).await?))
}

/// Verify share password
#[utoipa::path(
    post,
    path = "/shares/{id}/verify",
    params(("id" = String, Path, description = "Share ID")),
    request_body = VerifySharePasswordRequest,
    responses(
        (status = 200, description = "Password verification result", body = VerifySharePasswordResponse),
        (status = 404, description = "Share not found"),
        (status = 410, description = "Share expired or already downloaded")
    ),
    tag = "shares"
)]
pub async fn verify_share_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VerifySharePasswordRequest>,
) -> Result<Json<VerifySharePasswordResponse>, AppError> {
    let id = validate_share_id(&id)?;

    let verified = match state.shares.evaluate_access(&id, Some(&req.password)).await {
        Ok(_) => true,
        Err(AppError::InvalidPassword) => false,
        Err(e) => return Err(e),
    };

    Ok(Json(VerifySharePasswordResponse { verified }))
}

/// Download shared file
#[utoipa::path(
    get,
    path = "/shares/{id}/download",
    params(
        ("id" = String, Path, description = "Share ID"),
        ("password" = Option<String>, Query, description = "Share password")
    ),
    responses(
        (status = 200, description = "File content (delete-after-send shares)"),
        (status = 302, description = "Redirect to a signed download URL"),
        (status = 401, description = "Password required or invalid"),
        (status = 404, description = "Share not found"),
        (status = 410, description = "Share expired or already downloaded"),
        (status = 502, description = "File content could not be read")
    ),
    tag = "shares"
)]
pub async fn download_shared_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PasswordQuery>,
) -> Result<Response, AppError> {
    let id = validate_share_id(&id)?;
    let delivery = state.shares.consume(&id, query.password.as_deref()).await?;
    delivery_response(delivery)
}

fn delivery_response(delivery: Delivery) -> Result<Response, AppError> {
    let response = match delivery {
        Delivery::Redirect { url, .. } => Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, url)
            .header(header::CACHE_CONTROL, "no-store")
            .body(Body::empty()),
        // The purge handle is dropped here; the task keeps running detached.
        Delivery::Inline {
            content,
            filename,
            mime_type,
            ..
        } => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_DISPOSITION, attachment_disposition(&filename))
            .header(header::CONTENT_LENGTH, content.len())
            .header(header::CACHE_CONTROL, "no-store")
            .body(Body::from(content)),
    };

    response.map_err(|e| AppError::BadRequest(format!("Unrepresentable response header: {}", e)))
}

/// Delete a share and its content
#[utoipa::path(
    delete,
    path = "/shares/{id}",
    params(("id" = String, Path, description = "Share ID")),
    responses(
        (status = 204, description = "Share deleted"),
        (status = 404, description = "Share not found"),
        (status = 500, description = "Content deleted but record remains"),
        (status = 503, description = "Store unavailable, nothing deleted")
    ),
    tag = "shares"
)]
pub async fn delete_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = validate_share_id(&id)?;
    state.shares.delete_record(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Email the share link
#[utoipa::path(
    post,
    path = "/shares/{id}/notify",
    params(("id" = String, Path, description = "Share ID")),
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Link sent", body = NotifyResponse),
        (status = 400, description = "No recipient"),
        (status = 404, description = "Share not found"),
        (status = 410, description = "Share expired or already downloaded")
    ),
    tag = "shares"
)]
pub async fn notify_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<NotifyRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let id = validate_share_id(&id)?;
    let Json(req) = body.unwrap_or_default();
    req.validate()?;

    let sent_to = state.shares.send_link(&id, req.email.as_deref()).await?;
    Ok(Json(NotifyResponse { sent_to }))
}
