pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ShareConfig;
use crate::services::share_service::ShareService;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::shares::create_share,
        api::handlers::shares::get_share,
        api::handlers::shares::verify_share_password,
        api::handlers::shares::download_shared_file,
        api::handlers::shares::delete_share,
        api::handlers::shares::notify_share,
        api::handlers::maintenance::trigger_sweep,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::shares::CreateShareRequest,
            api::handlers::shares::CreateShareResponse,
            api::handlers::shares::VerifySharePasswordRequest,
            api::handlers::shares::VerifySharePasswordResponse,
            api::handlers::shares::NotifyRequest,
            api::handlers::shares::NotifyResponse,
            api::handlers::health::HealthResponse,
            models::ShareStatus,
            models::SweepReport,
            models::DeliveryMode,
        )
    ),
    tags(
        (name = "shares", description = "Share link lifecycle"),
        (name = "maintenance", description = "Expiration sweep trigger"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub shares: Arc<ShareService>,
    pub config: ShareConfig,
}

impl AppState {
    pub fn new(shares: Arc<ShareService>) -> Self {
        let config = shares.config().clone();
        Self { shares, config }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/shares", post(api::handlers::shares::create_share))
        .route(
            "/shares/:id",
            get(api::handlers::shares::get_share).delete(api::handlers::shares::delete_share),
        )
        .route(
            "/shares/:id/verify",
            post(api::handlers::shares::verify_share_password),
        )
        .route(
            "/shares/:id/download",
            get(api::handlers::shares::download_shared_file),
        )
        .route(
            "/shares/:id/notify",
            post(api::handlers::shares::notify_share),
        )
        .route(
            "/maintenance/sweep",
            post(api::handlers::maintenance::trigger_sweep),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION, header::LOCATION])
}
