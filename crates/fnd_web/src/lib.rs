use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use fnd_core::config::MAX_REQUEST_SIZE;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

/// Builds the router. An empty origin list or a `*` entry allows any origin.
pub async fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/api/predict", post(handlers::predict))
        .route("/api/batch-predict", post(handlers::batch_predict))
        .route("/api/predict-image", post(handlers::predict_image))
        .route("/api/model-info", get(handlers::model_info))
        .route("/api/check-ocr", get(handlers::check_ocr))
        .route("/api/reload", post(handlers::reload))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

pub mod prelude {
    pub use crate::{create_app, ApiError, AppState};
    pub use fnd_core::{Error, Result};
}
