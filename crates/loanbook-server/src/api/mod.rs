//! HTTP API assembly

pub mod response;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db;
use crate::features::{self, FeatureState};
use crate::ingest::UploadPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Pool handle kept for the health probe; data access goes through
    /// the store inside the pipeline.
    pub db: Option<PgPool>,
    pub features: FeatureState,
}

impl AppState {
    pub fn new(db: Option<PgPool>, pipeline: UploadPipeline) -> Self {
        let store = std::sync::Arc::clone(pipeline.store());
        Self {
            db,
            features: FeatureState { store, pipeline },
        }
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let api_v1 = features::router(state.features.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Loanbook Server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness plus a database ping when a pool is configured
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    let database = match &state.db {
        Some(pool) => match db::health_check(pool).await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::error!("Health check database ping failed: {}", e);
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "status": "degraded", "database": "unreachable" })),
                );
            }
        },
        None => "not configured",
    };

    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "database": database })),
    )
}
