use crate::config::Config;
use crate::models::{RecommendationRequest, RecommendationResponse};
use crate::services::recommendation::RecommendationService;
use crate::services::storage;
use crate::utils::validation::validate_recommendation_request;
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

#[derive(Debug, Default)]
pub struct ServingStats {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_latency_us: AtomicU64,
    reloads: AtomicU64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingStatsSnapshot {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub average_latency_us: u64,
    pub reloads: u64,
}

impl ServingStats {
    fn record(&self, started: Instant, ok: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        if !ok {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ServingStatsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        ServingStatsSnapshot {
            total_requests: total,
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_latency_us: self.total_latency_us.load(Ordering::Relaxed) / total.max(1),
            reloads: self.reloads.load(Ordering::Relaxed),
        }
    }
}

/// Shared state behind the HTTP handlers. The recommendation service sits
/// behind a lock so a retrained artifact can be swapped in without a restart.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub recommendation_service: Arc<RwLock<Arc<RecommendationService>>>,
    pub stats: Arc<ServingStats>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let service = load_service(&config)?;
        Ok(Self::with_service(config, service))
    }

    pub fn with_service(config: Config, service: RecommendationService) -> Self {
        Self {
            config: Arc::new(config),
            recommendation_service: Arc::new(RwLock::new(Arc::new(service))),
            stats: Arc::new(ServingStats::default()),
        }
    }

    pub fn service(&self) -> Arc<RecommendationService> {
        self.recommendation_service.read().clone()
    }

    pub fn reload(&self) -> Result<usize> {
        let service = load_service(&self.config)?;
        let num_items = service.catalog().len();
        *self.recommendation_service.write() = Arc::new(service);
        self.stats.reloads.fetch_add(1, Ordering::Relaxed);
        info!("Reloaded model for {} items", num_items);
        Ok(num_items)
    }
}

fn load_service(config: &Config) -> Result<RecommendationService> {
    let catalog = storage::load_catalog(&config.data.id_map_path)?;
    let model = storage::load_model(&config.data.model_dir, catalog.len())?;
    Ok(RecommendationService::new(
        Arc::new(catalog),
        Arc::new(model),
        config.recommendation.amount,
    )?)
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "cuberec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    status.insert("items".to_string(), state.service().catalog().len().to_string());

    Json(ApiResponse::success(status))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> (StatusCode, Json<ApiResponse<RecommendationResponse>>) {
    let started = Instant::now();
    let service = state.service();

    if let Err(e) = validate_recommendation_request(&request) {
        warn!("Rejected recommendation request: {}", e);
        state.stats.record(started, false);
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
    }

    match service.recommend(&request) {
        Ok(response) => {
            state.stats.record(started, true);
            info!(
                "Served {} recommendations for {} known cards in {:?}",
                response.recommendations.len(),
                response.matched_cards,
                started.elapsed()
            );
            (StatusCode::OK, Json(ApiResponse::success(response)))
        }
        Err(e) => {
            error!("Failed to get recommendations: {}", e);
            state.stats.record(started, false);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

async fn reload_model(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<usize>>) {
    match state.reload() {
        Ok(num_items) => (StatusCode::OK, Json(ApiResponse::success(num_items))),
        Err(e) => {
            error!("Failed to reload model: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<ServingStatsSnapshot>> {
    Json(ApiResponse::success(state.stats.snapshot()))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommendations", post(get_recommendations))
        .route("/model/reload", post(reload_model))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = ServingStats::default();
        let started = Instant::now();
        stats.record(started, true);
        stats.record(started, false);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.reloads, 0);
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<()> = ApiResponse::error("boom".to_string());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message, "boom");
    }
}
