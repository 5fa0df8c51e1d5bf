use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use insights_store::InsightAnalytics;

pub mod error;
pub mod rest;

pub use error::ApiError;

pub struct AppState {
    pub analytics: InsightAnalytics,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "Dashboard API is running!" }))
        // REST API
        .route("/api/data", get(rest::api_data))
        .route("/api/filters", get(rest::api_filters))
        .route("/api/metrics", get(rest::api_metrics))
        .route("/api/topN", get(rest::api_top_n))
        .route("/api/timeseries", get(rest::api_timeseries))
        .route("/api/topics", get(rest::api_topics))
        .route("/api/regions", get(rest::api_regions))
        .route("/api/sectors", get(rest::api_sectors))
        .route("/api/pest", get(rest::api_pest))
        .route("/api/country-insights", get(rest::api_country_insights))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only, filter values stay out of the logs
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
