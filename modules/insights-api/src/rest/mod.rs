pub mod params;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use bson::{Bson, Document};
use serde_json::Value;

use insights_common::{
    DimensionSummary, FilterOptions, MetricPoint, RankedGroup, RegionSummary, YearPoint,
};

use crate::error::ApiError;
use crate::AppState;
use params::{filters, MetricsQuery, QueryPairs, TimeSeriesQuery, TopNQuery};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Records as relaxed extended JSON: `_id` becomes `{"$oid": ...}`.
fn records_json(records: Vec<Document>) -> Vec<Value> {
    records
        .into_iter()
        .map(|doc| Bson::Document(doc).into_relaxed_extjson())
        .collect()
}

// --- Handlers ---

pub async fn api_data(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<Value>> {
    let records = state.analytics.list(&filters(&pairs)).await?;
    Ok(Json(records_json(records)))
}

pub async fn api_filters(State(state): State<Arc<AppState>>) -> ApiResult<FilterOptions> {
    Ok(Json(state.analytics.filter_options().await?))
}

pub async fn api_metrics(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<MetricPoint>> {
    let query = MetricsQuery::from_pairs(&pairs);
    let (metric, group_by) = query.validate()?;
    let rows = state
        .analytics
        .metrics_by_group(&query.filters, group_by, metric)
        .await?;
    Ok(Json(rows))
}

pub async fn api_top_n(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<RankedGroup>> {
    let query = TopNQuery::from_pairs(&pairs);
    let (metric, group, limit) = query.validate()?;
    let rows = state.analytics.top_n(&query.filters, group, metric, limit).await?;
    Ok(Json(rows))
}

pub async fn api_timeseries(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<YearPoint>> {
    let query = TimeSeriesQuery::from_pairs(&pairs);
    let metric = query.validate()?;
    Ok(Json(state.analytics.time_series(&query.filters, metric).await?))
}

pub async fn api_topics(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<DimensionSummary>> {
    Ok(Json(state.analytics.topic_analysis(&filters(&pairs)).await?))
}

pub async fn api_regions(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<RegionSummary>> {
    Ok(Json(state.analytics.region_analysis(&filters(&pairs)).await?))
}

pub async fn api_sectors(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<DimensionSummary>> {
    Ok(Json(state.analytics.sector_analysis(&filters(&pairs)).await?))
}

pub async fn api_pest(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<DimensionSummary>> {
    Ok(Json(state.analytics.pest_analysis(&filters(&pairs)).await?))
}

pub async fn api_country_insights(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Vec<Value>> {
    // `country` is checked by the dispatcher before the store is touched
    let records = state.analytics.country_insights(&filters(&pairs)).await?;
    Ok(Json(records_json(records)))
}
