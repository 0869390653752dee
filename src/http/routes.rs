use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use super::error::ApiError;
use crate::interaction::{InteractionService, InteractionStats, RecordInteraction, StatsParams};

pub fn api_config() -> Router<Arc<InteractionService>> {
    Router::new()
        .route("/healthz", get(health))
        .route(
            "/api/0/sentry-apps/{app_slug}/interaction/",
            get(get_interactions).post(record_interaction),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_interactions(
    State(service): State<Arc<InteractionService>>,
    Path(app_slug): Path<String>,
    Query(params): Query<StatsParams>,
) -> Result<Json<InteractionStats>, ApiError> {
    let app = service.find_app(&app_slug)?;
    let query = service.parse_query(&params)?;
    let stats = service.interactions(&app, &query)?;
    Ok(Json(stats))
}

async fn record_interaction(
    State(service): State<Arc<InteractionService>>,
    Path(app_slug): Path<String>,
    payload: Result<Json<RecordInteraction>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let app = service.find_app(&app_slug)?;
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    service.record(&app, &request)?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}
