//! Outbox delivery statistics

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::RepositoryProvider;
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct OutboxState {
    pub repos: Arc<dyn RepositoryProvider>,
}

/// Booking events by delivery state; `failed` are dead-lettered
#[derive(Debug, Serialize, ToSchema)]
pub struct OutboxStatsResponse {
    pub pending: u64,
    pub published: u64,
    pub failed: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/outbox/stats",
    tag = "Outbox",
    responses(
        (status = 200, description = "Outbox counts", body = ApiResponse<OutboxStatsResponse>)
    )
)]
pub async fn outbox_stats(State(state): State<OutboxState>) -> ApiResult<OutboxStatsResponse> {
    let stats = state.repos.outbox().stats().await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(OutboxStatsResponse {
        pending: stats.pending,
        published: stats.published,
        failed: stats.failed,
    })))
}
