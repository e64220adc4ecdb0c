// Status, Sync and Metrics Endpoints

use axum::{
    extract::Query,
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use super::helpers::{explorer_error, internal_error, ApiResult};
use super::types::{
    BestBlockHashResponse, DifficultyResponse, LastBlockHashResponse, StatusQuery, StatusResponse,
};
use crate::explorer::{Explorer, SyncStatus};
use crate::metrics::gather_metrics;

/// GET /status?q=getInfo|getDifficulty|getBestBlockHash|getLastBlockHash
/// A missing or unknown selector answers with `getInfo`.
pub async fn status(
    Query(params): Query<StatusQuery>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<StatusResponse> {
    let response = match params.q.as_deref() {
        Some("getDifficulty") => StatusResponse::Difficulty(DifficultyResponse {
            difficulty: explorer.difficulty().await.map_err(explorer_error)?,
        }),
        Some("getBestBlockHash") => StatusResponse::BestBlockHash(BestBlockHashResponse {
            bestblockhash: explorer.best_block_hash().await.map_err(explorer_error)?,
        }),
        Some("getLastBlockHash") => {
            let tip = explorer.best_block_hash().await.map_err(explorer_error)?;
            StatusResponse::LastBlockHash(LastBlockHashResponse {
                sync_tip_hash: tip,
                lastblockhash: tip,
            })
        }
        _ => StatusResponse::Info(explorer.info().await.map_err(explorer_error)?),
    };
    Ok(Json(response))
}

/// GET /sync
pub async fn sync(Extension(explorer): Extension<Arc<Explorer>>) -> ApiResult<SyncStatus> {
    explorer.sync_status().await.map(Json).map_err(explorer_error)
}

/// GET /metrics in the Prometheus text format
pub async fn metrics() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)),
        Err(e) => Err(internal_error(format!("Failed to encode metrics: {}", e))),
    }
}
