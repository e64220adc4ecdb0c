// Block API Endpoints

use axum::{extract::{Path as AxumPath, Query}, Extension, Json};
use chrono::Utc;
use std::sync::Arc;

use super::helpers::{
    explorer_error, parse_date, parse_hash, parse_height, parse_optional_number, ApiResult,
};
use super::types::{BlockHashResponse, BlocksQuery};
use crate::blocks::{BlockDetail, BlockSummaryPage};
use crate::explorer::Explorer;

/// GET /block-index/{height}
pub async fn block_index(
    AxumPath(height): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<BlockHashResponse> {
    let height = parse_height(&height)?;
    let block_hash = explorer.block_hash(height).await.map_err(explorer_error)?;
    Ok(Json(BlockHashResponse { block_hash }))
}

/// GET /block/{hash}
pub async fn block(
    AxumPath(hash): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<BlockDetail> {
    let hash = parse_hash(&hash, "Block hash is not valid")?;
    explorer.block_detail(&hash).await.map(Json).map_err(explorer_error)
}

/// GET /blocks?blockDate=YYYY-MM-DD&limit=N
/// Without a date the current UTC day is listed.
pub async fn blocks(
    Query(params): Query<BlocksQuery>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<BlockSummaryPage> {
    let date = parse_date(params.block_date.as_deref())?;
    let limit = parse_optional_number::<usize>(params.limit.as_deref(), "limit")?;
    let today = Utc::now().date_naive();

    explorer
        .block_summaries(date, limit, today)
        .await
        .map(Json)
        .map_err(explorer_error)
}
