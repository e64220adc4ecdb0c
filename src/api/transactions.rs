// Transaction API Endpoints

use axum::{extract::{Path as AxumPath, Query}, Extension, Json};
use std::sync::Arc;
use tracing::debug;

use super::helpers::{
    bad_request, explorer_error, parse_address, parse_hash, parse_optional_number, ApiResult,
};
use super::types::TxsQuery;
use crate::explorer::{Explorer, TransactionPage};
use crate::transactions::EnrichedTransaction;

/// GET /tx/{txid}
pub async fn tx(
    AxumPath(txid): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<EnrichedTransaction> {
    let txid = parse_hash(&txid, "Txid is not valid")?;
    debug!(txid = %txid, "Fetching transaction");
    explorer.transaction(&txid).await.map(Json).map_err(explorer_error)
}

/// GET /txs?block=HASH&pageNum=N or /txs?address=ADDR&pageNum=N
pub async fn txs(
    Query(params): Query<TxsQuery>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<TransactionPage> {
    let page = parse_optional_number::<usize>(params.page_num.as_deref(), "pageNum")?.unwrap_or(0);

    let result = match (params.block.as_deref(), params.address.as_deref()) {
        (Some(block), _) => {
            let hash = parse_hash(block, "Blockhash is not valid")?;
            explorer.transactions_by_block(&hash, page).await
        }
        (None, Some(address)) => {
            let address = parse_address(address, explorer.network())?;
            explorer.transactions_by_address(&address, page).await
        }
        (None, None) => return Err(bad_request("Block hash or address expected")),
    };

    result.map(Json).map_err(explorer_error)
}
