// Address and UTXO API Endpoints

use axum::{extract::{Path as AxumPath, Query}, Extension, Json};
use std::sync::Arc;
use tracing::info;

use super::helpers::{
    explorer_error, parse_address, parse_address_list, parse_flag, parse_optional_number, ApiResult,
};
use super::types::{AddrQuery, UtxoBody};
use crate::address::{ActivitySummary, AddressQueryOptions, AddressTotal};
use crate::explorer::Explorer;
use crate::utxo::UtxoEntry;

/// GET /addr/{address}
/// Balance figures plus the txid list, optionally restricted to a height range.
pub async fn addr_summary(
    AxumPath(address): AxumPath<String>,
    Query(params): Query<AddrQuery>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<ActivitySummary> {
    let address = parse_address(&address, explorer.network())?;
    let options = AddressQueryOptions {
        from: parse_optional_number(params.from.as_deref(), "from")?,
        to: parse_optional_number(params.to.as_deref(), "to")?,
        no_tx_list: parse_flag(params.no_tx_list.as_deref()),
    };

    info!(address = %address, "Collecting address summary");
    explorer
        .address_summary(&address, &options)
        .await
        .map(Json)
        .map_err(explorer_error)
}

async fn addr_total(
    address: String,
    explorer: Arc<Explorer>,
    which: AddressTotal,
) -> ApiResult<i64> {
    let address = parse_address(&address, explorer.network())?;
    explorer
        .address_total(&address, which)
        .await
        .map(Json)
        .map_err(explorer_error)
}

/// GET /addr/{address}/balance
pub async fn addr_balance(
    AxumPath(address): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<i64> {
    addr_total(address, explorer, AddressTotal::Balance).await
}

/// GET /addr/{address}/totalReceived
pub async fn addr_total_received(
    AxumPath(address): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<i64> {
    addr_total(address, explorer, AddressTotal::TotalReceived).await
}

/// GET /addr/{address}/totalSent
pub async fn addr_total_sent(
    AxumPath(address): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<i64> {
    addr_total(address, explorer, AddressTotal::TotalSent).await
}

/// GET /addr/{address}/unconfirmedBalance
pub async fn addr_unconfirmed_balance(
    AxumPath(address): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<i64> {
    addr_total(address, explorer, AddressTotal::UnconfirmedBalance).await
}

/// GET /addr/{address}/utxo
pub async fn addr_utxo(
    AxumPath(address): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<Vec<UtxoEntry>> {
    let address = parse_address(&address, explorer.network())?;
    explorer.utxos(&[address]).await.map(Json).map_err(explorer_error)
}

/// GET /addrs/{addresses}/utxo
pub async fn addrs_utxo(
    AxumPath(addresses): AxumPath<String>,
    Extension(explorer): Extension<Arc<Explorer>>,
) -> ApiResult<Vec<UtxoEntry>> {
    let addresses = parse_address_list(&addresses, explorer.network())?;
    explorer.utxos(&addresses).await.map(Json).map_err(explorer_error)
}

/// POST /addrs/utxo with `{"addrs": "a,b,c"}`
pub async fn addrs_utxo_post(
    Extension(explorer): Extension<Arc<Explorer>>,
    Json(body): Json<UtxoBody>,
) -> ApiResult<Vec<UtxoEntry>> {
    let addresses = parse_address_list(&body.addrs, explorer.network())?;
    explorer.utxos(&addresses).await.map(Json).map_err(explorer_error)
}
