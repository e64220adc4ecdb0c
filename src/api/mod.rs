// API Module
//
// insight-api compatible HTTP surface. Each domain (blocks, transactions,
// addresses, status) is in its own submodule; handlers share one
// `Arc<Explorer>` through an `Extension` layer.

pub mod types;
pub mod helpers;
pub mod network;
pub mod blocks;
pub mod transactions;
pub mod addresses;


use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::explorer::Explorer;
use crate::metrics::{increment_http_requests, Timer};
use crate::telemetry::truncate_hex;

pub fn router(explorer: Arc<Explorer>) -> Router {
    Router::new()
        // Blocks
        .route("/block-index/{height}", get(blocks::block_index))
        .route("/block/{hash}", get(blocks::block))
        .route("/blocks", get(blocks::blocks))
        // Transactions
        .route("/tx/{txid}", get(transactions::tx))
        .route("/txs", get(transactions::txs))
        // Addresses
        .route("/addr/{address}", get(addresses::addr_summary))
        .route("/addr/{address}/balance", get(addresses::addr_balance))
        .route("/addr/{address}/totalReceived", get(addresses::addr_total_received))
        .route("/addr/{address}/totalSent", get(addresses::addr_total_sent))
        .route("/addr/{address}/unconfirmedBalance", get(addresses::addr_unconfirmed_balance))
        .route("/addr/{address}/utxo", get(addresses::addr_utxo))
        .route("/addrs/{addresses}/utxo", get(addresses::addrs_utxo))
        .route("/addrs/utxo", post(addresses::addrs_utxo_post))
        // Status
        .route("/status", get(network::status))
        .route("/sync", get(network::sync))
        .route("/metrics", get(network::metrics))
        .layer(middleware::from_fn(track_requests))
        .layer(Extension(explorer))
        .layer(CorsLayer::permissive())
}

/// Per-request log line, `X-Response-Time` header and request counter
async fn track_requests(request: Request, next: Next) -> Response {
    let timer = Timer::new();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let mut response = next.run(request).await;

    let elapsed_ms = (timer.elapsed_secs() * 1000.0).round() as u64;
    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", elapsed_ms)) {
        response.headers_mut().insert("x-response-time", value);
    }

    let status = response.status().as_u16();
    increment_http_requests(&endpoint, method.as_str(), status);
    info!(
        method = %method,
        path = %truncate_hex(&path, 96),
        status,
        elapsed_ms,
        "Handled request"
    );

    response
}
