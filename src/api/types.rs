// API Type Definitions
//
// Request query/body shapes and the error envelope. Response bodies are the
// records built by the core modules and serialize as-is.

use serde::{Deserialize, Serialize};

use crate::explorer::InfoResponse;
use crate::types::Hash256;

// ========== Error Types ==========

/// insight-compatible error body: `{"message": "..."}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorMessage {
            message: message.into(),
        }
    }
}

// ========== Query Types ==========
//
// Query values stay as strings so malformed input gets the JSON error body
// instead of the extractor's plain-text rejection.

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BlocksQuery {
    #[serde(rename = "blockDate")]
    pub block_date: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TxsQuery {
    pub block: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "pageNum")]
    pub page_num: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AddrQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "noTxList")]
    pub no_tx_list: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StatusQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UtxoBody {
    /// Comma-separated address list
    pub addrs: String,
}

// ========== Response Types ==========

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BlockHashResponse {
    #[serde(rename = "blockHash")]
    pub block_hash: Hash256,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DifficultyResponse {
    pub difficulty: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BestBlockHashResponse {
    pub bestblockhash: Hash256,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LastBlockHashResponse {
    #[serde(rename = "syncTipHash")]
    pub sync_tip_hash: Hash256,
    pub lastblockhash: Hash256,
}

/// Body of `/status`, shaped by the `q` selector
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StatusResponse {
    Info(InfoResponse),
    Difficulty(DifficultyResponse),
    BestBlockHash(BestBlockHashResponse),
    LastBlockHash(LastBlockHashResponse),
}
