//! Request flows.
//!
//! Each method fetches what it needs from the node and hands it to exactly
//! one aggregator. Handlers in `api` only validate input and map errors.

use bitcoin::network::constants::Network;
use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{aggregate, ActivitySummary, AddressQueryOptions, AddressTotal};
use crate::blocks::{
    bits_to_difficulty, map_block, summarize, BlockDetail, BlockSummaryPage, DayWindow,
};
use crate::constants::DEFAULT_TX_PAGE_SIZE;
use crate::error::ExplorerError;
use crate::metrics::{self, Timer};
use crate::node::SharedChain;
use crate::transactions::{annotate_all, enrich, EnrichedTransaction};
use crate::types::{Hash256, MetaTransaction};
use crate::units::satoshi_to_coin;
use crate::utxo::{map_utxos, UtxoEntry};

/// Default minimum relay fee, in satoshis per kilobyte
pub const DEFAULT_RELAY_FEE_SAT: i64 = 1_000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionPage {
    #[serde(rename = "pagesTotal")]
    pub pages_total: usize,
    pub txs: Vec<EnrichedTransaction>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub version: String,
    pub protocolversion: u32,
    pub blocks: i32,
    pub timeoffset: i64,
    pub connections: u32,
    pub proxy: String,
    pub difficulty: f64,
    pub testnet: bool,
    pub relayfee: f64,
    pub errors: Option<String>,
    pub network: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InfoResponse {
    pub info: NodeInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub status: String,
    #[serde(rename = "blockChainHeight")]
    pub block_chain_height: i32,
    #[serde(rename = "syncPercentage")]
    pub sync_percentage: f64,
    pub height: i32,
    pub error: Option<String>,
    #[serde(rename = "type")]
    pub sync_type: String,
}

const PROTOCOL_VERSION: u32 = 70015;

pub fn network_name(network: Network) -> &'static str {
    match network {
        Network::Bitcoin => "main",
        Network::Testnet => "testnet",
        Network::Regtest => "regtest",
        #[allow(unreachable_patterns)]
        _ => "unknown",
    }
}

/// Number of pages of `page_size` needed for `count` items
fn pages_total(count: usize, page_size: usize) -> usize {
    (count + page_size - 1) / page_size
}

fn page_of<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    items
        .iter()
        .skip(page.saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect()
}

pub struct Explorer {
    chain: SharedChain,
    network: Network,
    tx_page_size: usize,
    relay_fee_sat: i64,
}

impl Explorer {
    pub fn new(chain: SharedChain, network: Network) -> Self {
        Self {
            chain,
            network,
            tx_page_size: DEFAULT_TX_PAGE_SIZE,
            relay_fee_sat: DEFAULT_RELAY_FEE_SAT,
        }
    }

    pub fn with_tx_page_size(mut self, size: usize) -> Self {
        self.tx_page_size = size.max(1);
        self
    }

    pub fn with_relay_fee(mut self, relay_fee_sat: i64) -> Self {
        self.relay_fee_sat = relay_fee_sat;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    async fn best_height(&self) -> Result<i32, ExplorerError> {
        let height = self.chain.chain_height().await?;
        metrics::set_chain_tip_height(height as i64);
        Ok(height)
    }

    /// Address summary; an address the node has never seen is not found
    pub async fn address_summary(
        &self,
        address: &str,
        options: &AddressQueryOptions,
    ) -> Result<ActivitySummary, ExplorerError> {
        let timer = Timer::new();
        let metas = self.chain.metas_by_address(address).await?;
        if metas.is_empty() {
            return Err(ExplorerError::NoTransactions(address.to_string()));
        }

        let best_height = self.best_height().await?;
        let annotated = annotate_all(self.chain.as_ref(), metas).await?;
        let summary = aggregate(address, &annotated, best_height, options, self.network);

        metrics::record_enrichment_duration("address", timer.elapsed_secs());
        debug!(address = %address, txs = summary.tx_apperances, "Built address summary");
        Ok(summary)
    }

    /// One figure of the address summary, 0 for unused addresses
    pub async fn address_total(
        &self,
        address: &str,
        which: AddressTotal,
    ) -> Result<i64, ExplorerError> {
        let metas = self.chain.metas_by_address(address).await?;
        let best_height = self.best_height().await?;
        let annotated = annotate_all(self.chain.as_ref(), metas).await?;
        let options = AddressQueryOptions {
            no_tx_list: true,
            ..Default::default()
        };
        Ok(aggregate(address, &annotated, best_height, &options, self.network).total(which))
    }

    pub async fn transaction(&self, txid: &Hash256) -> Result<EnrichedTransaction, ExplorerError> {
        let timer = Timer::new();
        let meta = self
            .chain
            .meta_transaction(txid)
            .await?
            .ok_or(ExplorerError::TransactionNotFound(*txid))?;
        let best_height = self.best_height().await?;
        let tx = enrich(self.chain.as_ref(), meta, best_height, self.network).await?;

        metrics::record_enrichment_duration("transaction", timer.elapsed_secs());
        Ok(tx)
    }

    async fn enrich_page(
        &self,
        metas: Vec<MetaTransaction>,
        page: usize,
    ) -> Result<TransactionPage, ExplorerError> {
        let timer = Timer::new();
        let best_height = self.best_height().await?;
        let pages_total = pages_total(metas.len(), self.tx_page_size);
        let selected = page_of(&metas, page, self.tx_page_size);

        let txs = try_join_all(
            selected
                .into_iter()
                .map(|meta| enrich(self.chain.as_ref(), meta, best_height, self.network)),
        )
        .await?;

        metrics::record_enrichment_duration("tx_listing", timer.elapsed_secs());
        Ok(TransactionPage { pages_total, txs })
    }

    pub async fn transactions_by_block(
        &self,
        hash: &Hash256,
        page: usize,
    ) -> Result<TransactionPage, ExplorerError> {
        let block = self
            .chain
            .block(hash)
            .await?
            .ok_or_else(|| ExplorerError::BlockNotFound(hash.to_string()))?;

        let pages_total = pages_total(block.txids.len(), self.tx_page_size);
        let txids = page_of(&block.txids, page, self.tx_page_size);
        let metas = try_join_all(txids.iter().map(|txid| async move {
            self.chain
                .meta_transaction(txid)
                .await?
                .ok_or(ExplorerError::TransactionNotFound(*txid))
        }))
        .await?;

        // Only the requested page was fetched, so enrich it as page 0
        let mut result = self.enrich_page(metas, 0).await?;
        result.pages_total = pages_total;
        Ok(result)
    }

    pub async fn transactions_by_address(
        &self,
        address: &str,
        page: usize,
    ) -> Result<TransactionPage, ExplorerError> {
        let metas = self.chain.metas_by_address(address).await?;
        self.enrich_page(metas, page).await
    }

    pub async fn utxos(&self, addresses: &[String]) -> Result<Vec<UtxoEntry>, ExplorerError> {
        let timer = Timer::new();
        let coins = self.chain.coins_by_addresses(addresses).await?;
        let best_height = self.best_height().await?;
        let entries = map_utxos(&coins, best_height, self.network);

        metrics::record_enrichment_duration("utxo", timer.elapsed_secs());
        Ok(entries)
    }

    pub async fn block_summaries(
        &self,
        date: Option<NaiveDate>,
        limit: Option<usize>,
        today: NaiveDate,
    ) -> Result<BlockSummaryPage, ExplorerError> {
        let timer = Timer::new();
        let window = DayWindow::for_request(date, today);
        let blocks = self.chain.blocks_in_range(window.from, window.to).await?;
        let page = summarize(&blocks, &window, limit, today);

        metrics::record_enrichment_duration("blocks", timer.elapsed_secs());
        Ok(page)
    }

    pub async fn block_hash(&self, height: u32) -> Result<Hash256, ExplorerError> {
        self.chain
            .block_hash_at(height)
            .await?
            .ok_or_else(|| ExplorerError::BlockNotFound(height.to_string()))
    }

    pub async fn block_detail(&self, hash: &Hash256) -> Result<BlockDetail, ExplorerError> {
        let timer = Timer::new();
        let block = self
            .chain
            .block(hash)
            .await?
            .ok_or_else(|| ExplorerError::BlockNotFound(hash.to_string()))?;
        let best_height = self.best_height().await?;
        let next_hash = self.chain.next_block_hash(hash).await?;
        let is_main_chain = match u32::try_from(block.height) {
            Ok(height) => self.chain.block_hash_at(height).await? == Some(block.hash),
            Err(_) => false,
        };

        metrics::record_enrichment_duration("block", timer.elapsed_secs());
        Ok(map_block(&block, next_hash, best_height, is_main_chain))
    }

    pub async fn best_block_hash(&self) -> Result<Hash256, ExplorerError> {
        let best_height = self.best_height().await?;
        let height = u32::try_from(best_height)
            .map_err(|_| ExplorerError::BlockNotFound("tip".to_string()))?;
        self.block_hash(height).await
    }

    /// Difficulty of the tip block, 0 on an empty chain
    pub async fn difficulty(&self) -> Result<f64, ExplorerError> {
        let hash = match self.best_block_hash().await {
            Ok(hash) => hash,
            Err(e) if e.is_not_found() => return Ok(0.0),
            Err(e) => return Err(e),
        };
        Ok(self
            .chain
            .block(&hash)
            .await?
            .map(|block| bits_to_difficulty(block.bits))
            .unwrap_or(0.0))
    }

    pub async fn info(&self) -> Result<InfoResponse, ExplorerError> {
        let best_height = self.best_height().await?;
        let difficulty = self.difficulty().await?;
        Ok(InfoResponse {
            info: NodeInfo {
                version: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                protocolversion: PROTOCOL_VERSION,
                blocks: best_height + 1,
                timeoffset: 0,
                connections: 0,
                proxy: String::new(),
                difficulty,
                testnet: self.network == Network::Testnet,
                relayfee: satoshi_to_coin(self.relay_fee_sat),
                errors: None,
                network: network_name(self.network).to_string(),
            },
        })
    }

    pub async fn sync_status(&self) -> Result<SyncStatus, ExplorerError> {
        let height = self.best_height().await?;
        let progress = self.chain.sync_progress().await?;
        Ok(SyncStatus {
            status: if progress >= 1.0 { "finished" } else { "syncing" }.to_string(),
            block_chain_height: height,
            sync_percentage: progress * 100.0,
            height,
            error: None,
            sync_type: env!("CARGO_PKG_NAME").to_string(),
        })
    }
}
