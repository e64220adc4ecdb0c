//! Node collaborator interface.
//!
//! Everything the aggregators know about the chain comes through this
//! trait. Implementations answer from the node's own indexes; the crate
//! never caches or second-guesses those answers beyond the spender scan in
//! `transactions::resolve_spent_outputs`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ExplorerError;
use crate::types::{BlockRecord, Coin, CoinView, Hash256, MetaTransaction, OutPoint, Transaction};

#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Transaction by id with its placement, `None` if the node never saw it
    async fn meta_transaction(
        &self,
        txid: &Hash256,
    ) -> Result<Option<MetaTransaction>, ExplorerError>;

    /// Every transaction that pays to or spends from `address`
    async fn metas_by_address(&self, address: &str) -> Result<Vec<MetaTransaction>, ExplorerError>;

    /// Unspent outputs owned by any of `addresses`
    async fn coins_by_addresses(&self, addresses: &[String]) -> Result<Vec<Coin>, ExplorerError>;

    /// Reverse spend index: the transaction consuming `outpoint`, if any
    async fn spending_transaction(
        &self,
        outpoint: &OutPoint,
    ) -> Result<Option<Hash256>, ExplorerError>;

    /// Previous outputs spent by `tx`, including already-spent ones
    async fn coin_view(&self, tx: &Transaction) -> Result<CoinView, ExplorerError>;

    /// Height of the best block
    async fn chain_height(&self) -> Result<i32, ExplorerError>;

    /// Blocks with `from <= time < to`, in no particular order
    async fn blocks_in_range(&self, from: i64, to: i64) -> Result<Vec<BlockRecord>, ExplorerError>;

    async fn block_hash_at(&self, height: u32) -> Result<Option<Hash256>, ExplorerError>;

    async fn block(&self, hash: &Hash256) -> Result<Option<BlockRecord>, ExplorerError>;

    async fn next_block_hash(&self, hash: &Hash256) -> Result<Option<Hash256>, ExplorerError>;

    /// Sync progress in `[0, 1]`
    async fn sync_progress(&self) -> Result<f64, ExplorerError>;
}

pub type SharedChain = Arc<dyn ChainSource>;
