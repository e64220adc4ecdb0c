/// In-Memory Node
///
/// A `ChainSource` that holds a whole chain in memory, loaded from a JSON
/// snapshot. It builds the same indexes a full node keeps on disk:
/// transactions by id, transactions by address, blocks by hash and height,
/// and the reverse spend index (outpoint -> spending txid).
///
/// Heights are assigned from block order in the snapshot. Mempool entries
/// get `HEIGHT_MEMPOOL` and no block hash.

use async_trait::async_trait;
use bitcoin::network::constants::Network;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::HEIGHT_MEMPOOL;
use crate::error::ExplorerError;
use crate::node::ChainSource;
use crate::script_utils::classify_script;
use crate::types::{BlockRecord, Coin, CoinView, Hash256, MetaTransaction, OutPoint, Transaction};

/// Serialized header size plus the one-byte transaction count
const EMPTY_BLOCK_SIZE: u32 = 81;

fn default_block_version() -> i32 {
    1
}

fn default_progress() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBlock {
    pub hash: Hash256,
    #[serde(default = "default_block_version")]
    pub version: i32,
    #[serde(default)]
    pub merkle_root: Hash256,
    /// Filled from the preceding block when absent
    #[serde(default)]
    pub prev_hash: Option<Hash256>,
    pub time: u32,
    #[serde(default)]
    pub bits: u32,
    #[serde(default)]
    pub nonce: u32,
    #[serde(default)]
    pub chainwork: String,
    /// Computed from the transaction sizes when zero
    #[serde(default)]
    pub size: u32,
    /// Defaults to the coinbase output value
    #[serde(default)]
    pub reward: Option<i64>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub tx: Transaction,
    pub time: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub blocks: Vec<SnapshotBlock>,
    #[serde(default)]
    pub mempool: Vec<MempoolEntry>,
    #[serde(default = "default_progress")]
    pub progress: f64,
}

pub struct MemoryNode {
    network: Network,
    blocks: Vec<BlockRecord>,
    block_heights: HashMap<Hash256, usize>,
    txs: HashMap<Hash256, MetaTransaction>,
    address_txs: HashMap<String, Vec<Hash256>>,
    spends: HashMap<OutPoint, Hash256>,
    progress: f64,
}

impl MemoryNode {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            blocks: Vec::new(),
            block_heights: HashMap::new(),
            txs: HashMap::new(),
            address_txs: HashMap::new(),
            spends: HashMap::new(),
            progress: default_progress(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot, network: Network) -> Self {
        let mut node = Self::new(network);
        node.progress = snapshot.progress;
        for block in snapshot.blocks {
            node.push_block(block);
        }
        for entry in snapshot.mempool {
            node.push_mempool(entry.tx, entry.time);
        }
        node
    }

    /// Read a JSON snapshot from disk
    pub fn load(path: impl AsRef<Path>, network: Network) -> Result<Self, ExplorerError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| ExplorerError::Snapshot(format!("{}: {}", path.display(), e)))?;
        let snapshot: Snapshot = serde_json::from_str(&data)?;
        let node = Self::from_snapshot(snapshot, network);

        info!(
            path = %path.display(),
            blocks = node.blocks.len(),
            transactions = node.txs.len(),
            addresses = node.address_txs.len(),
            "Loaded chain snapshot"
        );

        Ok(node)
    }

    /// Append a block on top of the current tip and index its transactions
    pub fn push_block(&mut self, block: SnapshotBlock) -> Hash256 {
        let height = self.blocks.len();
        let prev_hash = block
            .prev_hash
            .or_else(|| self.blocks.last().map(|b| b.hash));
        let size = if block.size == 0 {
            EMPTY_BLOCK_SIZE + block.transactions.iter().map(|tx| tx.size).sum::<u32>()
        } else {
            block.size
        };
        let reward = block.reward.unwrap_or_else(|| {
            block
                .transactions
                .iter()
                .find(|tx| tx.is_coinbase())
                .map(|tx| tx.value_out())
                .unwrap_or(0)
        });

        let record = BlockRecord {
            hash: block.hash,
            height: height as i32,
            version: block.version,
            merkle_root: block.merkle_root,
            prev_hash,
            time: block.time,
            bits: block.bits,
            nonce: block.nonce,
            chainwork: block.chainwork,
            size,
            txids: block.transactions.iter().map(|tx| tx.txid).collect(),
            reward,
        };

        for tx in block.transactions {
            self.index_transaction(MetaTransaction {
                tx,
                block_hash: Some(record.hash),
                height: height as i32,
                time: record.time,
            });
        }

        self.block_heights.insert(record.hash, height);
        let hash = record.hash;
        self.blocks.push(record);
        hash
    }

    pub fn push_mempool(&mut self, tx: Transaction, time: u32) {
        self.index_transaction(MetaTransaction {
            tx,
            block_hash: None,
            height: HEIGHT_MEMPOOL,
            time,
        });
    }

    fn index_transaction(&mut self, meta: MetaTransaction) {
        let txid = meta.tx.txid;
        let mut touched: Vec<String> = Vec::new();

        for input in &meta.tx.inputs {
            let prevout = match input.prevout {
                Some(prevout) => prevout,
                None => continue,
            };
            self.spends.insert(prevout, txid);

            let source_script = self
                .txs
                .get(&prevout.txid)
                .and_then(|prev| prev.tx.outputs.get(prevout.vout as usize))
                .map(|out| out.script_pubkey.clone());
            if let Some(script) = source_script {
                if let Some(addr) = classify_script(&script, self.network).address() {
                    touched.push(addr.to_string());
                }
            }
        }

        for output in &meta.tx.outputs {
            if let Some(addr) = classify_script(&output.script_pubkey, self.network).address() {
                touched.push(addr.to_string());
            }
        }

        let mut seen = HashSet::new();
        for addr in touched {
            if seen.insert(addr.clone()) {
                self.address_txs.entry(addr).or_default().push(txid);
            }
        }

        debug!(txid = %txid, height = meta.height, "Indexed transaction");
        self.txs.insert(txid, meta);
    }

    fn unspent_for(&self, address: &str, seen: &mut HashSet<OutPoint>) -> Vec<Coin> {
        let mut coins = Vec::new();
        let txids = match self.address_txs.get(address) {
            Some(txids) => txids,
            None => return coins,
        };

        for txid in txids {
            let meta = match self.txs.get(txid) {
                Some(meta) => meta,
                None => continue,
            };
            for (vout, output) in meta.tx.outputs.iter().enumerate() {
                let outpoint = OutPoint::new(*txid, vout as u32);
                if self.spends.contains_key(&outpoint) || seen.contains(&outpoint) {
                    continue;
                }
                if !classify_script(&output.script_pubkey, self.network).pays_to(address) {
                    continue;
                }
                seen.insert(outpoint);
                coins.push(Coin {
                    address: Some(address.to_string()),
                    txid: *txid,
                    vout: vout as u32,
                    value: output.value,
                    script_pubkey: output.script_pubkey.clone(),
                    height: meta.height,
                    coinbase: meta.tx.is_coinbase(),
                });
            }
        }

        coins
    }
}

#[async_trait]
impl ChainSource for MemoryNode {
    async fn meta_transaction(
        &self,
        txid: &Hash256,
    ) -> Result<Option<MetaTransaction>, ExplorerError> {
        Ok(self.txs.get(txid).cloned())
    }

    async fn metas_by_address(&self, address: &str) -> Result<Vec<MetaTransaction>, ExplorerError> {
        Ok(self
            .address_txs
            .get(address)
            .map(|txids| txids.iter().filter_map(|txid| self.txs.get(txid).cloned()).collect())
            .unwrap_or_default())
    }

    async fn coins_by_addresses(&self, addresses: &[String]) -> Result<Vec<Coin>, ExplorerError> {
        let mut seen = HashSet::new();
        Ok(addresses
            .iter()
            .flat_map(|addr| self.unspent_for(addr, &mut seen))
            .collect())
    }

    async fn spending_transaction(
        &self,
        outpoint: &OutPoint,
    ) -> Result<Option<Hash256>, ExplorerError> {
        Ok(self.spends.get(outpoint).copied())
    }

    async fn coin_view(&self, tx: &Transaction) -> Result<CoinView, ExplorerError> {
        let mut view = CoinView::new();
        for prevout in tx.inputs.iter().filter_map(|input| input.prevout) {
            let prev = match self.txs.get(&prevout.txid) {
                Some(prev) => prev,
                None => continue,
            };
            if let Some(output) = prev.tx.outputs.get(prevout.vout as usize) {
                view.insert(Coin {
                    address: classify_script(&output.script_pubkey, self.network)
                        .address()
                        .map(str::to_string),
                    txid: prevout.txid,
                    vout: prevout.vout,
                    value: output.value,
                    script_pubkey: output.script_pubkey.clone(),
                    height: prev.height,
                    coinbase: prev.tx.is_coinbase(),
                });
            }
        }
        Ok(view)
    }

    async fn chain_height(&self) -> Result<i32, ExplorerError> {
        Ok(self.blocks.len() as i32 - 1)
    }

    async fn blocks_in_range(&self, from: i64, to: i64) -> Result<Vec<BlockRecord>, ExplorerError> {
        Ok(self
            .blocks
            .iter()
            .filter(|b| (b.time as i64) >= from && (b.time as i64) < to)
            .cloned()
            .collect())
    }

    async fn block_hash_at(&self, height: u32) -> Result<Option<Hash256>, ExplorerError> {
        Ok(self.blocks.get(height as usize).map(|b| b.hash))
    }

    async fn block(&self, hash: &Hash256) -> Result<Option<BlockRecord>, ExplorerError> {
        Ok(self
            .block_heights
            .get(hash)
            .and_then(|height| self.blocks.get(*height))
            .cloned())
    }

    async fn next_block_hash(&self, hash: &Hash256) -> Result<Option<Hash256>, ExplorerError> {
        Ok(self
            .block_heights
            .get(hash)
            .and_then(|height| self.blocks.get(height + 1))
            .map(|b| b.hash))
    }

    async fn sync_progress(&self) -> Result<f64, ExplorerError> {
        Ok(self.progress)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{TxInput, TxOutput};
    use std::io::Write;

    pub const ADDR_A: &str = "mgYrJQYubixiBDUYT7xBRoJcsEEsnS9Ncb";
    pub const ADDR_B: &str = "mtUGPXnLZaSZCtoVjiYpdhbDXuEjSe8NLS";
    pub const ADDR_C: &str = "mgCqxKQwDf4NVciun8sMT4MPWFnKgoSfU7";

    pub fn script_for(address: &str) -> Vec<u8> {
        let hash160 = match address {
            ADDR_A => "0b53f448eba75639c312f9c3ea8b70d5ba3dd6de",
            ADDR_B => "8e177de564adc2755471f07eed5582ecfc1fcd66",
            ADDR_C => "078b588b8eed2c357d9143d32aa3c1cb38f15863",
            other => panic!("no script fixture for {}", other),
        };
        hex::decode(format!("76a914{}88ac", hash160)).unwrap()
    }

    pub fn hash(n: u8) -> Hash256 {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        bytes[31] = 0xee;
        Hash256::from_storage_bytes(bytes)
    }

    pub fn coinbase_tx(id: u8, to: &str, value: i64) -> Transaction {
        Transaction {
            txid: hash(id),
            version: 1,
            lock_time: 0,
            inputs: vec![TxInput {
                prevout: None,
                script_sig: vec![0x03, id, 0x00, 0x00],
                sequence: u32::MAX,
            }],
            outputs: vec![TxOutput { value, script_pubkey: script_for(to) }],
            size: 100,
        }
    }

    pub fn spend_tx(id: u8, prevouts: &[(Hash256, u32)], outputs: &[(&str, i64)]) -> Transaction {
        Transaction {
            txid: hash(id),
            version: 1,
            lock_time: 0,
            inputs: prevouts
                .iter()
                .map(|(txid, vout)| TxInput {
                    prevout: Some(OutPoint::new(*txid, *vout)),
                    script_sig: vec![0x00],
                    sequence: u32::MAX,
                })
                .collect(),
            outputs: outputs
                .iter()
                .map(|(addr, value)| TxOutput { value: *value, script_pubkey: script_for(addr) })
                .collect(),
            size: 226,
        }
    }

    pub fn block(id: u8, time: u32, transactions: Vec<Transaction>) -> SnapshotBlock {
        SnapshotBlock {
            hash: hash(200u8.wrapping_add(id)),
            version: 1,
            merkle_root: hash(100u8.wrapping_add(id)),
            prev_hash: None,
            time,
            bits: 0x1d00ffff,
            nonce: id as u32,
            chainwork: format!("{:064x}", id as u64 + 1),
            size: 0,
            reward: None,
            transactions,
        }
    }

    /// Three blocks and one mempool transaction:
    /// - height 0: coinbase 1 pays A 50 coins
    /// - height 1: coinbase 2 pays C; tx 3 spends 1:0 into B 30 / A 19.9999
    /// - height 2: coinbase 4 pays C
    /// - mempool: tx 5 spends 3:1 (A) into B
    pub fn sample_node() -> MemoryNode {
        let mut node = MemoryNode::new(Network::Testnet);
        node.push_block(block(0, 1_492_819_200, vec![coinbase_tx(1, ADDR_A, 5_000_000_000)]));
        node.push_block(block(
            1,
            1_492_819_800,
            vec![
                coinbase_tx(2, ADDR_C, 5_000_010_000),
                spend_tx(3, &[(hash(1), 0)], &[(ADDR_B, 3_000_000_000), (ADDR_A, 1_999_990_000)]),
            ],
        ));
        node.push_block(block(2, 1_492_820_400, vec![coinbase_tx(4, ADDR_C, 5_000_000_000)]));
        node.push_mempool(spend_tx(5, &[(hash(3), 1)], &[(ADDR_B, 1_999_980_000)]), 1_492_820_500);
        node
    }

    #[tokio::test]
    async fn test_heights_and_links() {
        let node = sample_node();
        assert_eq!(node.chain_height().await.unwrap(), 2);

        let genesis = node.block_hash_at(0).await.unwrap().unwrap();
        let second = node.block_hash_at(1).await.unwrap().unwrap();
        assert_eq!(node.next_block_hash(&genesis).await.unwrap(), Some(second));

        let record = node.block(&second).await.unwrap().unwrap();
        assert_eq!(record.prev_hash, Some(genesis));
        assert_eq!(record.txids, vec![hash(2), hash(3)]);
        assert_eq!(record.size, EMPTY_BLOCK_SIZE + 100 + 226);
        assert_eq!(record.reward, 5_000_010_000);
        assert!(node.block_hash_at(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_address_index_includes_spends() {
        let node = sample_node();
        let metas = node.metas_by_address(ADDR_A).await.unwrap();
        let ids: Vec<Hash256> = metas.iter().map(|m| m.tx.txid).collect();
        assert_eq!(ids, vec![hash(1), hash(3), hash(5)]);
        assert_eq!(metas[2].height, HEIGHT_MEMPOOL);
        assert!(node.metas_by_address("mnotanaddressatall").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spend_index_and_coins() {
        let node = sample_node();
        let spender = node.spending_transaction(&OutPoint::new(hash(1), 0)).await.unwrap();
        assert_eq!(spender, Some(hash(3)));
        assert_eq!(node.spending_transaction(&OutPoint::new(hash(3), 0)).await.unwrap(), None);

        let coins = node
            .coins_by_addresses(&[ADDR_A.to_string(), ADDR_B.to_string(), ADDR_A.to_string()])
            .await
            .unwrap();
        // A's only remaining output (3:1) is spent in the mempool
        let outpoints: Vec<OutPoint> = coins.iter().map(|c| c.outpoint()).collect();
        assert_eq!(outpoints, vec![OutPoint::new(hash(3), 0), OutPoint::new(hash(5), 0)]);
        assert_eq!(coins[1].height, HEIGHT_MEMPOOL);
    }

    #[tokio::test]
    async fn test_coin_view_keeps_spent_outputs() {
        let node = sample_node();
        let tx = node.meta_transaction(&hash(3)).await.unwrap().unwrap().tx;
        let view = node.coin_view(&tx).await.unwrap();
        let coin = view.get(&OutPoint::new(hash(1), 0)).unwrap();
        assert_eq!(coin.value, 5_000_000_000);
        assert_eq!(coin.address.as_deref(), Some(ADDR_A));
        assert!(coin.coinbase);
    }

    #[tokio::test]
    async fn test_blocks_in_range_is_half_open() {
        let node = sample_node();
        let blocks = node.blocks_in_range(1_492_819_200, 1_492_820_400).await.unwrap();
        assert_eq!(blocks.len(), 2);
    }

    #[tokio::test]
    async fn test_load_snapshot_from_file() {
        let snapshot = Snapshot {
            blocks: vec![block(0, 1_492_819_200, vec![coinbase_tx(1, ADDR_A, 5_000_000_000)])],
            mempool: vec![],
            progress: 0.5,
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&snapshot).unwrap().as_bytes()).unwrap();

        let node = MemoryNode::load(file.path(), Network::Testnet).unwrap();
        assert_eq!(node.chain_height().await.unwrap(), 0);
        assert_eq!(node.sync_progress().await.unwrap(), 0.5);
        assert!(node.meta_transaction(&hash(1)).await.unwrap().is_some());
    }

    #[test]
    fn test_load_missing_snapshot_fails() {
        let result = MemoryNode::load("/nonexistent/snapshot.json", Network::Testnet);
        assert!(matches!(result, Err(ExplorerError::Snapshot(_))));
    }
}
