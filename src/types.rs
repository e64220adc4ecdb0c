use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{is_chain_height, is_unconfirmed_height};
use crate::error::ExplorerError;

/// 32-byte hash held in storage (little-endian) order.
///
/// `Display`, `FromStr` and serde all use display order, the byte-reversed
/// hex that clients see. Lookups inside the crate compare the raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn from_storage_bytes(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }

    pub fn from_storage_hex(s: &str) -> Result<Self, ExplorerError> {
        let bytes =
            hex::decode(s).map_err(|e| ExplorerError::InvalidHash(format!("{}: {}", s, e)))?;
        if bytes.len() != 32 {
            return Err(ExplorerError::InvalidHash(format!(
                "{}: expected 32 bytes, got {}",
                s,
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Hash256(arr))
    }

    pub fn from_display_hex(s: &str) -> Result<Self, ExplorerError> {
        let mut hash = Self::from_storage_hex(s)?;
        hash.0.reverse();
        Ok(hash)
    }

    pub fn to_storage_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_display_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl fmt::LowerHex for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({:x})", self)
    }
}

impl FromStr for Hash256 {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash256::from_display_hex(s)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_display_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        Hash256::from_display_hex(&s).map_err(D::Error::custom)
    }
}

/// Reference to output `vout` of transaction `txid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// `None` marks the coinbase input
    #[serde(default)]
    pub prevout: Option<OutPoint>,
    #[serde(with = "hex", default)]
    pub script_sig: Vec<u8>,
    #[serde(default = "default_sequence")]
    pub sequence: u32,
}

fn default_sequence() -> u32 {
    u32::MAX
}

impl TxInput {
    pub fn is_coinbase(&self) -> bool {
        self.prevout.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: i64,
    #[serde(with = "hex")]
    pub script_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: Hash256,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default)]
    pub lock_time: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub size: u32,
}

fn default_version() -> i32 {
    1
}

impl Transaction {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    pub fn value_out(&self) -> i64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

/// A transaction together with where the node placed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTransaction {
    pub tx: Transaction,
    pub block_hash: Option<Hash256>,
    /// Containing block height, `HEIGHT_MEMPOOL` while unmined
    pub height: i32,
    /// Block time, or first-seen time for mempool entries
    pub time: u32,
}

impl MetaTransaction {
    pub fn is_unconfirmed(&self, best_height: i32) -> bool {
        is_unconfirmed_height(self.height, best_height)
    }

    /// Confirmation count, with 0 standing in for "unconfirmed".
    pub fn confirmations(&self, best_height: i32) -> u32 {
        if self.is_unconfirmed(best_height) || !is_chain_height(self.height) {
            return 0;
        }
        (best_height - self.height + 1).max(0) as u32
    }
}

/// Unspent output as reported by the node's address index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub address: Option<String>,
    pub txid: Hash256,
    pub vout: u32,
    pub value: i64,
    pub script_pubkey: Vec<u8>,
    pub height: i32,
    pub coinbase: bool,
}

impl Coin {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Block header fields plus the placement data the node tracks for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub hash: Hash256,
    pub height: i32,
    pub version: i32,
    pub merkle_root: Hash256,
    pub prev_hash: Option<Hash256>,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
    pub chainwork: String,
    pub size: u32,
    pub txids: Vec<Hash256>,
    /// Value claimed by the coinbase, in satoshis
    pub reward: i64,
}

/// Previous outputs a transaction spends, keyed by outpoint.
///
/// Unlike the UTXO set this keeps outputs that are already spent, which is
/// what input-value resolution of historical transactions needs.
#[derive(Debug, Clone, Default)]
pub struct CoinView {
    coins: HashMap<OutPoint, Coin>,
}

impl CoinView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, coin: Coin) {
        self.coins.insert(coin.outpoint(), coin);
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&Coin> {
        self.coins.get(outpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: &str = "f3ea8a564822fbeb0ceb952864f06331b4659eaae743aef9a19b79d1505536ac";

    #[test]
    fn test_hash_display_and_storage_order() {
        let hash: Hash256 = DISPLAY.parse().unwrap();
        assert_eq!(hash.to_display_hex(), DISPLAY);
        assert_eq!(hash.to_string(), DISPLAY);
        assert_eq!(hash.0[0], 0xac);
        assert_eq!(hash.0[31], 0xf3);

        let storage = hash.to_storage_hex();
        assert_eq!(Hash256::from_storage_hex(&storage).unwrap(), hash);
    }

    #[test]
    fn test_hash_rejects_wrong_length() {
        assert!(Hash256::from_display_hex("abcd").is_err());
        assert!(Hash256::from_display_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_hash_serde_uses_display_order() {
        let hash: Hash256 = DISPLAY.parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", DISPLAY));
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_meta_confirmations() {
        let tx = Transaction {
            txid: Hash256::default(),
            version: 1,
            lock_time: 0,
            inputs: vec![],
            outputs: vec![],
            size: 0,
        };
        let mut meta = MetaTransaction { tx, block_hash: None, height: 90, time: 0 };
        assert_eq!(meta.confirmations(100), 11);
        assert!(!meta.is_unconfirmed(100));

        meta.height = 100;
        assert!(meta.is_unconfirmed(100));
        assert_eq!(meta.confirmations(100), 0);

        meta.height = -1;
        assert!(meta.is_unconfirmed(100));
        assert_eq!(meta.confirmations(100), 0);
    }

    #[test]
    fn test_coinbase_input_deserializes_without_prevout() {
        let input: TxInput = serde_json::from_str(r#"{"script_sig": "0301d913"}"#).unwrap();
        assert!(input.is_coinbase());
        assert_eq!(input.sequence, u32::MAX);
        assert_eq!(input.script_sig, vec![0x03, 0x01, 0xd9, 0x13]);
    }
}
