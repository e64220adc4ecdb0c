//! # UTXO Mapper
//!
//! Converts the node's unspent-output records into explorer UTXO entries
//! with a confirmation count taken against the current best height.
//!
//! Order of the input is preserved. Nothing is sorted or de-duplicated; a
//! coin listed twice by the node is listed twice here.

use bitcoin::network::constants::Network;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::is_chain_height;
use crate::metrics;
use crate::script_utils::classify_script;
use crate::types::{Coin, Hash256};
use crate::units::satoshi_to_coin;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UtxoEntry {
    pub address: Option<String>,
    pub txid: Hash256,
    pub vout: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: String,
    pub amount: f64,
    pub satoshis: i64,
    pub height: i32,
    pub confirmations: u32,
}

/// Confirmations of a coin created at `height`, 0 while it sits in the mempool
pub fn coin_confirmations(height: i32, best_height: i32) -> u32 {
    if !is_chain_height(height) {
        return 0;
    }
    (best_height - height + 1).max(0) as u32
}

/// Owner derived from the locking script.
///
/// The script is authoritative. When the node's record names a different
/// owner the disagreement is logged and counted, and the derived address
/// is reported. Scripts without an address fall back to the record.
fn resolve_owner(coin: &Coin, network: Network) -> Option<String> {
    let derived = classify_script(&coin.script_pubkey, network)
        .address()
        .map(str::to_string);

    match (&derived, &coin.address) {
        (Some(derived), Some(recorded)) if derived != recorded => {
            warn!(
                txid = %coin.txid,
                vout = coin.vout,
                derived = %derived,
                recorded = %recorded,
                "UTXO owner disagrees with its locking script"
            );
            metrics::increment_invariant_violations("utxo_address_mismatch");
        }
        _ => {}
    }

    derived.or_else(|| coin.address.clone())
}

pub fn map_utxos(coins: &[Coin], best_height: i32, network: Network) -> Vec<UtxoEntry> {
    coins
        .iter()
        .map(|coin| UtxoEntry {
            address: resolve_owner(coin, network),
            txid: coin.txid,
            vout: coin.vout,
            script_pub_key: hex::encode(&coin.script_pubkey),
            amount: satoshi_to_coin(coin.value),
            satoshis: coin.value,
            height: coin.height,
            confirmations: coin_confirmations(coin.height, best_height),
        })
        .collect()
}
