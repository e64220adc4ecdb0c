/// Transaction Enrichment
///
/// Turns a node transaction into the explorer view:
/// 1. Input values and source addresses from the node's coin view
/// 2. Spend status of every output via the reverse spend index
/// 3. Fees as sum(inputs) - sum(outputs), coinbase excluded
///
/// Spend status is looked up per output, concurrently, on every call.
/// Nothing here is cached between requests.

use bitcoin::network::constants::Network;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ExplorerError;
use crate::metrics;
use crate::node::ChainSource;
use crate::script_utils::classify_script;
use crate::types::{CoinView, Hash256, MetaTransaction, OutPoint, Transaction};
use crate::units::{format_amount, satoshi_to_coin};

/// Value and owner of the output an input spends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub value: i64,
    pub address: Option<String>,
}

/// A meta-transaction with every input resolved.
///
/// `sources` is index-aligned with `meta.tx.inputs`; coinbase inputs hold `None`.
#[derive(Debug, Clone)]
pub struct AnnotatedTransaction {
    pub meta: MetaTransaction,
    pub sources: Vec<Option<InputSource>>,
}

impl AnnotatedTransaction {
    pub fn value_in(&self) -> i64 {
        self.sources.iter().flatten().map(|s| s.value).sum()
    }
}

/// Back-reference from an output to the input that consumed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpentOutput {
    pub txid: Hash256,
    pub index: u32,
    pub height: i32,
}

// ========== Wire Types ==========

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptSig {
    pub hex: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoinbaseVin {
    pub coinbase: String,
    pub sequence: u32,
    pub n: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegularVin {
    pub txid: Hash256,
    pub vout: u32,
    pub sequence: u32,
    pub n: u32,
    #[serde(rename = "scriptSig")]
    pub script_sig: ScriptSig,
    pub addr: Option<String>,
    #[serde(rename = "valueSat")]
    pub value_sat: i64,
    pub value: f64,
    #[serde(rename = "doubleSpentTxID")]
    pub double_spent_txid: Option<Hash256>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Vin {
    Coinbase(CoinbaseVin),
    Regular(RegularVin),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptPubKey {
    pub hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub script_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vout {
    /// Eight-decimal coin string, e.g. "0.00280000"
    pub value: String,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
    #[serde(rename = "spentTxId")]
    pub spent_tx_id: Option<Hash256>,
    #[serde(rename = "spentIndex")]
    pub spent_index: Option<u32>,
    #[serde(rename = "spentHeight")]
    pub spent_height: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnrichedTransaction {
    pub txid: Hash256,
    pub version: i32,
    pub locktime: u32,
    pub vin: Vec<Vin>,
    pub vout: Vec<Vout>,
    pub blockhash: Option<Hash256>,
    pub blockheight: i32,
    pub confirmations: u32,
    pub time: u32,
    pub blocktime: u32,
    #[serde(rename = "isCoinBase", skip_serializing_if = "Option::is_none", default)]
    pub is_coin_base: Option<bool>,
    #[serde(rename = "valueOut")]
    pub value_out: f64,
    pub size: u32,
    #[serde(rename = "valueIn", skip_serializing_if = "Option::is_none", default)]
    pub value_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fees: Option<f64>,
}

// ========== Resolution ==========

/// Match each input of `tx` with the coin it spends.
///
/// A non-coinbase input whose previous output is absent from `view` means
/// the node's indexes disagree with each other, which is reported rather
/// than papered over.
pub fn resolve_input_sources(
    view: &CoinView,
    tx: &Transaction,
) -> Result<Vec<Option<InputSource>>, ExplorerError> {
    tx.inputs
        .iter()
        .map(|input| match input.prevout {
            None => Ok(None),
            Some(prevout) => view
                .get(&prevout)
                .map(|coin| {
                    Some(InputSource {
                        value: coin.value,
                        address: coin.address.clone(),
                    })
                })
                .ok_or(ExplorerError::MissingPrevout {
                    txid: tx.txid,
                    prevout,
                }),
        })
        .collect()
}

/// Fetch the coin view for `meta` and resolve its inputs
pub async fn annotate(
    chain: &dyn ChainSource,
    meta: MetaTransaction,
) -> Result<AnnotatedTransaction, ExplorerError> {
    let view = chain.coin_view(&meta.tx).await?;
    let sources = resolve_input_sources(&view, &meta.tx)?;
    Ok(AnnotatedTransaction { meta, sources })
}

/// Annotate a batch of transactions concurrently, preserving order
pub async fn annotate_all(
    chain: &dyn ChainSource,
    metas: Vec<MetaTransaction>,
) -> Result<Vec<AnnotatedTransaction>, ExplorerError> {
    try_join_all(metas.into_iter().map(|meta| annotate(chain, meta))).await
}

async fn resolve_spent_output(
    chain: &dyn ChainSource,
    outpoint: OutPoint,
) -> Result<Option<SpentOutput>, ExplorerError> {
    let spender_txid = match chain.spending_transaction(&outpoint).await? {
        Some(txid) => txid,
        None => {
            metrics::increment_spent_lookups("unspent");
            return Ok(None);
        }
    };

    let spender = match chain.meta_transaction(&spender_txid).await? {
        Some(meta) => meta,
        None => {
            warn!(
                txid = %outpoint.txid,
                vout = outpoint.vout,
                spender = %spender_txid,
                "Spend index points at unknown transaction, reporting output unspent"
            );
            metrics::increment_spent_lookups("index_mismatch");
            return Ok(None);
        }
    };

    match spender
        .tx
        .inputs
        .iter()
        .position(|input| input.prevout == Some(outpoint))
    {
        Some(index) => {
            metrics::increment_spent_lookups("spent");
            Ok(Some(SpentOutput {
                txid: spender_txid,
                index: index as u32,
                height: spender.height,
            }))
        }
        None => {
            warn!(
                txid = %outpoint.txid,
                vout = outpoint.vout,
                spender = %spender_txid,
                "Spender has no input for this output, reporting output unspent"
            );
            metrics::increment_spent_lookups("index_mismatch");
            Ok(None)
        }
    }
}

/// Spend status of every output of `tx`, index-aligned with `tx.outputs`
pub async fn resolve_spent_outputs(
    chain: &dyn ChainSource,
    tx: &Transaction,
) -> Result<Vec<Option<SpentOutput>>, ExplorerError> {
    let lookups = (0..tx.outputs.len())
        .map(|index| resolve_spent_output(chain, OutPoint::new(tx.txid, index as u32)));
    try_join_all(lookups).await
}

/// Fully enrich one transaction
pub async fn enrich(
    chain: &dyn ChainSource,
    meta: MetaTransaction,
    best_height: i32,
    network: Network,
) -> Result<EnrichedTransaction, ExplorerError> {
    let (view, spent) = futures::try_join!(
        chain.coin_view(&meta.tx),
        resolve_spent_outputs(chain, &meta.tx)
    )?;
    let sources = resolve_input_sources(&view, &meta.tx)?;
    let annotated = AnnotatedTransaction { meta, sources };

    debug!(
        txid = %annotated.meta.tx.txid,
        inputs = annotated.sources.len(),
        outputs = spent.len(),
        "Enriched transaction"
    );
    Ok(build_enriched(&annotated, &spent, best_height, network))
}

/// Input total and fee, `None` for coinbase transactions
fn fee_summary(annotated: &AnnotatedTransaction) -> Option<(i64, i64)> {
    let tx = &annotated.meta.tx;
    if tx.is_coinbase() {
        return None;
    }

    let value_in = annotated.value_in();
    let value_out = tx.value_out();
    let fee = value_in - value_out;
    if fee < 0 {
        warn!(
            txid = %tx.txid,
            value_in = value_in,
            value_out = value_out,
            fee = fee,
            "Transaction spends more than its inputs"
        );
        metrics::increment_invariant_violations("negative_fee");
    }
    Some((value_in, fee))
}

fn map_vin(annotated: &AnnotatedTransaction) -> Vec<Vin> {
    annotated
        .meta
        .tx
        .inputs
        .iter()
        .zip(annotated.sources.iter())
        .enumerate()
        .map(|(n, (input, source))| match input.prevout {
            None => Vin::Coinbase(CoinbaseVin {
                coinbase: hex::encode(&input.script_sig),
                sequence: input.sequence,
                n: n as u32,
            }),
            Some(prevout) => {
                if source.is_none() {
                    warn!(
                        txid = %annotated.meta.tx.txid,
                        input = n,
                        prevout = %prevout.txid,
                        "Input has no resolved source"
                    );
                }
                let value_sat = source.as_ref().map_or(0, |s| s.value);
                Vin::Regular(RegularVin {
                    txid: prevout.txid,
                    vout: prevout.vout,
                    sequence: input.sequence,
                    n: n as u32,
                    script_sig: ScriptSig {
                        hex: hex::encode(&input.script_sig),
                    },
                    addr: source.as_ref().and_then(|s| s.address.clone()),
                    value_sat,
                    value: satoshi_to_coin(value_sat),
                    double_spent_txid: None,
                })
            }
        })
        .collect()
}

fn map_vout(tx: &Transaction, spent: &[Option<SpentOutput>], network: Network) -> Vec<Vout> {
    tx.outputs
        .iter()
        .enumerate()
        .map(|(n, output)| {
            let class = classify_script(&output.script_pubkey, network);
            let spent = spent.get(n).copied().flatten();
            Vout {
                value: format_amount(output.value),
                n: n as u32,
                script_pub_key: ScriptPubKey {
                    hex: hex::encode(&output.script_pubkey),
                    addresses: class.address().map(|a| vec![a.to_string()]),
                    script_type: class.type_name().to_string(),
                },
                spent_tx_id: spent.map(|s| s.txid),
                spent_index: spent.map(|s| s.index),
                spent_height: spent.map(|s| s.height),
            }
        })
        .collect()
}

/// Assemble the wire record from resolved inputs and spend status
pub fn build_enriched(
    annotated: &AnnotatedTransaction,
    spent: &[Option<SpentOutput>],
    best_height: i32,
    network: Network,
) -> EnrichedTransaction {
    let meta = &annotated.meta;
    let tx = &meta.tx;
    let fee = fee_summary(annotated);

    EnrichedTransaction {
        txid: tx.txid,
        version: tx.version,
        locktime: tx.lock_time,
        vin: map_vin(annotated),
        vout: map_vout(tx, spent, network),
        blockhash: meta.block_hash,
        blockheight: meta.height,
        confirmations: meta.confirmations(best_height),
        time: meta.time,
        blocktime: meta.time,
        is_coin_base: if tx.is_coinbase() { Some(true) } else { None },
        value_out: satoshi_to_coin(tx.value_out()),
        size: tx.size,
        value_in: fee.map(|(value_in, _)| satoshi_to_coin(value_in)),
        fees: fee.map(|(_, fee)| satoshi_to_coin(fee)),
    }
}
