// address.rs
//
// Address activity aggregation: balance, totals and unconfirmed subtotals
// computed from the transactions touching one address.

use bitcoin::network::constants::Network;
use serde::{Deserialize, Serialize};

use crate::script_utils::classify_script;
use crate::transactions::AnnotatedTransaction;
use crate::types::Hash256;
use crate::units::satoshi_to_coin;

/// Query options of the address summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressQueryOptions {
    /// Inclusive lower height bound
    pub from: Option<i32>,
    /// Inclusive upper height bound
    pub to: Option<i32>,
    pub no_tx_list: bool,
}

impl AddressQueryOptions {
    pub fn includes_height(&self, height: i32) -> bool {
        self.from.map_or(true, |from| height >= from) && self.to.map_or(true, |to| height <= to)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    #[serde(rename = "addrStr")]
    pub addr_str: String,
    pub balance: f64,
    #[serde(rename = "balanceSat")]
    pub balance_sat: i64,
    #[serde(rename = "totalReceived")]
    pub total_received: f64,
    #[serde(rename = "totalReceivedSat")]
    pub total_received_sat: i64,
    #[serde(rename = "totalSent")]
    pub total_sent: f64,
    #[serde(rename = "totalSentSat")]
    pub total_sent_sat: i64,
    #[serde(rename = "unconfirmedBalance")]
    pub unconfirmed_balance: f64,
    #[serde(rename = "unconfirmedBalanceSat")]
    pub unconfirmed_balance_sat: i64,
    #[serde(rename = "unconfirmedTxApperances")]
    pub unconfirmed_tx_apperances: u32,
    #[serde(rename = "txApperances")]
    pub tx_apperances: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transactions: Option<Vec<Hash256>>,
}

/// Single-figure views served by the `/addr/{address}/...` sub-routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressTotal {
    Balance,
    TotalReceived,
    TotalSent,
    UnconfirmedBalance,
}

impl ActivitySummary {
    /// Selected figure in satoshis
    pub fn total(&self, which: AddressTotal) -> i64 {
        match which {
            AddressTotal::Balance => self.balance_sat,
            AddressTotal::TotalReceived => self.total_received_sat,
            AddressTotal::TotalSent => self.total_sent_sat,
            AddressTotal::UnconfirmedBalance => self.unconfirmed_balance_sat,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    received: i64,
    sent: i64,
}

impl Totals {
    fn add(&mut self, tx: &AnnotatedTransaction, address: &str, network: Network) {
        self.received += tx
            .meta
            .tx
            .outputs
            .iter()
            .filter(|out| classify_script(&out.script_pubkey, network).pays_to(address))
            .map(|out| out.value)
            .sum::<i64>();
        self.sent += tx
            .sources
            .iter()
            .flatten()
            .filter(|source| source.address.as_deref() == Some(address))
            .map(|source| source.value)
            .sum::<i64>();
    }

    fn balance(&self) -> i64 {
        self.received - self.sent
    }
}

/// Summarize the activity of `address`.
///
/// The height filter in `options` applies before anything is summed, so
/// totals and the transaction list always describe the same set. Empty
/// input yields an all-zero summary.
pub fn aggregate(
    address: &str,
    txs: &[AnnotatedTransaction],
    best_height: i32,
    options: &AddressQueryOptions,
    network: Network,
) -> ActivitySummary {
    let relevant: Vec<&AnnotatedTransaction> = txs
        .iter()
        .filter(|tx| options.includes_height(tx.meta.height))
        .collect();

    let mut all = Totals::default();
    let mut unconfirmed = Totals::default();
    let mut unconfirmed_count = 0u32;

    for tx in &relevant {
        all.add(tx, address, network);
        if tx.meta.is_unconfirmed(best_height) {
            unconfirmed.add(tx, address, network);
            unconfirmed_count += 1;
        }
    }

    ActivitySummary {
        addr_str: address.to_string(),
        balance: satoshi_to_coin(all.balance()),
        balance_sat: all.balance(),
        total_received: satoshi_to_coin(all.received),
        total_received_sat: all.received,
        total_sent: satoshi_to_coin(all.sent),
        total_sent_sat: all.sent,
        unconfirmed_balance: satoshi_to_coin(unconfirmed.balance()),
        unconfirmed_balance_sat: unconfirmed.balance(),
        unconfirmed_tx_apperances: unconfirmed_count,
        tx_apperances: relevant.len() as u32,
        transactions: if options.no_tx_list {
            None
        } else {
            Some(relevant.iter().map(|tx| tx.meta.tx.txid).collect())
        },
    }
}
