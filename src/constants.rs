/// Height, Unit and Window Constants
///
/// Special height values and fixed-point constants shared by the aggregators.
/// Height-related logic should use these instead of magic numbers.

/// Genesis block height (the first block in the chain)
pub const HEIGHT_GENESIS: i32 = 0;

/// Height carried by transactions that are still in the mempool
pub const HEIGHT_MEMPOOL: i32 = -1;

/// Minor units (satoshis) per major unit (coin)
pub const COIN: i64 = 100_000_000;

/// Decimal places of the major-unit representation
pub const COIN_DECIMALS: usize = 8;

/// Length of one block-summary window
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Transactions per page in `/txs` listings
pub const DEFAULT_TX_PAGE_SIZE: usize = 10;

/// Check if a height refers to a block on the chain (as opposed to the mempool)
#[inline]
pub fn is_chain_height(height: i32) -> bool {
    height >= HEIGHT_GENESIS
}

/// Check if a transaction at `height` counts as unconfirmed against `best_height`.
///
/// The node reports a transaction as settled only once a block has been
/// mined on top of the block containing it, so the tip block itself is
/// still "unconfirmed" for balance purposes.
#[inline]
pub fn is_unconfirmed_height(height: i32, best_height: i32) -> bool {
    !is_chain_height(height) || height == best_height
}
