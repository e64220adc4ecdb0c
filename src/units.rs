// Unit & Byte-Order Utilities
//
// Conversions between minor units (satoshis) and major units (coins), and
// between display-order and storage-order hash hex.

use crate::constants::{COIN, COIN_DECIMALS};
use crate::error::ExplorerError;

/// Convert satoshis to coins for JSON number fields.
///
/// The division of two exact integers rounds to the nearest double, which
/// serializes back to the shortest decimal (280000 → 0.0028).
pub fn satoshi_to_coin(amount: i64) -> f64 {
    amount as f64 / COIN as f64
}

/// Format satoshis as a fixed 8-decimal string.
///
/// # Examples
/// ```
/// use rustyinsight::units::format_amount;
/// assert_eq!(format_amount(100_000_000), "1.00000000");
/// assert_eq!(format_amount(-50_000_000), "-0.50000000");
/// ```
pub fn format_amount(amount: i64) -> String {
    let neg = amount < 0;
    let abs = amount.unsigned_abs();
    let whole = abs / COIN as u64;
    let frac = abs % COIN as u64;
    if neg {
        format!("-{}.{:0width$}", whole, frac, width = COIN_DECIMALS)
    } else {
        format!("{}.{:0width$}", whole, frac, width = COIN_DECIMALS)
    }
}

/// Reverse the byte order of a hex-encoded hash.
///
/// Display order and storage order are each other's reversal, so the same
/// function converts in both directions.
pub fn reverse_hex(hex_str: &str) -> Result<String, ExplorerError> {
    let mut bytes = hex::decode(hex_str)
        .map_err(|e| ExplorerError::InvalidHash(format!("{}: {}", hex_str, e)))?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}
