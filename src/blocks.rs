// Block Summaries
//
// Groups blocks by UTC calendar day for the `/blocks` listing and maps a
// single block into its detail view.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SECONDS_PER_DAY;
use crate::types::{BlockRecord, Hash256};
use crate::units::satoshi_to_coin;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Always serialized as `{}`; kept for wire compatibility
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolInfo {}

/// Half-open UTC window `[from, to)` covering one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub from: i64,
    pub to: i64,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        let from = Utc.from_utc_datetime(&date.and_time(NaiveTime::default())).timestamp();
        Self {
            date,
            from,
            to: from + SECONDS_PER_DAY,
        }
    }

    /// Window of `date`, or of `today` when no date was requested
    pub fn for_request(date: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self::for_date(date.unwrap_or(today))
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.from && time < self.to
    }
}

/// Parse a `YYYY-MM-DD` block date
pub fn parse_block_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub height: i32,
    pub size: u32,
    pub hash: Hash256,
    pub time: u32,
    pub txlength: usize,
    #[serde(rename = "poolInfo")]
    pub pool_info: PoolInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pagination {
    pub next: Option<String>,
    pub prev: Option<String>,
    #[serde(rename = "currentTs")]
    pub current_ts: i64,
    pub current: String,
    #[serde(rename = "isToday")]
    pub is_today: bool,
    pub more: bool,
    #[serde(rename = "moreTs", skip_serializing_if = "Option::is_none", default)]
    pub more_ts: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BlockSummaryPage {
    pub blocks: Vec<BlockSummary>,
    pub length: usize,
    pub pagination: Pagination,
}

fn summary_of(block: &BlockRecord) -> BlockSummary {
    BlockSummary {
        height: block.height,
        size: block.size,
        hash: block.hash,
        time: block.time,
        txlength: block.txids.len(),
        pool_info: PoolInfo::default(),
    }
}

/// Build one page of day summaries.
///
/// Blocks outside `window` are dropped. The rest are ordered by height,
/// highest first, which is not always time order. When `limit` cuts the
/// list short, `more` is set and `moreTs` carries the window end.
pub fn summarize(
    blocks: &[BlockRecord],
    window: &DayWindow,
    limit: Option<usize>,
    today: NaiveDate,
) -> BlockSummaryPage {
    let mut summaries: Vec<BlockSummary> = blocks
        .iter()
        .filter(|b| window.contains(b.time as i64))
        .map(summary_of)
        .collect();
    summaries.sort_by(|a, b| b.height.cmp(&a.height));

    let more = matches!(limit, Some(limit) if limit < summaries.len());
    if let Some(limit) = limit {
        summaries.truncate(limit);
    }

    let pagination = Pagination {
        next: window.date.succ_opt().map(|d| d.format(DATE_FORMAT).to_string()),
        prev: window.date.pred_opt().map(|d| d.format(DATE_FORMAT).to_string()),
        current_ts: window.to - 1,
        current: window.date.format(DATE_FORMAT).to_string(),
        is_today: window.date == today,
        more,
        more_ts: if more { Some(window.to) } else { None },
    };

    BlockSummaryPage {
        length: summaries.len(),
        blocks: summaries,
        pagination,
    }
}

/// Difficulty from compact target bits, relative to the minimum target
/// `0x1d00ffff`.
pub fn bits_to_difficulty(bits: u32) -> f64 {
    let mantissa = bits & 0x00ff_ffff;
    if mantissa == 0 {
        return 0.0;
    }

    let mut shift = (bits >> 24) & 0xff;
    let mut diff = 0x0000_ffff as f64 / mantissa as f64;

    while shift < 29 {
        diff *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        diff /= 256.0;
        shift -= 1;
    }

    diff
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BlockDetail {
    pub hash: Hash256,
    pub size: u32,
    pub height: i32,
    pub version: i32,
    pub merkleroot: Hash256,
    pub tx: Vec<Hash256>,
    pub time: u32,
    pub nonce: u32,
    /// Compact target as lowercase hex
    pub bits: String,
    pub difficulty: f64,
    pub chainwork: String,
    pub confirmations: u32,
    pub previousblockhash: Option<Hash256>,
    pub nextblockhash: Option<Hash256>,
    pub reward: f64,
    #[serde(rename = "isMainChain")]
    pub is_main_chain: bool,
    #[serde(rename = "poolInfo")]
    pub pool_info: PoolInfo,
}

pub fn map_block(
    block: &BlockRecord,
    next_hash: Option<Hash256>,
    best_height: i32,
    is_main_chain: bool,
) -> BlockDetail {
    BlockDetail {
        hash: block.hash,
        size: block.size,
        height: block.height,
        version: block.version,
        merkleroot: block.merkle_root,
        tx: block.txids.clone(),
        time: block.time,
        nonce: block.nonce,
        bits: format!("{:x}", block.bits),
        difficulty: bits_to_difficulty(block.bits),
        chainwork: block.chainwork.clone(),
        confirmations: (best_height - block.height + 1).max(0) as u32,
        previousblockhash: block.prev_hash,
        nextblockhash: next_hash,
        reward: satoshi_to_coin(block.reward),
        is_main_chain,
        pool_info: PoolInfo::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn april_22() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 4, 22).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn record(height: i32, time: u32) -> BlockRecord {
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&(height as u32).to_le_bytes());
        BlockRecord {
            hash: Hash256::from_storage_bytes(hash),
            height,
            version: 536_870_912,
            merkle_root: Hash256::default(),
            prev_hash: None,
            time,
            bits: 0x1a03_a30c,
            nonce: 0,
            chainwork: String::new(),
            size: 1_000 + height as u32 % 97,
            txids: vec![Hash256::default(); (height % 5 + 1) as usize],
            reward: 78_125_000,
        }
    }

    /// 126 blocks spread over 2017-04-22, shuffled so input order is not height order
    fn busy_day() -> Vec<BlockRecord> {
        let window = DayWindow::for_date(april_22());
        let mut blocks: Vec<BlockRecord> = (0..126)
            .map(|i| record(1_119_454 + i, (window.from + 600 + i as i64 * 680) as u32))
            .collect();
        blocks.reverse();
        blocks.swap(3, 90);
        blocks
    }

    #[test]
    fn test_day_window_bounds() {
        let window = DayWindow::for_date(april_22());
        assert_eq!(window.from, 1_492_819_200);
        assert_eq!(window.to, 1_492_905_600);
        assert!(window.contains(1_492_819_200));
        assert!(!window.contains(1_492_905_600));
    }

    #[test]
    fn test_default_window_is_today() {
        let window = DayWindow::for_request(None, today());
        assert_eq!(window.date, today());
        let page = summarize(&[], &window, None, today());
        assert!(page.pagination.is_today);
        assert_eq!(page.length, 0);
    }

    #[test]
    fn test_parse_block_date() {
        assert_eq!(parse_block_date("2017-04-22"), Some(april_22()));
        assert_eq!(parse_block_date("2017-13-01"), None);
        assert_eq!(parse_block_date("yesterday"), None);
    }

    #[test]
    fn test_limit_truncates_and_sets_more() {
        let window = DayWindow::for_date(april_22());
        let page = summarize(&busy_day(), &window, Some(10), today());

        assert_eq!(page.length, 10);
        assert_eq!(page.blocks.len(), 10);
        assert_eq!(page.blocks[0].height, 1_119_579);
        assert!(page.blocks.windows(2).all(|w| w[0].height > w[1].height));
        assert!(page.pagination.more);
        assert_eq!(page.pagination.more_ts, Some(1_492_905_600));
        assert_eq!(page.pagination.current_ts, 1_492_905_599);
        assert_eq!(page.pagination.current, "2017-04-22");
        assert_eq!(page.pagination.next.as_deref(), Some("2017-04-23"));
        assert_eq!(page.pagination.prev.as_deref(), Some("2017-04-21"));
        assert!(!page.pagination.is_today);
    }

    #[test]
    fn test_no_limit_returns_whole_day() {
        let window = DayWindow::for_date(april_22());
        let page = summarize(&busy_day(), &window, None, today());
        assert_eq!(page.length, 126);
        assert!(!page.pagination.more);

        let json = serde_json::to_value(&page).unwrap();
        assert!(json["pagination"].get("moreTs").is_none());
        assert_eq!(json["pagination"]["more"], false);
        assert_eq!(json["blocks"][0]["poolInfo"], serde_json::json!({}));
    }

    #[test]
    fn test_limit_equal_to_count_is_not_more() {
        let window = DayWindow::for_date(april_22());
        let page = summarize(&busy_day(), &window, Some(126), today());
        assert_eq!(page.length, 126);
        assert!(!page.pagination.more);
        assert_eq!(page.pagination.more_ts, None);
    }

    #[test]
    fn test_blocks_outside_window_dropped() {
        let window = DayWindow::for_date(april_22());
        let blocks = vec![
            record(1, window.from as u32 - 1),
            record(2, window.from as u32),
            record(3, window.to as u32),
        ];
        let page = summarize(&blocks, &window, None, today());
        assert_eq!(page.length, 1);
        assert_eq!(page.blocks[0].height, 2);
    }

    #[test]
    fn test_bits_to_difficulty() {
        assert_eq!(bits_to_difficulty(0x1d00_ffff), 1.0);
        assert!((bits_to_difficulty(0x1b04_04cb) - 16_307.420_938_523_983).abs() < 1e-6);
        assert_eq!(bits_to_difficulty(0x1d00_0000), 0.0);
    }

    #[test]
    fn test_map_block() {
        let block = record(100, 1_492_819_300);
        let next = Hash256::from_storage_bytes([9u8; 32]);
        let detail = map_block(&block, Some(next), 109, true);

        assert_eq!(detail.confirmations, 10);
        assert_eq!(detail.bits, "1a03a30c");
        assert_eq!(detail.reward, 0.78125);
        assert_eq!(detail.nextblockhash, Some(next));
        assert_eq!(detail.tx.len(), 1);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["isMainChain"], true);
        assert!(json["previousblockhash"].is_null());
    }
}
