// Explorer Flow Tests
//
// End-to-end request flows over an in-memory chain: node lookups,
// aggregation and the not-found paths the HTTP layer relies on.

#[cfg(test)]
mod explorer_tests {
    use crate::address::{AddressQueryOptions, AddressTotal};
    use crate::blocks::DayWindow;
    use crate::error::ExplorerError;
    use crate::explorer::Explorer;
    use crate::memory_node::tests::{
        block, coinbase_tx, hash, sample_node, spend_tx, ADDR_A, ADDR_B, ADDR_C,
    };
    use crate::memory_node::MemoryNode;
    use crate::node::ChainSource;
    use bitcoin::network::constants::Network;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn explorer(node: MemoryNode) -> Explorer {
        Explorer::new(Arc::new(node), Network::Testnet)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    /// A receives a single 280000 satoshi output in a buried block
    fn single_payment_node() -> MemoryNode {
        let mut node = MemoryNode::new(Network::Testnet);
        node.push_block(block(0, 1_492_819_200, vec![coinbase_tx(1, ADDR_C, 5_000_000_000)]));
        node.push_block(block(
            1,
            1_492_819_800,
            vec![
                coinbase_tx(2, ADDR_C, 5_000_000_000),
                spend_tx(3, &[(hash(1), 0)], &[(ADDR_A, 280_000), (ADDR_C, 4_999_710_000)]),
            ],
        ));
        node.push_block(block(2, 1_492_820_400, vec![coinbase_tx(4, ADDR_C, 5_000_000_000)]));
        node
    }

    #[tokio::test]
    async fn test_single_received_output_summary() {
        let explorer = explorer(single_payment_node());
        let summary = explorer
            .address_summary(ADDR_A, &AddressQueryOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.balance, 0.0028);
        assert_eq!(summary.balance_sat, 280_000);
        assert_eq!(summary.total_sent, 0.0);
        assert_eq!(summary.unconfirmed_balance, 0.0);
        assert_eq!(summary.unconfirmed_tx_apperances, 0);
        assert_eq!(summary.tx_apperances, 1);
        assert_eq!(summary.transactions, Some(vec![hash(3)]));
    }

    #[tokio::test]
    async fn test_change_address_balance_identity() {
        let explorer = explorer(single_payment_node());
        let summary = explorer
            .address_summary(ADDR_C, &AddressQueryOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.balance_sat, summary.total_received_sat - summary.total_sent_sat);
        assert_eq!(summary.total_sent_sat, 5_000_000_000);
        // Tip coinbase is still unconfirmed
        assert_eq!(summary.unconfirmed_tx_apperances, 1);
        assert_eq!(summary.unconfirmed_balance_sat, 5_000_000_000);
    }

    #[tokio::test]
    async fn test_unknown_address_is_not_found() {
        let explorer = explorer(sample_node());
        let err = explorer
            .address_summary("2MwWuogJYiB8UbuKwLqWeUMMQtjQ2cVqP9f", &AddressQueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExplorerError::NoTransactions(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_address_totals() {
        let explorer = explorer(sample_node());
        let received = explorer.address_total(ADDR_B, AddressTotal::TotalReceived).await.unwrap();
        assert_eq!(received, 4_999_980_000);
        assert_eq!(explorer.address_total(ADDR_B, AddressTotal::TotalSent).await.unwrap(), 0);
        let unconfirmed = explorer
            .address_total(ADDR_B, AddressTotal::UnconfirmedBalance)
            .await
            .unwrap();
        assert_eq!(unconfirmed, 1_999_980_000);
        assert_eq!(
            explorer
                .address_total("2MwWuogJYiB8UbuKwLqWeUMMQtjQ2cVqP9f", AddressTotal::Balance)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_transaction_flow() {
        let explorer = explorer(sample_node());
        let tx = explorer.transaction(&hash(3)).await.unwrap();
        assert_eq!(tx.txid, hash(3));
        assert_eq!(tx.vout[1].spent_tx_id, Some(hash(5)));
        assert_eq!(tx.vout[1].spent_index, Some(0));

        let err = explorer.transaction(&hash(88)).await.unwrap_err();
        assert!(matches!(err, ExplorerError::TransactionNotFound(_)));
    }

    #[tokio::test]
    async fn test_transactions_by_block_pages() {
        let node = sample_node();
        let block_hash = node.block_hash_at(1).await.unwrap().unwrap();
        let explorer = explorer(node).with_tx_page_size(1);

        let first = explorer.transactions_by_block(&block_hash, 0).await.unwrap();
        assert_eq!(first.pages_total, 2);
        assert_eq!(first.txs.len(), 1);
        assert_eq!(first.txs[0].txid, hash(2));

        let second = explorer.transactions_by_block(&block_hash, 1).await.unwrap();
        assert_eq!(second.txs[0].txid, hash(3));

        let past_end = explorer.transactions_by_block(&block_hash, 5).await.unwrap();
        assert!(past_end.txs.is_empty());
        assert_eq!(past_end.pages_total, 2);

        let err = explorer.transactions_by_block(&hash(99), 0).await.unwrap_err();
        assert!(matches!(err, ExplorerError::BlockNotFound(_)));
    }

    #[tokio::test]
    async fn test_transactions_by_address() {
        let explorer = explorer(sample_node());
        let page = explorer.transactions_by_address(ADDR_A, 0).await.unwrap();
        assert_eq!(page.pages_total, 1);
        let ids: Vec<_> = page.txs.iter().map(|tx| tx.txid).collect();
        assert_eq!(ids, vec![hash(1), hash(3), hash(5)]);

        let empty = explorer.transactions_by_address(ADDR_C, 3).await.unwrap();
        assert!(empty.txs.is_empty());
    }

    #[tokio::test]
    async fn test_utxo_flow() {
        let explorer = explorer(sample_node());
        let utxos = explorer.utxos(&[ADDR_B.to_string()]).await.unwrap();

        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].txid, hash(3));
        assert_eq!(utxos[0].confirmations, 2);
        assert_eq!(utxos[0].satoshis, 3_000_000_000);
        assert_eq!(utxos[1].txid, hash(5));
        assert_eq!(utxos[1].confirmations, 0);

        assert!(explorer.utxos(&[ADDR_A.to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_block_summaries_busy_day() {
        let window = DayWindow::for_date(NaiveDate::from_ymd_opt(2017, 4, 22).unwrap());
        let mut node = MemoryNode::new(Network::Testnet);
        // Last block of the previous day, then 126 blocks on the day itself
        node.push_block(block(0, (window.from - 30) as u32, vec![coinbase_tx(1, ADDR_C, 1)]));
        for i in 1..=126u8 {
            let time = (window.from + i as i64 * 680) as u32;
            node.push_block(block(i, time, vec![coinbase_tx(i.wrapping_add(1), ADDR_C, 1)]));
        }

        let explorer = explorer(node);
        let page = explorer
            .block_summaries(Some(window.date), Some(10), today())
            .await
            .unwrap();

        assert_eq!(page.length, 10);
        assert_eq!(page.blocks[0].height, 126);
        assert_eq!(page.blocks[9].height, 117);
        assert!(page.pagination.more);
        assert_eq!(page.pagination.more_ts, Some(window.to));

        let all = explorer.block_summaries(Some(window.date), None, today()).await.unwrap();
        assert_eq!(all.length, 126);
        assert!(!all.pagination.more);
    }

    #[tokio::test]
    async fn test_block_detail_and_index() {
        let node = sample_node();
        let genesis = node.block_hash_at(0).await.unwrap().unwrap();
        let second = node.block_hash_at(1).await.unwrap().unwrap();
        let explorer = explorer(node);

        assert_eq!(explorer.block_hash(0).await.unwrap(), genesis);
        assert!(matches!(
            explorer.block_hash(3).await.unwrap_err(),
            ExplorerError::BlockNotFound(_)
        ));

        let detail = explorer.block_detail(&genesis).await.unwrap();
        assert_eq!(detail.height, 0);
        assert_eq!(detail.confirmations, 3);
        assert_eq!(detail.previousblockhash, None);
        assert_eq!(detail.nextblockhash, Some(second));
        assert!(detail.is_main_chain);
        assert_eq!(detail.difficulty, 1.0);
        assert_eq!(detail.reward, 50.0);
    }

    #[tokio::test]
    async fn test_status_flows() {
        let explorer = explorer(sample_node());
        let info = explorer.info().await.unwrap().info;
        assert_eq!(info.blocks, 3);
        assert!(info.testnet);
        assert_eq!(info.network, "testnet");
        assert_eq!(info.relayfee, 0.00001);
        assert_eq!(info.difficulty, 1.0);

        let best = explorer.best_block_hash().await.unwrap();
        assert_eq!(best, hash(202));

        let sync = explorer.sync_status().await.unwrap();
        assert_eq!(sync.status, "finished");
        assert_eq!(sync.sync_percentage, 100.0);
        assert_eq!(sync.block_chain_height, 2);
    }

    #[tokio::test]
    async fn test_empty_chain_status() {
        let explorer = explorer(MemoryNode::new(Network::Testnet));
        assert_eq!(explorer.difficulty().await.unwrap(), 0.0);
        assert!(explorer.best_block_hash().await.unwrap_err().is_not_found());
        assert_eq!(explorer.info().await.unwrap().info.blocks, 0);
    }
}
