//! Crate-wide error type.
//!
//! Not-found conditions are kept apart from integrity failures so the HTTP
//! layer can answer 404 for the former and 500 for the latter.

use crate::types::{Hash256, OutPoint};

#[derive(Debug)]
pub enum ExplorerError {
    /// No transaction with this id is known to the node
    TransactionNotFound(Hash256),
    /// No block with this hash or height is known to the node
    BlockNotFound(String),
    /// Address is well-formed but the node has no activity for it
    NoTransactions(String),
    /// An input references an output the coin view cannot produce
    MissingPrevout { txid: Hash256, prevout: OutPoint },
    InvalidHash(String),
    Snapshot(String),
    Config(String),
    /// Failure reported by the node collaborator, passed through unchanged
    Node(String),
}

impl ExplorerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExplorerError::TransactionNotFound(_)
                | ExplorerError::BlockNotFound(_)
                | ExplorerError::NoTransactions(_)
        )
    }
}

impl std::fmt::Display for ExplorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExplorerError::TransactionNotFound(_) => write!(f, "Tx not found"),
            ExplorerError::BlockNotFound(_) => write!(f, "Block not found"),
            ExplorerError::NoTransactions(_) => write!(f, "No transactions on address"),
            ExplorerError::MissingPrevout { txid, prevout } => write!(
                f,
                "Missing previous output {}:{} of tx {}",
                prevout.txid, prevout.vout, txid
            ),
            ExplorerError::InvalidHash(s) => write!(f, "Invalid hash: {}", s),
            ExplorerError::Snapshot(s) => write!(f, "Snapshot error: {}", s),
            ExplorerError::Config(s) => write!(f, "Config error: {}", s),
            ExplorerError::Node(s) => write!(f, "Node error: {}", s),
        }
    }
}

impl std::error::Error for ExplorerError {}

impl From<std::io::Error> for ExplorerError {
    fn from(e: std::io::Error) -> Self {
        ExplorerError::Snapshot(e.to_string())
    }
}

impl From<serde_json::Error> for ExplorerError {
    fn from(e: serde_json::Error) -> Self {
        ExplorerError::Snapshot(e.to_string())
    }
}

impl From<config::ConfigError> for ExplorerError {
    fn from(e: config::ConfigError) -> Self {
        ExplorerError::Config(e.to_string())
    }
}
