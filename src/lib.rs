//! rustyinsight: insight-api compatible block explorer service.
//!
//! Node data comes in through [`node::ChainSource`]; [`explorer::Explorer`]
//! runs the request flows and [`api::router`] exposes them over HTTP.

pub mod address;
pub mod api;
pub mod blocks;
pub mod config;
pub mod constants;
pub mod error;
pub mod explorer;
pub mod memory_node;
pub mod metrics;
pub mod node;
pub mod script_utils;
pub mod telemetry;
pub mod transactions;
pub mod types;
pub mod units;
pub mod utxo;

mod explorer_tests;
