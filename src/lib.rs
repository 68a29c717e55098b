//! ARBWATCH: Kraken spread and triangular arbitrage watcher
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod engine;
pub mod exchange;
pub mod notify;
pub mod storage;
pub mod types;
