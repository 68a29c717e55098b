//! Exchange integrations.
//!
//! Defines the `MarketData` and `OrderGateway` traits the engine depends on,
//! and provides the Kraken REST implementation of both.

pub mod kraken;

use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::types::{ArbError, Balance, OrderReceipt, OrderRequest, Quote};

/// Read side of an exchange: quotes and account balance.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current top-of-book for `symbol`.
    ///
    /// Never fails: transient errors, unknown pairs and unusable prices
    /// all come back as `None` so callers can skip the symbol.
    async fn get_quote(&self, symbol: &str) -> Option<Quote>;

    /// Balances by currency (private endpoint).
    async fn get_balance(&self) -> Result<Balance>;
}

/// Write side of an exchange: single-order placement.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit one order. Market order when `limit_price` is `None`.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ArbError>;
}
