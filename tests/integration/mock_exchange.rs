//! Mock exchange for integration testing.
//!
//! Provides deterministic `MarketData` and `OrderGateway` implementations
//! that serve fixed quotes, record every order, and can be told to reject
//! one side. All in-memory with no external dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arbwatch::exchange::{MarketData, OrderGateway};
use arbwatch::notify::Notifier;
use arbwatch::types::*;

/// A mock exchange for deterministic testing.
///
/// Quotes, balance and failure injection are controllable from test code.
pub struct MockExchange {
    quotes: Mutex<HashMap<String, Quote>>,
    balance: Mutex<Balance>,
    orders: Mutex<Vec<OrderRequest>>,
    /// Orders on this side are rejected.
    reject_side: Mutex<Option<OrderSide>>,
    balance_error: Mutex<Option<String>>,
}

impl MockExchange {
    pub fn new() -> Self {
        let mut balance = Balance::new();
        balance.insert("ZUSD".to_string(), dec!(250));
        balance.insert("XXBT".to_string(), Decimal::ZERO);
        Self {
            quotes: Mutex::new(HashMap::new()),
            balance: Mutex::new(balance),
            orders: Mutex::new(Vec::new()),
            reject_side: Mutex::new(None),
            balance_error: Mutex::new(None),
        }
    }

    /// Builder-style quote setup.
    pub fn with_quote(self, symbol: &str, bid: Decimal, ask: Decimal) -> Self {
        self.set_quote(symbol, bid, ask);
        self
    }

    pub fn set_quote(&self, symbol: &str, bid: Decimal, ask: Decimal) {
        let last = (bid + ask) / dec!(2);
        self.quotes
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Quote::new(symbol, bid, ask, last));
    }

    pub fn reject(&self, side: OrderSide) {
        *self.reject_side.lock().unwrap() = Some(side);
    }

    pub fn fail_balance(&self, msg: &str) {
        *self.balance_error.lock().unwrap() = Some(msg.to_string());
    }

    /// All orders received so far, rejected ones included.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for MockExchange {
    async fn get_quote(&self, symbol: &str) -> Option<Quote> {
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .filter(|q| q.is_usable())
            .cloned()
    }

    async fn get_balance(&self) -> Result<Balance> {
        if let Some(msg) = self.balance_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.balance.lock().unwrap().clone())
    }
}

#[async_trait]
impl OrderGateway for MockExchange {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ArbError> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());

        if *self.reject_side.lock().unwrap() == Some(order.side) {
            return Err(ArbError::OrderRejected {
                symbol: order.symbol.clone(),
                side: order.side,
                message: "EOrder:Insufficient funds".to_string(),
            });
        }

        Ok(OrderReceipt {
            txids: vec![format!("MOCK-{}", orders.len())],
            description: format!("{} {} {} @ market", order.side.as_str(), order.volume, order.symbol),
        })
    }
}

/// Collects every message in send order.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn any_contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) {
        self.sent.lock().unwrap().push(text.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_quotes() {
        let ex = MockExchange::new().with_quote("PEPEUSD", dec!(100), dec!(103));
        let q = ex.get_quote("PEPEUSD").await.unwrap();
        assert_eq!(q.ask, dec!(103));
        assert!(ex.get_quote("XBTUSD").await.is_none());
    }

    #[tokio::test]
    async fn test_mock_zero_bid_is_unavailable() {
        let ex = MockExchange::new().with_quote("DUSTUSD", dec!(0), dec!(1));
        assert!(ex.get_quote("DUSTUSD").await.is_none());
    }

    #[tokio::test]
    async fn test_mock_orders_recorded() {
        let ex = MockExchange::new();
        let buy = OrderRequest::market("PEPEUSD", OrderSide::Buy, dec!(0.5));
        let receipt = ex.place_order(&buy).await.unwrap();
        assert_eq!(receipt.txids, vec!["MOCK-1".to_string()]);
        assert_eq!(ex.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_reject_side() {
        let ex = MockExchange::new();
        ex.reject(OrderSide::Sell);
        let buy = OrderRequest::market("PEPEUSD", OrderSide::Buy, dec!(0.5));
        let sell = OrderRequest::market("PEPEUSD", OrderSide::Sell, dec!(0.5));
        assert!(ex.place_order(&buy).await.is_ok());
        assert!(ex.place_order(&sell).await.is_err());
        assert_eq!(ex.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_balance_error() {
        let ex = MockExchange::new();
        assert_eq!(ex.get_balance().await.unwrap()["ZUSD"], dec!(250));
        ex.fail_balance("EAPI:Invalid key");
        assert!(ex.get_balance().await.is_err());
    }
}
