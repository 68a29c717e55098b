//! Trade decision and execution.
//!
//! `decide` is the pure alert-or-trade gate. `TradeExecutor` runs the
//! buy-then-sell sequence through a `TradeSequence` state machine:
//!
//! ```text
//! Idle ──buy ok──▶ BoughtPending ──sell ok──▶ Closed
//!  │                    │
//!  └─fail─▶ Aborted     └─sell fail─▶ OpenExposure
//! ```
//!
//! The two legs are independent exchange calls. Nothing makes them
//! atomic; a failed sell after a filled buy leaves a held position and
//! is escalated as `OpenExposure`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::TradingConfig;
use crate::exchange::{MarketData, OrderGateway};
use crate::notify::{messages, Notifier};
use crate::types::{
    ArbError, Opportunity, OrderReceipt, OrderRequest, OrderSide, Quote, TradeOutcome, TradeState,
};

/// Kraken accepts at most 8 decimal places of volume.
pub const VOLUME_DECIMALS: u32 = 8;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TradingPolicy {
    pub enabled: bool,
    /// Net-profit bar for trading; at least the alert/profit threshold.
    pub min_spread_to_trade_pct: Decimal,
}

impl From<&TradingConfig> for TradingPolicy {
    fn from(cfg: &TradingConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            min_spread_to_trade_pct: cfg.min_spread_to_trade_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    AlertOnly,
    AttemptTrade,
}

/// Only viable spreads at or above the trade bar are traded, and only
/// with trading enabled.
pub fn decide(opp: &Opportunity, policy: &TradingPolicy) -> Decision {
    if !policy.enabled {
        return Decision::AlertOnly;
    }
    match opp {
        Opportunity::SpreadViable { net_profit_pct, .. }
            if *net_profit_pct >= policy.min_spread_to_trade_pct =>
        {
            Decision::AttemptTrade
        }
        _ => Decision::AlertOnly,
    }
}

/// `notional / ask`, truncated to `VOLUME_DECIMALS` so the order never
/// exceeds the notional. `None` for a non-positive ask.
pub fn order_volume(notional: Decimal, ask: Decimal) -> Option<Decimal> {
    if ask <= Decimal::ZERO {
        return None;
    }
    let raw = notional.checked_div(ask)?;
    Some(raw.round_dp_with_strategy(VOLUME_DECIMALS, RoundingStrategy::ToZero))
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// One buy/sell attempt. Transitions are checked; anything off the
/// diagram is an `ArbError::InvalidTransition`.
#[derive(Debug, Clone)]
pub struct TradeSequence {
    symbol: String,
    state: TradeState,
    volume: Decimal,
    buy_price: Decimal,
    sell_price: Decimal,
    buy_txids: Vec<String>,
    sell_txids: Vec<String>,
    error: Option<String>,
}

impl TradeSequence {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            state: TradeState::Idle,
            volume: Decimal::ZERO,
            buy_price: Decimal::ZERO,
            sell_price: Decimal::ZERO,
            buy_txids: Vec::new(),
            sell_txids: Vec::new(),
            error: None,
        }
    }

    pub fn state(&self) -> TradeState {
        self.state
    }

    fn transition(&mut self, from: TradeState, to: TradeState) -> Result<(), ArbError> {
        if self.state != from {
            return Err(ArbError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Fix the prices and volume for this attempt. Only while idle.
    pub fn price(&mut self, quote: &Quote, volume: Decimal) -> Result<(), ArbError> {
        if self.state != TradeState::Idle {
            return Err(ArbError::InvalidTransition {
                from: self.state,
                to: TradeState::Idle,
            });
        }
        self.buy_price = quote.ask;
        self.sell_price = quote.bid;
        self.volume = volume;
        Ok(())
    }

    pub fn abort(&mut self, reason: String) -> Result<(), ArbError> {
        self.transition(TradeState::Idle, TradeState::Aborted)?;
        self.error = Some(reason);
        Ok(())
    }

    pub fn bought(&mut self, receipt: OrderReceipt) -> Result<(), ArbError> {
        self.transition(TradeState::Idle, TradeState::BoughtPending)?;
        self.buy_txids = receipt.txids;
        Ok(())
    }

    pub fn sold(&mut self, receipt: OrderReceipt) -> Result<(), ArbError> {
        self.transition(TradeState::BoughtPending, TradeState::Closed)?;
        self.sell_txids = receipt.txids;
        Ok(())
    }

    pub fn sell_failed(&mut self, reason: String) -> Result<(), ArbError> {
        self.transition(TradeState::BoughtPending, TradeState::OpenExposure)?;
        self.error = Some(reason);
        Ok(())
    }

    /// `(sell - buy) * volume` once closed, zero otherwise.
    pub fn realized_profit(&self) -> Decimal {
        if self.state == TradeState::Closed {
            (self.sell_price - self.buy_price) * self.volume
        } else {
            Decimal::ZERO
        }
    }

    pub fn into_outcome(self) -> TradeOutcome {
        TradeOutcome {
            realized_profit: self.realized_profit(),
            success: self.state == TradeState::Closed,
            symbol: self.symbol,
            buy_price: self.buy_price,
            sell_price: self.sell_price,
            volume: self.volume,
            error: self.error,
            state: self.state,
            buy_txids: self.buy_txids,
            sell_txids: self.sell_txids,
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct TradeExecutor {
    market: Arc<dyn MarketData>,
    gateway: Arc<dyn OrderGateway>,
    notifier: Arc<dyn Notifier>,
    position_notional: Decimal,
    settle_delay: Duration,
}

impl TradeExecutor {
    pub fn new(
        market: Arc<dyn MarketData>,
        gateway: Arc<dyn OrderGateway>,
        notifier: Arc<dyn Notifier>,
        position_notional: Decimal,
        settle_delay: Duration,
    ) -> Self {
        Self {
            market,
            gateway,
            notifier,
            position_notional,
            settle_delay,
        }
    }

    /// Run one buy-then-sell attempt on `symbol`.
    ///
    /// Order failures end up in the returned outcome. `Err` is reserved
    /// for state-machine violations.
    pub async fn execute(&self, symbol: &str) -> Result<TradeOutcome, ArbError> {
        let mut seq = TradeSequence::new(symbol);

        // Price may have moved since detection.
        let quote = match self.market.get_quote(symbol).await {
            Some(q) if q.is_usable() => q,
            _ => {
                warn!(symbol, "No fresh quote, trade aborted");
                self.notifier.send(&messages::price_unavailable(symbol)).await;
                seq.abort(format!("price unavailable for {symbol}"))?;
                return Ok(seq.into_outcome());
            }
        };

        let volume = match order_volume(self.position_notional, quote.ask) {
            Some(v) if v > Decimal::ZERO => v,
            _ => {
                warn!(symbol, ask = %quote.ask, "Notional too small for minimum volume");
                seq.abort(format!("volume rounds to zero at ask {}", quote.ask))?;
                return Ok(seq.into_outcome());
            }
        };
        seq.price(&quote, volume)?;

        // Leg 1: buy at the ask.
        self.notifier
            .send(&messages::executing(OrderSide::Buy, volume, symbol, quote.ask))
            .await;
        let buy = OrderRequest::market(symbol, OrderSide::Buy, volume);
        match self.gateway.place_order(&buy).await {
            Ok(receipt) => seq.bought(receipt)?,
            Err(e) => {
                warn!(symbol, error = %e, "Buy leg failed, nothing opened");
                self.notifier
                    .send(&messages::order_failed(OrderSide::Buy, &e.to_string()))
                    .await;
                seq.abort(e.to_string())?;
                return Ok(seq.into_outcome());
            }
        }

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        // Leg 2: sell the same volume at the bid.
        self.notifier
            .send(&messages::executing(OrderSide::Sell, volume, symbol, quote.bid))
            .await;
        let sell = OrderRequest::market(symbol, OrderSide::Sell, volume);
        match self.gateway.place_order(&sell).await {
            Ok(receipt) => {
                seq.sold(receipt)?;
                let profit = seq.realized_profit();
                info!(symbol, volume = %volume, profit = format!("${profit:.2}"), "Trade closed");
                self.notifier
                    .send(&messages::trade_completed(symbol, profit))
                    .await;
            }
            Err(e) => {
                error!(
                    symbol,
                    volume = %volume,
                    error = %e,
                    "SELL FAILED AFTER BUY: position is open"
                );
                self.notifier
                    .send(&messages::open_exposure(symbol, volume, &e.to_string()))
                    .await;
                seq.sell_failed(e.to_string())?;
            }
        }

        Ok(seq.into_outcome())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
