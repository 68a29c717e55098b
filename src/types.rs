//! Shared types for the ARBWATCH bot.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that exchange, notifier,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// Top-of-book snapshot for one trading pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bid={} ask={} last={}",
            self.symbol, self.bid, self.ask, self.last
        )
    }
}

impl Quote {
    pub fn new(symbol: &str, bid: Decimal, ask: Decimal, last: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            bid,
            ask,
            last,
        }
    }

    /// Both sides strictly positive. Anything else is treated as unavailable.
    pub fn is_usable(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > Decimal::ZERO
    }

    /// `(ask - bid) / bid * 100`. `None` when the bid is not positive or
    /// the result does not fit in a `Decimal`.
    pub fn spread_pct(&self) -> Option<Decimal> {
        if self.bid <= Decimal::ZERO {
            return None;
        }
        self.ask
            .checked_sub(self.bid)?
            .checked_div(self.bid)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// Closed three-leg conversion path, e.g. XBTUSD -> ETHXBT -> ETHUSD.
///
/// Walked in one fixed direction: buy leg 1 at the ask, then sell legs 2
/// and 3 at the bid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cycle {
    pub leg1: String,
    pub leg2: String,
    pub leg3: String,
}

impl Cycle {
    pub fn new(leg1: &str, leg2: &str, leg3: &str) -> Self {
        Self {
            leg1: leg1.to_string(),
            leg2: leg2.to_string(),
            leg3: leg3.to_string(),
        }
    }

    pub fn legs(&self) -> [&str; 3] {
        [&self.leg1, &self.leg2, &self.leg3]
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} -> {}", self.leg1, self.leg2, self.leg3)
    }
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

/// A detected opportunity. Immutable snapshot, one per evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Opportunity {
    Triangular {
        cycle: Cycle,
        path: String,
        forward_rate: Decimal,
        profit_pct: Decimal,
        timestamp: DateTime<Utc>,
    },
    SpreadViable {
        symbol: String,
        bid: Decimal,
        ask: Decimal,
        spread_pct: Decimal,
        fee_pct: Decimal,
        net_profit_pct: Decimal,
        estimated_profit_amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Spread above the alert threshold but not profitable after fees.
    SpreadWatch {
        symbol: String,
        bid: Decimal,
        ask: Decimal,
        spread_pct: Decimal,
        net_profit_pct: Decimal,
        timestamp: DateTime<Utc>,
    },
}

impl Opportunity {
    pub fn is_viable(&self) -> bool {
        matches!(self, Opportunity::SpreadViable { .. })
    }

    pub fn is_watch(&self) -> bool {
        matches!(self, Opportunity::SpreadWatch { .. })
    }

    /// Trading pair for spread opportunities.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Opportunity::Triangular { .. } => None,
            Opportunity::SpreadViable { symbol, .. } | Opportunity::SpreadWatch { symbol, .. } => {
                Some(symbol)
            }
        }
    }

    pub fn net_profit_pct(&self) -> Option<Decimal> {
        match self {
            Opportunity::Triangular { .. } => None,
            Opportunity::SpreadViable { net_profit_pct, .. }
            | Opportunity::SpreadWatch { net_profit_pct, .. } => Some(*net_profit_pct),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Opportunity::Triangular { timestamp, .. }
            | Opportunity::SpreadViable { timestamp, .. }
            | Opportunity::SpreadWatch { timestamp, .. } => *timestamp,
        }
    }

    /// Short tag used in alert messages and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Opportunity::Triangular { .. } => "triangular",
            Opportunity::SpreadViable { .. } => "spread_viable",
            Opportunity::SpreadWatch { .. } => "spread_watch",
        }
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opportunity::Triangular {
                path, profit_pct, ..
            } => write!(f, "[triangular] {path} profit={profit_pct:.3}%"),
            Opportunity::SpreadViable {
                symbol,
                spread_pct,
                net_profit_pct,
                estimated_profit_amount,
                ..
            } => write!(
                f,
                "[viable] {symbol} spread={spread_pct:.3}% net={net_profit_pct:.3}% est=${estimated_profit_amount:.2}"
            ),
            Opportunity::SpreadWatch {
                symbol,
                spread_pct,
                net_profit_pct,
                ..
            } => write!(
                f,
                "[watch] {symbol} spread={spread_pct:.3}% net={net_profit_pct:.3}%"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A single order. Market order unless `limit_price` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: Decimal,
    pub limit_price: Option<Decimal>,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, volume: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            volume,
            limit_price: None,
        }
    }

    pub fn limit(symbol: &str, side: OrderSide, volume: Decimal, price: Decimal) -> Self {
        Self {
            limit_price: Some(price),
            ..Self::market(symbol, side, volume)
        }
    }

    pub fn order_type(&self) -> &'static str {
        if self.limit_price.is_some() {
            "limit"
        } else {
            "market"
        }
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit_price {
            Some(p) => write!(f, "{} {} {} @ {} (limit)", self.side, self.volume, self.symbol, p),
            None => write!(f, "{} {} {} (market)", self.side, self.volume, self.symbol),
        }
    }
}

/// Exchange acknowledgement of an accepted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub txids: Vec<String>,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Two-leg trade lifecycle.
///
/// `Idle -> BoughtPending -> Closed | OpenExposure`, or `Idle -> Aborted`
/// when nothing was bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    Idle,
    BoughtPending,
    Closed,
    OpenExposure,
    Aborted,
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeState::Idle => write!(f, "idle"),
            TradeState::BoughtPending => write!(f, "bought, sell pending"),
            TradeState::Closed => write!(f, "closed"),
            TradeState::OpenExposure => write!(f, "OPEN EXPOSURE"),
            TradeState::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result of one buy-then-sell attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub symbol: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub volume: Decimal,
    pub realized_profit: Decimal,
    pub success: bool,
    pub error: Option<String>,
    pub state: TradeState,
    pub buy_txids: Vec<String>,
    pub sell_txids: Vec<String>,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vol={} buy={} sell={} pnl=${:.2} [{}]",
            self.symbol,
            self.volume,
            self.buy_price,
            self.sell_price,
            self.realized_profit,
            self.state,
        )?;
        if let Some(err) = &self.error {
            write!(f, " error: {err}")?;
        }
        Ok(())
    }
}

/// Account balance by currency code.
pub type Balance = BTreeMap<String, Decimal>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ARBWATCH.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArbError {
    #[error("Data unavailable for {0}")]
    DataUnavailable(String),

    #[error("Order rejected ({side} {symbol}): {message}")]
    OrderRejected {
        symbol: String,
        side: OrderSide,
        message: String,
    },

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid trade transition: {from} -> {to}")]
    InvalidTransition { from: TradeState, to: TradeState },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
