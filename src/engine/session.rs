//! Session bookkeeping.
//!
//! `SessionReport` carries every running counter of one pass (quotes
//! skipped, opportunities found, trades attempted and their outcomes).
//! It is threaded through the scanner and runner by `&mut` reference.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::{error, info};
use uuid::Uuid;

use crate::types::{Opportunity, TradeOutcome, TradeState};

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub cycles_evaluated: u32,
    pub cycles_skipped: u32,
    pub symbols_evaluated: u32,
    pub quotes_unavailable: u32,
    /// Viable spread opportunities.
    pub opportunities_found: u32,
    pub triangular_found: u32,
    pub watch_found: u32,
    pub trades_attempted: u32,
    pub trades_executed: u32,
    pub trades_failed: u32,
    pub open_exposures: u32,
    pub realized_profit: Decimal,
    pub outcomes: Vec<TradeOutcome>,
}

impl SessionReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            cycles_evaluated: 0,
            cycles_skipped: 0,
            symbols_evaluated: 0,
            quotes_unavailable: 0,
            opportunities_found: 0,
            triangular_found: 0,
            watch_found: 0,
            trades_attempted: 0,
            trades_executed: 0,
            trades_failed: 0,
            open_exposures: 0,
            realized_profit: Decimal::ZERO,
            outcomes: Vec::new(),
        }
    }

    pub fn record_opportunity(&mut self, opp: &Opportunity) {
        match opp {
            Opportunity::Triangular { .. } => self.triangular_found += 1,
            Opportunity::SpreadViable { .. } => self.opportunities_found += 1,
            Opportunity::SpreadWatch { .. } => self.watch_found += 1,
        }
    }

    pub fn record_trade(&mut self, outcome: TradeOutcome) {
        self.trades_attempted += 1;
        if outcome.success {
            self.trades_executed += 1;
            self.realized_profit += outcome.realized_profit;
            info!(outcome = %outcome, "Trade closed");
        } else {
            self.trades_failed += 1;
            if outcome.state == TradeState::OpenExposure {
                self.open_exposures += 1;
                error!(outcome = %outcome, "Trade left an open position");
            } else {
                info!(outcome = %outcome, "Trade aborted");
            }
        }
        self.outcomes.push(outcome);
    }

    /// Whether another attempt fits under `max_attempts`.
    pub fn has_trade_budget(&self, max_attempts: u32) -> bool {
        self.trades_attempted < max_attempts
    }

}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run {}: cycles={} (skipped {}) symbols={} (unavailable {}) viable={} watch={} triangular={} trades={}/{} open={} pnl=${:.2}",
            self.run_id,
            self.cycles_evaluated,
            self.cycles_skipped,
            self.symbols_evaluated,
            self.quotes_unavailable,
            self.opportunities_found,
            self.watch_found,
            self.triangular_found,
            self.trades_executed,
            self.trades_attempted,
            self.open_exposures,
            self.realized_profit,
        )
    }
}
