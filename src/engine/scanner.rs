//! Opportunity scanner.
//!
//! Walks the configured cycles and symbol universe, pulls quotes through
//! `MarketData`, and classifies what it finds:
//!
//! - **Triangular**: `forward_rate = ask(leg1) * bid(leg2) * bid(leg3)`,
//!   `profit_pct = (1 / forward_rate - 1) * 100`, kept when above the
//!   profit threshold. Each cycle is walked in its one configured
//!   direction only; reversed or re-ordered legs are not searched.
//! - **Spread**: `spread_pct = (ask - bid) / bid * 100`, net of the
//!   round-trip taker fee. Viable when the net clears the profit
//!   threshold, watch when only the gross clears the alert threshold.
//!
//! Unavailable quotes skip the symbol or cycle; they are never errors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::StrategyConfig;
use crate::engine::session::SessionReport;
use crate::exchange::MarketData;
use crate::types::{Cycle, Opportunity, Quote};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Percent-unit thresholds (1.0 = 1%) plus the notional used for
/// profit estimates.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub min_profit_threshold_pct: Decimal,
    pub min_spread_alert_pct: Decimal,
    pub fee_round_trip_pct: Decimal,
    pub position_notional: Decimal,
}

impl From<&StrategyConfig> for Thresholds {
    fn from(cfg: &StrategyConfig) -> Self {
        Self {
            min_profit_threshold_pct: cfg.min_profit_threshold_pct,
            min_spread_alert_pct: cfg.min_spread_alert_pct,
            fee_round_trip_pct: cfg.fee_round_trip_pct,
            position_notional: cfg.position_notional,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&StrategyConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Pure evaluation
// ---------------------------------------------------------------------------

/// Evaluate one cycle against its three leg quotes (in leg order).
///
/// Returns `None` when the cycle is not profitable enough or when a
/// price makes the rate meaningless.
pub fn evaluate_cycle(
    cycle: &Cycle,
    quotes: [&Quote; 3],
    min_profit_threshold_pct: Decimal,
    now: DateTime<Utc>,
) -> Option<Opportunity> {
    if quotes.iter().any(|q| !q.is_usable()) {
        return None;
    }

    let forward_rate = quotes[0].ask.checked_mul(quotes[1].bid)?.checked_mul(quotes[2].bid)?;
    let profit_pct = Decimal::ONE
        .checked_div(forward_rate)?
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)?;

    if profit_pct <= min_profit_threshold_pct {
        return None;
    }

    Some(Opportunity::Triangular {
        cycle: cycle.clone(),
        path: cycle.to_string(),
        forward_rate,
        profit_pct,
        timestamp: now,
    })
}

/// Classify one quote as viable, watch, or nothing.
pub fn classify_spread(
    quote: &Quote,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Option<Opportunity> {
    if !quote.is_usable() {
        return None;
    }
    let spread_pct = quote.spread_pct()?;
    let net_profit_pct = spread_pct.checked_sub(thresholds.fee_round_trip_pct)?;

    if net_profit_pct >= thresholds.min_profit_threshold_pct {
        let estimated_profit_amount = net_profit_pct
            .checked_div(Decimal::ONE_HUNDRED)?
            .checked_mul(thresholds.position_notional)?;
        Some(Opportunity::SpreadViable {
            symbol: quote.symbol.clone(),
            bid: quote.bid,
            ask: quote.ask,
            spread_pct,
            fee_pct: thresholds.fee_round_trip_pct,
            net_profit_pct,
            estimated_profit_amount,
            timestamp: now,
        })
    } else if spread_pct > thresholds.min_spread_alert_pct {
        Some(Opportunity::SpreadWatch {
            symbol: quote.symbol.clone(),
            bid: quote.bid,
            ask: quote.ask,
            spread_pct,
            net_profit_pct,
            timestamp: now,
        })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless scanner. Running counters live in the caller's
/// `SessionReport`.
pub struct OpportunityEngine {
    thresholds: Thresholds,
}

impl OpportunityEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Scan every cycle, in configured order.
    pub async fn scan_triangular(
        &self,
        market: &dyn MarketData,
        cycles: &[Cycle],
        report: &mut SessionReport,
    ) -> Vec<Opportunity> {
        let mut found = Vec::new();

        'cycles: for cycle in cycles {
            let mut quotes = Vec::with_capacity(3);
            for leg in cycle.legs() {
                match market.get_quote(leg).await {
                    Some(q) => quotes.push(q),
                    None => {
                        debug!(cycle = %cycle, leg, "Leg quote unavailable, skipping cycle");
                        report.cycles_skipped += 1;
                        continue 'cycles;
                    }
                }
            }
            report.cycles_evaluated += 1;

            let legs = [&quotes[0], &quotes[1], &quotes[2]];
            if let Some(opp) =
                evaluate_cycle(cycle, legs, self.thresholds.min_profit_threshold_pct, Utc::now())
            {
                info!(opportunity = %opp, "Triangular opportunity");
                report.record_opportunity(&opp);
                found.push(opp);
            }
        }

        info!(
            cycles = cycles.len(),
            skipped = report.cycles_skipped,
            found = found.len(),
            "Triangular scan complete"
        );
        found
    }

    /// Scan every symbol in the universe. Output keeps universe order.
    pub async fn scan_spreads(
        &self,
        market: &dyn MarketData,
        symbols: &[String],
        report: &mut SessionReport,
    ) -> Vec<Opportunity> {
        let mut found = Vec::new();

        for symbol in symbols {
            let Some(quote) = market.get_quote(symbol).await else {
                debug!(symbol = %symbol, "Quote unavailable, skipping");
                report.quotes_unavailable += 1;
                continue;
            };
            report.symbols_evaluated += 1;

            if let Some(opp) = classify_spread(&quote, &self.thresholds, Utc::now()) {
                info!(opportunity = %opp, "Spread opportunity");
                report.record_opportunity(&opp);
                found.push(opp);
            }
        }

        info!(
            symbols = symbols.len(),
            unavailable = report.quotes_unavailable,
            viable = found.iter().filter(|o| o.is_viable()).count(),
            watch = found.iter().filter(|o| o.is_watch()).count(),
            "Spread scan complete"
        );
        found
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
