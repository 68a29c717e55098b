//! Session orchestration.
//!
//! One pass: notify start, fetch balance, scan cycles and spreads,
//! optionally trade, summarise, persist. The "finished" notification
//! goes out whether or not the pass succeeded.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::engine::executor::{decide, Decision, TradeExecutor, TradingPolicy};
use crate::engine::scanner::{OpportunityEngine, Thresholds};
use crate::engine::session::SessionReport;
use crate::exchange::{MarketData, OrderGateway};
use crate::notify::{messages, Notifier};
use crate::storage::{self, RunRecord};
use crate::types::{Balance, Cycle, Opportunity};

pub struct SessionRunner {
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    engine: OpportunityEngine,
    executor: TradeExecutor,
    policy: TradingPolicy,
    cycles: Vec<Cycle>,
    symbols: Vec<String>,
    max_trades_per_run: u32,
    cooldown: Duration,
    results_path: String,
}

impl SessionRunner {
    pub fn new(
        cfg: &AppConfig,
        market: Arc<dyn MarketData>,
        gateway: Arc<dyn OrderGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let thresholds = Thresholds::from(&cfg.strategy);
        let executor = TradeExecutor::new(
            Arc::clone(&market),
            gateway,
            Arc::clone(&notifier),
            thresholds.position_notional,
            cfg.trading.settle_delay(),
        );

        Self {
            market,
            notifier,
            engine: OpportunityEngine::new(thresholds),
            executor,
            policy: TradingPolicy::from(&cfg.trading),
            cycles: cfg.universe.cycles.clone(),
            symbols: cfg.universe.symbols.clone(),
            max_trades_per_run: cfg.trading.max_trades_per_run,
            cooldown: cfg.trading.cooldown(),
            results_path: cfg.storage.results_path.clone(),
        }
    }

    /// Run one full pass.
    ///
    /// Any unexpected error is reported through the notifier and then
    /// returned. The finished notification is sent in both cases.
    pub async fn run(&self) -> Result<SessionReport> {
        let clock = Instant::now();
        let started_at = Utc::now();
        self.notifier.send(&messages::started(started_at)).await;

        let result = self.run_pass(started_at).await;

        if let Err(e) = &result {
            let detail = format!("{e:#}");
            error!(error = %detail, "Session failed");
            self.notifier.send(&messages::error(&detail)).await;
        }

        let elapsed = clock.elapsed();
        info!(
            duration = format!("{:.2}s", elapsed.as_secs_f64()),
            ok = result.is_ok(),
            "Session finished"
        );
        self.notifier.send(&messages::finished(elapsed)).await;

        result
    }

    async fn run_pass(&self, started_at: DateTime<Utc>) -> Result<SessionReport> {
        let mut report = SessionReport::new(started_at);
        info!(
            run_id = %report.run_id,
            symbols = self.symbols.len(),
            cycles = self.cycles.len(),
            trading = self.policy.enabled,
            "Session starting"
        );

        let balance = self.fetch_balance().await;
        self.notifier.send(&messages::balance(&balance)).await;

        // -- Detection ----------------------------------------------------

        let triangular = self
            .engine
            .scan_triangular(self.market.as_ref(), &self.cycles, &mut report)
            .await;
        let spreads = self
            .engine
            .scan_spreads(self.market.as_ref(), &self.symbols, &mut report)
            .await;

        // -- Execution ----------------------------------------------------

        if self.policy.enabled && spreads.iter().any(Opportunity::is_viable) {
            self.notifier.send(&messages::auto_trade_enabled()).await;
            self.trade_eligible(&spreads, &mut report).await?;
        }

        // -- Reporting ----------------------------------------------------

        let thresholds = self.engine.thresholds();
        self.notifier
            .send(&messages::analysis_summary(
                &triangular,
                &spreads,
                thresholds.min_spread_alert_pct,
                thresholds.min_profit_threshold_pct,
            ))
            .await;

        if self.policy.enabled {
            let final_balance = self.fetch_balance().await;
            info!(
                currencies = final_balance.len(),
                pnl = format!("${:.2}", report.realized_profit),
                "Final balance fetched"
            );
            self.notifier
                .send(&messages::session_summary(
                    report.trades_executed,
                    report.open_exposures,
                    true,
                ))
                .await;
        }

        let record = RunRecord {
            run_id: report.run_id,
            timestamp: report.started_at,
            trading_enabled: self.policy.enabled,
            triangular_opportunities: triangular,
            spread_opportunities: spreads,
            balance,
            trades: report.outcomes.clone(),
        };
        storage::save_results(&record, Some(&self.results_path))?;

        info!(report = %report, "Session complete");
        Ok(report)
    }

    /// Attempt every trade-eligible spread in detection order, one at a
    /// time, until the per-run cap is reached.
    async fn trade_eligible(
        &self,
        spreads: &[Opportunity],
        report: &mut SessionReport,
    ) -> Result<()> {
        for opp in spreads {
            if decide(opp, &self.policy) != Decision::AttemptTrade {
                continue;
            }
            let Some(symbol) = opp.symbol() else {
                continue;
            };

            if !report.has_trade_budget(self.max_trades_per_run) {
                warn!(
                    max = self.max_trades_per_run,
                    symbol, "Trade cap reached, remaining opportunities are alert-only"
                );
                break;
            }

            if report.trades_attempted > 0 && !self.cooldown.is_zero() {
                tokio::time::sleep(self.cooldown).await;
            }

            self.notifier
                .send(&messages::opportunity_alert(opp, self.notional()))
                .await;
            let outcome = self.executor.execute(symbol).await?;
            report.record_trade(outcome);
        }
        Ok(())
    }

    /// Balance errors are data-unavailable, not fatal.
    async fn fetch_balance(&self) -> Balance {
        match self.market.get_balance().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "Balance unavailable, continuing with empty balance");
                Balance::new()
            }
        }
    }

    fn notional(&self) -> Decimal {
        self.engine.thresholds().position_notional
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
