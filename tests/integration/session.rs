//! End-to-end session passes.
//!
//! Drives `SessionRunner` against `MockExchange` and a temp results
//! file, checking orders placed, notifications sent and what lands on disk.

use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use arbwatch::config::AppConfig;
use arbwatch::engine::runner::SessionRunner;
use arbwatch::storage;
use arbwatch::types::{Cycle, OrderSide, TradeState};

use crate::mock_exchange::{MockExchange, RecordingNotifier};

fn temp_path() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("arbwatch_session_{}.json", Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

fn config(trading: bool, results_path: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.universe.symbols = vec![
        "PEPEUSD".to_string(),
        "DOGEUSD".to_string(),
        "MISSINGUSD".to_string(),
    ];
    cfg.universe.cycles = vec![
        Cycle::new("XBTUSD", "ETHXBT", "ETHUSD"),
        Cycle::new("XBTEUR", "ETHXBT", "ETHEUR"),
    ];
    cfg.trading.enabled = trading;
    cfg.trading.settle_delay_secs = 0;
    cfg.trading.cooldown_secs = 0;
    cfg.storage.results_path = results_path.to_string();
    cfg
}

/// PEPEUSD viable (3% gross), DOGEUSD watch (1.2% gross), one profitable
/// cycle, and no quotes for MISSINGUSD or the EUR legs.
fn exchange() -> MockExchange {
    MockExchange::new()
        .with_quote("PEPEUSD", dec!(100), dec!(103))
        .with_quote("DOGEUSD", dec!(100), dec!(101.2))
        .with_quote("XBTUSD", dec!(1), dec!(1))
        .with_quote("ETHXBT", dec!(0.98), dec!(0.98))
        .with_quote("ETHUSD", dec!(1), dec!(1))
}

fn runner(
    cfg: &AppConfig,
    ex: &Arc<MockExchange>,
    notifier: &Arc<RecordingNotifier>,
) -> SessionRunner {
    SessionRunner::new(cfg, ex.clone(), ex.clone(), notifier.clone())
}

#[tokio::test]
async fn test_alert_only_pass() {
    let path = temp_path();
    let cfg = config(false, &path);
    let ex = Arc::new(exchange());
    let notifier = Arc::new(RecordingNotifier::default());

    let report = runner(&cfg, &ex, &notifier).run().await.unwrap();

    assert_eq!(report.cycles_evaluated, 1);
    assert_eq!(report.cycles_skipped, 1);
    assert_eq!(report.triangular_found, 1);
    assert_eq!(report.opportunities_found, 1);
    assert_eq!(report.watch_found, 1);
    assert_eq!(report.quotes_unavailable, 1);
    assert!(ex.orders().is_empty());

    let msgs = notifier.messages();
    assert!(msgs[0].contains("Bot started"));
    assert!(msgs[1].contains("Balance"));
    assert!(msgs[1].contains("ZUSD: 250"));
    assert!(!msgs[1].contains("XXBT"));
    assert!(msgs.last().unwrap().starts_with("✅ Bot finished"));
    assert!(notifier.any_contains("Total opportunities: 3"));
    assert!(!notifier.any_contains("AUTO-TRADE"));

    let saved = storage::load_results(Some(&path)).unwrap().unwrap();
    assert_eq!(saved.run_id, report.run_id);
    assert_eq!(saved.triangular_opportunities.len(), 1);
    let symbols: Vec<_> = saved
        .spread_opportunities
        .iter()
        .filter_map(|o| o.symbol())
        .collect();
    assert_eq!(symbols, vec!["PEPEUSD", "DOGEUSD"]);
    assert!(saved.trades.is_empty());

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_auto_trade_round_trip() {
    let path = temp_path();
    let cfg = config(true, &path);
    let ex = Arc::new(exchange());
    let notifier = Arc::new(RecordingNotifier::default());

    let report = runner(&cfg, &ex, &notifier).run().await.unwrap();

    let orders = ex.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[1].side, OrderSide::Sell);
    // 25 / 103, truncated to 8 places
    assert_eq!(orders[0].volume, dec!(0.24271844));
    assert_eq!(orders[1].volume, orders[0].volume);
    assert!(orders.iter().all(|o| o.symbol == "PEPEUSD" && o.limit_price.is_none()));

    assert_eq!(report.trades_executed, 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state, TradeState::Closed);
    assert_eq!(outcome.realized_profit, dec!(-3) * dec!(0.24271844));

    assert!(notifier.any_contains("AUTO-TRADE MODE ENABLED"));
    assert!(notifier.any_contains("Trade completed! PEPEUSD"));
    assert!(notifier.any_contains("Mode: 🔴 AUTO"));

    let saved = storage::load_results(Some(&path)).unwrap().unwrap();
    assert!(saved.trading_enabled);
    assert_eq!(saved.trades.len(), 1);
    assert_eq!(saved.trades[0].buy_txids, vec!["MOCK-1".to_string()]);
    assert_eq!(saved.trades[0].sell_txids, vec!["MOCK-2".to_string()]);

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_sell_rejection_leaves_open_exposure() {
    let path = temp_path();
    let cfg = config(true, &path);
    let ex = Arc::new(exchange());
    ex.reject(OrderSide::Sell);
    let notifier = Arc::new(RecordingNotifier::default());

    let report = runner(&cfg, &ex, &notifier).run().await.unwrap();

    assert_eq!(ex.orders().len(), 2);
    assert_eq!(report.open_exposures, 1);
    assert_eq!(report.trades_executed, 0);
    assert_eq!(report.outcomes[0].state, TradeState::OpenExposure);
    assert!(!report.outcomes[0].success);
    assert!(notifier.any_contains("OPEN POSITION"));
    assert!(notifier.any_contains("OPEN POSITIONS: 1"));
    assert!(!notifier.any_contains("Trade completed"));

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_buy_rejection_never_sells() {
    let path = temp_path();
    let cfg = config(true, &path);
    let ex = Arc::new(exchange());
    ex.reject(OrderSide::Buy);
    let notifier = Arc::new(RecordingNotifier::default());

    let report = runner(&cfg, &ex, &notifier).run().await.unwrap();

    let orders = ex.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(report.outcomes[0].state, TradeState::Aborted);
    assert_eq!(report.open_exposures, 0);
    assert!(notifier.any_contains("BUY error"));

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_below_trade_bar_is_alert_only() {
    let path = temp_path();
    let cfg = config(true, &path);
    // 1.72% gross, 1.2% net: viable, but under the 1.5% trade bar
    let ex = Arc::new(
        MockExchange::new().with_quote("PEPEUSD", dec!(100), dec!(101.72)),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let report = runner(&cfg, &ex, &notifier).run().await.unwrap();

    assert_eq!(report.opportunities_found, 1);
    assert_eq!(report.trades_attempted, 0);
    assert!(ex.orders().is_empty());

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_results_overwritten_each_run() {
    let path = temp_path();
    let cfg = config(false, &path);
    let ex = Arc::new(exchange());
    let notifier = Arc::new(RecordingNotifier::default());

    runner(&cfg, &ex, &notifier).run().await.unwrap();
    ex.set_quote("PEPEUSD", dec!(100), dec!(100.1));
    runner(&cfg, &ex, &notifier).run().await.unwrap();

    let saved = storage::load_results(Some(&path)).unwrap().unwrap();
    assert_eq!(saved.spread_opportunities.len(), 1);
    assert_eq!(saved.spread_opportunities[0].symbol(), Some("DOGEUSD"));

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_balance_failure_still_completes() {
    let path = temp_path();
    let cfg = config(false, &path);
    let ex = Arc::new(exchange());
    ex.fail_balance("EAPI:Invalid key");
    let notifier = Arc::new(RecordingNotifier::default());

    runner(&cfg, &ex, &notifier).run().await.unwrap();

    let saved = storage::load_results(Some(&path)).unwrap().unwrap();
    assert!(saved.balance.is_empty());
    assert_eq!(saved.spread_opportunities.len(), 2);

    storage::delete_results(Some(&path)).unwrap();
}

#[tokio::test]
async fn test_unwritable_results_reports_error_and_finishes() {
    let cfg = config(false, "/nonexistent-dir/arbwatch/results.json");
    let ex = Arc::new(exchange());
    let notifier = Arc::new(RecordingNotifier::default());

    let result = runner(&cfg, &ex, &notifier).run().await;
    assert!(result.is_err());

    let msgs = notifier.messages();
    assert!(msgs[msgs.len() - 2].contains("<b>Error:</b>"));
    assert!(msgs[msgs.len() - 1].starts_with("✅ Bot finished"));
}
