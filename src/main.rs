//! ARBWATCH: Kraken spread and triangular arbitrage watcher
//!
//! Entry point. Initialises structured logging, loads configuration,
//! wires the Kraken client and notifier into a session runner, and runs
//! one detection pass. Exits non-zero if the pass fails.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use arbwatch::config::AppConfig;
use arbwatch::engine::runner::SessionRunner;
use arbwatch::exchange::kraken::KrakenClient;
use arbwatch::exchange::{MarketData, OrderGateway};
use arbwatch::notify::{LogNotifier, Notifier, TelegramNotifier};

const BANNER: &str = r#"
    _    ____  ______        ___  _____ ____ _   _
   / \  |  _ \| __ ) \      / / \|_   _/ ___| | | |
  / _ \ | |_) |  _ \\ \ /\ / / _ \ | || |   | |_| |
 / ___ \|  _ <| |_) |\ V  V / ___ \| || |___|  _  |
/_/   \_\_| \_\____/  \_/\_/_/   \_\_| \____|_| |_|

  Kraken spread & triangular arbitrage watcher
  v0.1.0
"#;

const CONFIG_ENV: &str = "ARBWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();
    println!("{BANNER}");

    let config_path =
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load_or_default(&config_path)?;
    let creds = cfg.resolve_credentials();

    info!(
        config = %config_path,
        symbols = cfg.universe.symbols.len(),
        cycles = cfg.universe.cycles.len(),
        trading = cfg.trading.enabled,
        notional = format!("${}", cfg.strategy.position_notional),
        "ARBWATCH starting up"
    );

    // -- Exchange --------------------------------------------------------

    let kraken = Arc::new(KrakenClient::new(
        &cfg.exchange.base_url,
        cfg.exchange.timeout(),
        creds.kraken_key.clone(),
        creds.kraken_secret.clone(),
    )?);

    if !kraken.has_credentials() {
        warn!("No Kraken API keys configured: balance is unavailable and orders will be rejected");
        if cfg.trading.enabled {
            warn!("Trading is enabled without API keys, every trade attempt will abort");
        }
    }

    match kraken.server_time().await {
        Ok(ts) => info!(server_time = ts, "Kraken reachable"),
        Err(e) => warn!(error = %e, "Kraken time check failed, continuing"),
    }

    // -- Notifier --------------------------------------------------------

    let notifier: Arc<dyn Notifier> = match (creds.telegram_token, creds.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            info!("Telegram alerts enabled");
            Arc::new(TelegramNotifier::new(token, chat_id, cfg.alerts.timeout())?)
        }
        _ => {
            warn!("Telegram credentials missing, alerts go to the log only");
            Arc::new(LogNotifier)
        }
    };

    // -- Run -------------------------------------------------------------

    let market: Arc<dyn MarketData> = kraken.clone();
    let gateway: Arc<dyn OrderGateway> = kraken;
    let runner = SessionRunner::new(&cfg, market, gateway, notifier);

    let report = runner.run().await?;
    info!(
        run_id = %report.run_id,
        viable = report.opportunities_found,
        watch = report.watch_found,
        triangular = report.triangular_found,
        trades = report.trades_executed,
        open_exposures = report.open_exposures,
        pnl = format!("${:.2}", report.realized_profit),
        "ARBWATCH done"
    );

    if report.open_exposures > 0 {
        warn!(
            open_exposures = report.open_exposures,
            "Positions were left open, close them manually"
        );
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arbwatch=info"));

    let json_logging = std::env::var("ARBWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
