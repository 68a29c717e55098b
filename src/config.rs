//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default reproducing the bot's stock behaviour, so a
//! missing file is not fatal. Secrets (API keys) are referenced by env-var
//! name in the config and resolved at startup via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::types::{ArbError, Cycle};

/// Env var that overrides `trading.enabled`.
pub const AUTO_TRADE_ENV: &str = "AUTO_TRADE_ENABLED";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub alerts: AlertsConfig,
    pub strategy: StrategyConfig,
    pub trading: TradingConfig,
    pub storage: StorageConfig,
    pub universe: UniverseConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub api_secret_env: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kraken.com".to_string(),
            api_key_env: "KRAKEN_API_KEY".to_string(),
            api_secret_env: "KRAKEN_API_SECRET".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ExchangeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: String,
    pub telegram_chat_id_env: String,
    pub timeout_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token_env: "TELEGRAM_TOKEN".to_string(),
            telegram_chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
            timeout_secs: 10,
        }
    }
}

impl AlertsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Detection thresholds. All percentages are in percent units (1.0 = 1%).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    pub min_profit_threshold_pct: Decimal,
    pub min_spread_alert_pct: Decimal,
    /// Two taker fills (0.26% each on Kraken's base tier).
    pub fee_round_trip_pct: Decimal,
    /// Quote-currency amount committed per trade attempt.
    pub position_notional: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_profit_threshold_pct: dec!(1.0),
            min_spread_alert_pct: dec!(0.8),
            fee_round_trip_pct: dec!(0.52),
            position_notional: dec!(25),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    pub enabled: bool,
    pub min_spread_to_trade_pct: Decimal,
    pub max_trades_per_run: u32,
    /// Pause between the buy and sell legs.
    pub settle_delay_secs: u64,
    /// Pause after a completed trade before the next attempt.
    pub cooldown_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_spread_to_trade_pct: dec!(1.5),
            max_trades_per_run: 20,
            settle_delay_secs: 2,
            cooldown_secs: 5,
        }
    }
}

impl TradingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub results_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_path: "arbitrage_results.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
    pub cycles: Vec<Cycle>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            cycles: vec![
                Cycle::new("XBTUSD", "ETHXBT", "ETHUSD"),
                Cycle::new("XBTEUR", "ETHXBT", "ETHEUR"),
                Cycle::new("XBTUSDT", "ETHXBT", "ETHUSDT"),
            ],
        }
    }
}

/// Majors first, then top altcoins, mid caps, memecoins and small caps.
/// Thinner books further down the list tend to carry wider spreads.
const DEFAULT_SYMBOLS: &[&str] = &[
    "XBTUSD", "ETHUSD", "XBTEUR", "ETHEUR", "XBTUSDT", "ETHUSDT",
    "SOLUSD", "ADAUSD", "DOTUSD", "MATICUSD", "LINKUSD", "UNIUSD",
    "AVAXUSD", "ATOMUSD", "XRPUSD", "LTCUSD", "ALGOUSD", "XLMUSD",
    "FETUSD", "RENDERUSD", "GRTUSD", "INJUSD", "AAVEUSD", "COMPUSD",
    "SNXUSD", "MANAUSD", "SANDUSD",
    "DOGEUSD", "SHIBUSD", "BONKUSD", "PEPEUSD",
    "ENJUSD", "1INCHUSD", "CHZUSD", "BATUSD", "ZRXUSD", "KNCUSD",
];

/// Resolved secrets. Any of them may be absent: the bot still scans
/// public data without exchange keys, and logs instead of messaging
/// without Telegram credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    pub kraken_key: Option<SecretString>,
    pub kraken_secret: Option<SecretString>,
    pub telegram_token: Option<SecretString>,
    pub telegram_chat_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("kraken_key", &self.kraken_key.is_some())
            .field("kraken_secret", &self.kraken_secret.is_some())
            .field("telegram_token", &self.telegram_token.is_some())
            .field("telegram_chat_id", &self.telegram_chat_id.is_some())
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    /// Applies env overrides and validates either way.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let mut cfg = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            warn!(path, "Config file not found, using built-in defaults");
            Self::default()
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// `AUTO_TRADE_ENABLED=true` (case-insensitive) turns trading on;
    /// any other value turns it off. Unset leaves the file value alone.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(AUTO_TRADE_ENV) {
            self.trading.enabled = parse_flag(&v);
        }
    }

    pub fn validate(&self) -> Result<(), ArbError> {
        let s = &self.strategy;
        if s.min_profit_threshold_pct < Decimal::ZERO
            || s.min_spread_alert_pct < Decimal::ZERO
            || s.fee_round_trip_pct < Decimal::ZERO
        {
            return Err(ArbError::Config(
                "thresholds and fee must be non-negative".into(),
            ));
        }
        if s.position_notional <= Decimal::ZERO {
            return Err(ArbError::Config(
                "position_notional must be positive".into(),
            ));
        }
        if self.trading.min_spread_to_trade_pct < s.min_profit_threshold_pct {
            return Err(ArbError::Config(format!(
                "min_spread_to_trade_pct ({}) must be >= min_profit_threshold_pct ({})",
                self.trading.min_spread_to_trade_pct, s.min_profit_threshold_pct
            )));
        }
        if self.universe.symbols.is_empty() {
            return Err(ArbError::Config("symbol universe is empty".into()));
        }
        Ok(())
    }

    /// Resolve the env vars named in the config into secrets.
    pub fn resolve_credentials(&self) -> Credentials {
        Credentials {
            kraken_key: read_env(&self.exchange.api_key_env).map(SecretString::new),
            kraken_secret: read_env(&self.exchange.api_secret_env).map(SecretString::new),
            telegram_token: read_env(&self.alerts.telegram_bot_token_env).map(SecretString::new),
            telegram_chat_id: read_env(&self.alerts.telegram_chat_id_env),
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
