//! Notification message builders (Telegram HTML subset).
//!
//! Pure string formatting so the runner and executor stay free of
//! presentation details and the text can be asserted on in tests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

use crate::types::{Balance, OrderSide, Opportunity};

/// Viable entries listed in the analysis summary.
const SUMMARY_MAX_VIABLE: usize = 3;
/// Watch entries listed in the analysis summary.
const SUMMARY_MAX_WATCH: usize = 2;
/// Watch section is only appended while the message is shorter than this.
/// Telegram caps messages at 4096 chars.
const SUMMARY_SOFT_LIMIT: usize = 3000;

/// Escape the three characters Telegram's HTML mode treats specially.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn started(at: DateTime<Utc>) -> String {
    format!(
        "🤖 <b>Bot started</b>\n{}",
        at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Non-zero balances only.
pub fn balance(balance: &Balance) -> String {
    let mut msg = String::from("💰 <b>Balance:</b>\n");
    for (currency, amount) in balance.iter().filter(|(_, a)| **a > Decimal::ZERO) {
        msg.push_str(&format!("{}: {}\n", escape_html(currency), amount.normalize()));
    }
    msg
}

pub fn auto_trade_enabled() -> String {
    "⚠️ <b>AUTO-TRADE MODE ENABLED</b>\nLooking for opportunities to trade...".to_string()
}

/// Per-opportunity alert sent before a trade attempt.
pub fn opportunity_alert(opp: &Opportunity, notional: Decimal) -> String {
    let mut msg = if opp.is_viable() {
        String::from("🚨🚨 <b>PROFITABLE OPPORTUNITY!</b> 🚨🚨\n\n")
    } else {
        String::from("⚠️ <b>High Spread Detected</b>\n\n")
    };
    msg.push_str(&format!("Type: {}\n", opp.kind()));

    match opp {
        Opportunity::Triangular {
            path, profit_pct, ..
        } => {
            msg.push_str(&format!(
                "Route: {}\nEstimated profit: {profit_pct:.2}%\n",
                escape_html(path)
            ));
        }
        Opportunity::SpreadViable {
            symbol,
            spread_pct,
            net_profit_pct,
            estimated_profit_amount,
            ..
        } => {
            msg.push_str(&format!(
                "Pair: {symbol}\nGross spread: {spread_pct:.3}%\nNET profit: {net_profit_pct:.3}%\n"
            ));
            msg.push_str("Status: ✅ PROFITABLE\n");
            msg.push_str(&format!(
                "\n💰 With ${}:\nEstimated profit: ${estimated_profit_amount:.2}\n",
                notional.normalize()
            ));
        }
        Opportunity::SpreadWatch {
            symbol,
            spread_pct,
            net_profit_pct,
            ..
        } => {
            msg.push_str(&format!(
                "Pair: {symbol}\nGross spread: {spread_pct:.3}%\nNET profit: {net_profit_pct:.3}%\n"
            ));
            msg.push_str("Status: ⚠️ High spread but NOT profitable (fees)\n");
        }
    }

    msg.push_str(&format!("\n⏰ {}", opp.timestamp().to_rfc3339()));
    msg
}

/// End-of-analysis summary for the whole pass.
pub fn analysis_summary(
    triangular: &[Opportunity],
    spreads: &[Opportunity],
    alert_threshold_pct: Decimal,
    profit_threshold_pct: Decimal,
) -> String {
    let total = triangular.len() + spreads.len();
    if total == 0 {
        return format!(
            "✅ Analysis complete.\n\n❌ No spreads above {}% found\n\n\
             This is NORMAL. Profitable spreads (>{}%) are rare.",
            alert_threshold_pct.normalize(),
            profit_threshold_pct.normalize(),
        );
    }

    let viable: Vec<&Opportunity> = spreads.iter().filter(|o| o.is_viable()).collect();
    let watch: Vec<&Opportunity> = spreads.iter().filter(|o| o.is_watch()).collect();

    let mut msg = String::from("📊 <b>Analysis Complete</b>\n\n");
    msg.push_str(&format!("Total opportunities: {total}\n"));
    msg.push_str(&format!(
        "🎯 PROFITABLE (>{}% net): {}\n",
        profit_threshold_pct.normalize(),
        viable.len()
    ));
    msg.push_str(&format!("🔺 Triangular: {}\n", triangular.len()));
    msg.push_str(&format!(
        "⚠️ High spreads but not profitable: {}\n\n",
        watch.len()
    ));

    if !viable.is_empty() {
        msg.push_str("🚨 <b>PROFITABLE OPPORTUNITIES:</b>\n\n");
        for opp in viable.iter().take(SUMMARY_MAX_VIABLE) {
            if let Opportunity::SpreadViable {
                symbol,
                spread_pct,
                net_profit_pct,
                estimated_profit_amount,
                ..
            } = opp
            {
                msg.push_str(&format!(
                    "✅ {symbol}\nSpread: {spread_pct:.3}%\nNet: {net_profit_pct:.3}%\n\
                     Profit: ${estimated_profit_amount:.2}\n\n"
                ));
            }
        }
    }

    if !watch.is_empty() && msg.len() < SUMMARY_SOFT_LIMIT {
        msg.push_str("⚠️ <b>High spreads (NOT profitable):</b>\n\n");
        for opp in watch.iter().take(SUMMARY_MAX_WATCH) {
            if let Opportunity::SpreadWatch {
                symbol,
                spread_pct,
                net_profit_pct,
                ..
            } = opp
            {
                msg.push_str(&format!(
                    "📊 {symbol}\nSpread: {spread_pct:.3}%\nNet: {net_profit_pct:.3}%\n\n"
                ));
            }
        }
    }

    msg
}

pub fn session_summary(trades_executed: u32, open_exposures: u32, trading_enabled: bool) -> String {
    let mut msg = String::from("📊 <b>Session Summary</b>\n");
    msg.push_str(&format!("Trades executed: {trades_executed}\n"));
    if open_exposures > 0 {
        msg.push_str(&format!("🚨 OPEN POSITIONS: {open_exposures}\n"));
    }
    msg.push_str(if trading_enabled {
        "Mode: 🔴 AUTO"
    } else {
        "Mode: 🟢 ALERTS ONLY"
    });
    msg
}

pub fn price_unavailable(symbol: &str) -> String {
    format!("❌ Could not fetch price for {symbol}")
}

pub fn executing(side: OrderSide, volume: Decimal, symbol: &str, price: Decimal) -> String {
    format!("🔄 Executing {side} {volume} {symbol} @ ${price:.2}")
}

pub fn order_failed(side: OrderSide, error: &str) -> String {
    format!("❌ {side} error: {}", escape_html(error))
}

/// Sell leg failed after the buy filled. Highest-urgency message.
pub fn open_exposure(symbol: &str, volume: Decimal, error: &str) -> String {
    format!(
        "🚨🚨🚨 <b>OPEN POSITION</b> 🚨🚨🚨\n\
         SELL failed after BUY filled: {}\n\
         Holding {volume} {symbol}. Close it manually!",
        escape_html(error)
    )
}

pub fn trade_completed(symbol: &str, profit: Decimal) -> String {
    format!("✅ Trade completed! {symbol}\nProfit: ${profit:.2}")
}

pub fn error(err: &str) -> String {
    format!("❌ <b>Error:</b>\n{}", escape_html(err))
}

pub fn finished(duration: Duration) -> String {
    format!(
        "✅ Bot finished\nDuration: {:.2}s",
        duration.as_secs_f64()
    )
}
