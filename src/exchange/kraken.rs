//! Kraken spot REST integration.
//!
//! Public endpoints (`Ticker`, `Time`) need no auth. Private endpoints
//! (`Balance`, `AddOrder`) are signed per Kraken's scheme:
//!
//! `API-Sign = base64(HMAC-SHA512(base64_decode(secret), uri_path + SHA256(nonce + postdata)))`
//!
//! API docs: https://docs.kraken.com/api/
//! Every response is `{"error": [...], "result": {...}}`; a non-empty
//! `error` array means the call failed even on HTTP 200.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{MarketData, OrderGateway};
use crate::types::{ArbError, Balance, OrderReceipt, OrderRequest, Quote};

type HmacSha512 = Hmac<Sha512>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const TICKER_PATH: &str = "/0/public/Ticker";
const TIME_PATH: &str = "/0/public/Time";
const BALANCE_PATH: &str = "/0/private/Balance";
const ADD_ORDER_PATH: &str = "/0/private/AddOrder";

// ---------------------------------------------------------------------------
// API response types (Kraken JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct KrakenResponse<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

impl<T> KrakenResponse<T> {
    fn into_result(self) -> Result<T, ArbError> {
        if !self.error.is_empty() {
            return Err(ArbError::Exchange(self.error.join("; ")));
        }
        self.result
            .ok_or_else(|| ArbError::Exchange("response missing result".into()))
    }
}

/// One entry of the `Ticker` result. Price arrays are
/// `[price, whole lot volume, lot volume]` for `a`/`b` and
/// `[price, lot volume]` for `c`; only the price is used.
#[derive(Debug, Deserialize)]
struct TickerInfo {
    a: Vec<String>,
    b: Vec<String>,
    c: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ServerTime {
    unixtime: i64,
}

#[derive(Debug, Deserialize)]
struct AddOrderResult {
    #[serde(default)]
    descr: Option<OrderDescription>,
    #[serde(default)]
    txid: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OrderDescription {
    #[serde(default)]
    order: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Kraken REST client implementing both `MarketData` and `OrderGateway`.
///
/// Public calls carry a request timeout. Private calls only bound the
/// connect: an order that timed out client-side may still have filled,
/// and must not be reported as rejected.
pub struct KrakenClient {
    http: Client,
    private_http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    api_secret: Option<SecretString>,
    last_nonce: AtomicU64,
}

impl KrakenClient {
    /// Create a new Kraken client.
    ///
    /// Keys are optional: without them quotes still work and private
    /// calls fail with `ArbError::Exchange`. `timeout` bounds public
    /// requests and the connect phase of private ones.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        api_key: Option<SecretString>,
        api_secret: Option<SecretString>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("ARBWATCH/0.1.0 (kraken-arbitrage-watcher)")
            .build()
            .context("Failed to build HTTP client for Kraken")?;

        let private_http = Client::builder()
            .connect_timeout(timeout)
            .user_agent("ARBWATCH/0.1.0 (kraken-arbitrage-watcher)")
            .build()
            .context("Failed to build private HTTP client for Kraken")?;

        Ok(Self {
            http,
            private_http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
            last_nonce: AtomicU64::new(0),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Exchange clock, as a connectivity check.
    pub async fn server_time(&self) -> Result<i64> {
        let url = format!("{}{TIME_PATH}", self.base_url);
        let resp: KrakenResponse<ServerTime> = self.get_json(&url).await?;
        Ok(resp.into_result()?.unixtime)
    }

    // -- Internal helpers ------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<KrakenResponse<T>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Kraken API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Kraken API error {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse Kraken response")
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!(
            "{}{TICKER_PATH}?pair={}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        debug!(url = %url, "Fetching Kraken ticker");

        let resp: KrakenResponse<HashMap<String, TickerInfo>> = self.get_json(&url).await?;
        Ok(quote_from_ticker(symbol, resp.into_result()?)?)
    }

    /// Millisecond nonce, strictly increasing within this process.
    fn next_nonce(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.last_nonce.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self
                .last_nonce
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Signed POST to a private endpoint. `params` excludes the nonce.
    async fn private_post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ArbError> {
        let (key, secret) = match (&self.api_key, &self.api_secret) {
            (Some(k), Some(s)) => (k, s),
            _ => {
                return Err(ArbError::Exchange(
                    "Kraken API credentials not configured".into(),
                ))
            }
        };

        let nonce = self.next_nonce();
        let postdata = encode_form(nonce, params);
        let signature = sign_request(path, nonce, &postdata, secret.expose_secret())?;

        let url = format!("{}{path}", self.base_url);
        let resp = self
            .private_http
            .post(&url)
            .header("API-Key", key.expose_secret())
            .header("API-Sign", signature)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=utf-8",
            )
            .body(postdata)
            .send()
            .await
            .map_err(|e| ArbError::Exchange(format!("{path} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ArbError::Exchange(format!("{path} HTTP {status}: {body}")));
        }

        let parsed: KrakenResponse<T> = resp
            .json()
            .await
            .map_err(|e| ArbError::Exchange(format!("{path} bad response: {e}")))?;
        parsed.into_result()
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Compute the `API-Sign` header value.
pub fn sign_request(
    path: &str,
    nonce: u64,
    postdata: &str,
    secret_b64: &str,
) -> Result<String, ArbError> {
    let secret = BASE64_STANDARD
        .decode(secret_b64)
        .map_err(|e| ArbError::Config(format!("Kraken API secret is not base64: {e}")))?;

    let mut sha = Sha256::new();
    sha.update(nonce.to_string().as_bytes());
    sha.update(postdata.as_bytes());
    let digest = sha.finalize();

    let mut mac = HmacSha512::new_from_slice(&secret)
        .map_err(|e| ArbError::Config(format!("Invalid Kraken secret length: {e}")))?;
    mac.update(path.as_bytes());
    mac.update(&digest);

    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// `nonce=...&k=v&...`, values percent-encoded.
fn encode_form(nonce: u64, params: &[(&str, String)]) -> String {
    let mut body = format!("nonce={nonce}");
    for (k, v) in params {
        body.push('&');
        body.push_str(k);
        body.push('=');
        body.push_str(&urlencoding::encode(v));
    }
    body
}

/// Kraken keys ticker results by its canonical pair name (`XXBTZUSD` for
/// `XBTUSD`), so fall back to the single returned entry when the
/// requested alias is not a key.
fn quote_from_ticker(
    symbol: &str,
    mut result: HashMap<String, TickerInfo>,
) -> Result<Quote, ArbError> {
    let info = match result.remove(symbol) {
        Some(info) => info,
        None if result.len() == 1 => result
            .into_values()
            .next()
            .ok_or_else(|| ArbError::DataUnavailable(symbol.to_string()))?,
        None => return Err(ArbError::DataUnavailable(symbol.to_string())),
    };

    let price = |field: &[String], name: &str| -> Result<Decimal, ArbError> {
        field
            .first()
            .and_then(|p| Decimal::from_str(p).ok())
            .ok_or_else(|| ArbError::Exchange(format!("{symbol}: bad '{name}' price")))
    };

    Ok(Quote {
        symbol: symbol.to_string(),
        bid: price(&info.b, "b")?,
        ask: price(&info.a, "a")?,
        last: price(&info.c, "c")?,
    })
}

fn parse_balance(raw: HashMap<String, String>) -> Balance {
    raw.into_iter()
        .filter_map(|(currency, amount)| match Decimal::from_str(&amount) {
            Ok(v) => Some((currency, v)),
            Err(_) => {
                warn!(currency = %currency, amount = %amount, "Unparseable balance entry");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketData for KrakenClient {
    async fn get_quote(&self, symbol: &str) -> Option<Quote> {
        match self.fetch_quote(symbol).await {
            Ok(q) if q.is_usable() => Some(q),
            Ok(q) => {
                debug!(symbol, quote = %q, "Ignoring quote with non-positive price");
                None
            }
            Err(e) => {
                warn!(symbol, error = %e, "Ticker unavailable");
                None
            }
        }
    }

    async fn get_balance(&self) -> Result<Balance> {
        let raw: HashMap<String, String> = self
            .private_post(BALANCE_PATH, &[])
            .await
            .context("Kraken balance request failed")?;
        let balance = parse_balance(raw);
        info!(currencies = balance.len(), "Balance fetched");
        Ok(balance)
    }
}

#[async_trait]
impl OrderGateway for KrakenClient {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ArbError> {
        let mut params = vec![
            ("pair", order.symbol.clone()),
            ("type", order.side.as_str().to_string()),
            ("ordertype", order.order_type().to_string()),
            ("volume", order.volume.normalize().to_string()),
        ];
        if let Some(price) = order.limit_price {
            params.push(("price", price.normalize().to_string()));
        }

        info!(order = %order, "Submitting order");

        let result: AddOrderResult = self
            .private_post(ADD_ORDER_PATH, &params)
            .await
            .map_err(|e| ArbError::OrderRejected {
                symbol: order.symbol.clone(),
                side: order.side,
                message: e.to_string(),
            })?;

        let receipt = OrderReceipt {
            txids: result.txid,
            description: result.descr.map(|d| d.order).unwrap_or_default(),
        };
        info!(txids = ?receipt.txids, descr = %receipt.description, "Order accepted");
        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
