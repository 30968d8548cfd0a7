// In crates/api-client/src/lib.rs

use app_config::types::BinanceSettings;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Bar, Direction, PositionSnapshot, Symbol};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

pub mod error;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use types::*;

/// The read side of the exchange as the trading loop sees it.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetches the most recent `limit` bars, oldest first.
    async fn fetch_bars(&self, symbol: &Symbol, timeframe: &str, limit: u16) -> Result<Vec<Bar>>;

    /// Fetches the net position currently held for `symbol`.
    async fn fetch_position(&self, symbol: &Symbol) -> Result<PositionSnapshot>;
}

impl ApiClient {
    /// Constructs a new ApiClient from BinanceSettings.
    pub fn new(settings: &BinanceSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(ApiClient {
            http_client,
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
            // Testnet or live, depending on the sandbox flag.
            base_url: settings.rest_url().to_string(),
        })
    }

    /// Generates an HMAC-SHA256 signature for a given query string.
    ///
    /// # Returns
    ///
    /// A hexadecimal string representation of the signature.
    fn sign(&self, query_string: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| Error::CustomError(format!("invalid secret key: {}", e)))?;
        mac.update(query_string.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Appends the timestamp and the signature to a query string.
    fn create_signed_query(&self, params: &mut String) -> Result<()> {
        let timestamp = Utc::now().timestamp_millis();

        if !params.is_empty() {
            params.push('&');
        }
        params.push_str(&format!("timestamp={}", timestamp));

        let signature = self.sign(params)?;
        params.push_str(&format!("&signature={}", signature));
        Ok(())
    }

    /// Fetches the futures account balance and positions.
    ///
    /// This corresponds to the `GET /fapi/v2/account` endpoint.
    pub async fn get_account_state(&self) -> Result<AccountState> {
        let mut params = String::new();
        self.create_signed_query(&mut params)?;

        let url = format!("{}/fapi/v2/account?{}", self.base_url, params);

        let text = self
            .http_client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?
            .text()
            .await?;

        parse_response(&text)
    }

    /// Fetches historical kline (candlestick) data.
    ///
    /// This corresponds to the `GET /fapi/v1/klines` endpoint.
    ///
    /// # Arguments
    ///
    /// * `symbol`: The symbol to fetch klines for.
    /// * `interval`: The kline interval (e.g., "1m", "5m", "1h").
    /// * `start_time`: Optional start time in milliseconds.
    /// * `limit`: Optional number of klines to return (max 1500, default 500).
    pub async fn get_historical_klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        start_time: Option<i64>,
        limit: Option<u16>,
    ) -> Result<Vec<Bar>> {
        let mut params = format!("symbol={}&interval={}", symbol.0, interval);

        if let Some(st) = start_time {
            params.push_str(&format!("&startTime={}", st));
        }
        if let Some(l) = limit {
            params.push_str(&format!("&limit={}", l));
        }

        let url = format!("{}/fapi/v1/klines?{}", self.base_url, params);
        tracing::debug!(symbol = %symbol, interval, ?limit, "Fetching klines.");

        let response_body = self.http_client.get(&url).send().await?.text().await?;

        let raw_klines: Vec<RawKline> = parse_response(&response_body)?;
        raw_klines.into_iter().map(bar_from_raw).collect()
    }

    /// Places a new market order in one-way position mode.
    /// Corresponds to `POST /fapi/v1/order`.
    pub async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: Direction,
        quantity: Decimal,
    ) -> Result<NewOrderResponse> {
        // RESULT makes the exchange report the fill instead of a bare ack.
        let mut params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newOrderRespType=RESULT",
            symbol.0,
            side.as_str(),
            quantity.normalize()
        );
        self.create_signed_query(&mut params)?;

        let url = format!("{}/fapi/v1/order", self.base_url);

        let text = self
            .http_client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(params)
            .send()
            .await?
            .text()
            .await?;

        parse_response(&text)
    }
}

#[async_trait]
impl MarketData for ApiClient {
    async fn fetch_bars(&self, symbol: &Symbol, timeframe: &str, limit: u16) -> Result<Vec<Bar>> {
        self.get_historical_klines(symbol, timeframe, None, Some(limit)).await
    }

    async fn fetch_position(&self, symbol: &Symbol) -> Result<PositionSnapshot> {
        let account = self.get_account_state().await?;
        Ok(net_position(symbol, &account))
    }
}

/// Sums every position entry for `symbol`. No entry means flat.
pub fn net_position(symbol: &Symbol, account: &AccountState) -> PositionSnapshot {
    let signed_quantity = account
        .positions
        .iter()
        .filter(|p| p.symbol == symbol.0)
        .map(|p| p.position_amt)
        .sum::<Decimal>();

    PositionSnapshot { symbol: symbol.clone(), signed_quantity }
}

/// Deserializes a response body, turning Binance's `{code, msg}` error
/// object into `Error::ApiError` first.
fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)?;

    if let Some(code) = value.get("code").and_then(Value::as_i64) {
        if let Some(msg) = value.get("msg").and_then(Value::as_str) {
            if code != 200 {
                tracing::warn!(code, msg, "Exchange returned an error.");
                return Err(Error::ApiError { code, msg: msg.to_string() });
            }
        }
    }

    Ok(serde_json::from_value(value)?)
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    raw.parse()
        .map_err(|_| Error::InvalidNumber(format!("{} = {:?}", field, raw)))
}

fn bar_from_raw(raw: RawKline) -> Result<Bar> {
    Ok(Bar {
        open_time: raw.0,
        open: parse_decimal("open", &raw.1)?,
        high: parse_decimal("high", &raw.2)?,
        low: parse_decimal("low", &raw.3)?,
        close: parse_decimal("close", &raw.4)?,
        volume: parse_decimal("volume", &raw.5)?,
        close_time: raw.6,
    })
}

// Free function to allow api_client::new usage
pub fn new(settings: &BinanceSettings) -> Result<ApiClient> {
    ApiClient::new(settings)
}
