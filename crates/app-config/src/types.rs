// In crates/app-config/src/types.rs

use core_types::{SessionId, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use strategies::types::IndicatorSettings;

const BINANCE_LIVE_REST_URL: &str = "https://fapi.binance.com";
const BINANCE_TESTNET_REST_URL: &str = "https://testnet.binancefuture.com";
const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// Credentials and endpoint selection for the exchange.
    pub binance: BinanceSettings,
    /// Credentials for the notification bot.
    #[serde(default)]
    pub telegram: TelegramSettings,
    /// What is traded and how signals are derived.
    pub trading: TradingSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self { environment: default_environment(), log_level: default_log_level() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BinanceSettings {
    /// The API key for Binance.
    #[serde(default)]
    pub api_key: String,
    /// The secret key for Binance.
    #[serde(default)]
    pub secret_key: String,
    /// Trade against the futures testnet instead of the live exchange.
    #[serde(default = "default_true")]
    pub sandbox: bool,
    /// Overrides the REST base URL picked from `sandbox`.
    #[serde(default)]
    pub rest_base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BinanceSettings {
    pub fn rest_url(&self) -> &str {
        match &self.rest_base_url {
            Some(url) => url.trim_end_matches('/'),
            None if self.sandbox => BINANCE_TESTNET_REST_URL,
            None => BINANCE_LIVE_REST_URL,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TelegramSettings {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_telegram_url")]
    pub api_base_url: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self { bot_token: String::new(), api_base_url: default_telegram_url() }
    }
}

/// When the notification gate is consulted.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Announce a direction change only after its order was placed.
    #[default]
    OnOrder,
    /// Announce every direction change, whether or not an order was placed.
    OnSignal,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TradingSettings {
    /// Exchange symbol, e.g. "BTCUSDT".
    pub symbol: String,
    /// Bar interval, e.g. "15m".
    pub timeframe: String,
    /// How many bars to fetch per tick.
    #[serde(default = "default_bar_limit")]
    pub bar_limit: u16,
    /// Fixed quantity of every market order, in base asset units.
    pub order_size: Decimal,
    #[serde(default)]
    pub notify_policy: NotifyPolicy,
    /// Evaluate the still-forming last bar instead of dropping it.
    #[serde(default)]
    pub evaluate_forming_bar: bool,
    pub indicator: IndicatorSettings,
}

impl TradingSettings {
    pub fn symbol(&self) -> Symbol {
        Symbol(self.symbol.clone())
    }

    /// Smallest fetch that still yields two defined states: the slow period,
    /// one bar for the previous state, and the forming bar when it is dropped.
    pub fn min_bar_limit(&self) -> u32 {
        let forming = u32::from(!self.evaluate_forming_bar);
        self.indicator.slow_period.saturating_add(1 + forming)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScheduleSettings {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Consecutive fetch failures that trigger a cooldown.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_notification_retry_delay_ms")]
    pub notification_retry_delay_ms: u64,
    /// Chat ids whose loops start as soon as the process is up.
    #[serde(default)]
    pub autostart_sessions: Vec<i64>,
}

impl ScheduleSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn notification_retry_delay(&self) -> Duration {
        Duration::from_millis(self.notification_retry_delay_ms)
    }

    pub fn autostart(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.autostart_sessions.iter().copied().map(SessionId)
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            notification_retry_delay_ms: default_notification_retry_delay_ms(),
            autostart_sessions: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Helper functions for serde defaults
fn default_environment() -> String { "development".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }
fn default_request_timeout_secs() -> u64 { 10 }
fn default_telegram_url() -> String { TELEGRAM_API_URL.to_string() }
fn default_bar_limit() -> u16 { 100 }
fn default_tick_interval_secs() -> u64 { 60 }
fn default_initial_delay_secs() -> u64 { 10 }
fn default_failure_threshold() -> u32 { 5 }
fn default_cooldown_secs() -> u64 { 300 }
fn default_notification_retry_delay_ms() -> u64 { 2_000 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
