// In crates/app-config/src/lib.rs

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use rust_decimal::Decimal;

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{NotifyPolicy, Settings};

/// Loads the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `development.toml`).
/// 3. Merges settings from environment variables.
///
/// The result is validated before it is returned, so a missing credential
/// stops the process here rather than on the first tick.
pub fn load_settings() -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let builder = Config::builder()
        // 1. Load the base configuration file.
        .add_source(File::with_name("config/base"))
        // 2. Load the environment-specific configuration file.
        .add_source(File::with_name(&format!("config/{}", environment)).required(false))
        // 3. Load settings from environment variables (e.g., `APP_BINANCE__API_KEY=...`).
        // The prefix is `APP`, separator is `__`.
        .add_source(Environment::with_prefix("APP").separator("__"));

    let settings = build(builder)?;
    settings.validate()?;
    Ok(settings)
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}

impl Settings {
    /// Checks everything that would otherwise fail on every tick.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.binance.api_key.trim().is_empty() || self.binance.secret_key.trim().is_empty() {
            problems.push("binance.api_key and binance.secret_key are required".to_string());
        }
        if self.telegram.bot_token.trim().is_empty() {
            problems.push("telegram.bot_token is required".to_string());
        }
        if self.trading.symbol.trim().is_empty() {
            problems.push("trading.symbol must not be empty".to_string());
        }
        if self.trading.timeframe.trim().is_empty() {
            problems.push("trading.timeframe must not be empty".to_string());
        }
        if self.trading.order_size <= Decimal::ZERO {
            problems.push(format!("trading.order_size must be positive, got {}", self.trading.order_size));
        }
        if let Err(e) = self.trading.indicator.validate() {
            problems.push(e.to_string());
        }
        let min_bars = self.trading.min_bar_limit();
        if u32::from(self.trading.bar_limit) < min_bars {
            problems.push(format!(
                "trading.bar_limit ({}) must be at least {} for slow period {}",
                self.trading.bar_limit, min_bars, self.trading.indicator.slow_period
            ));
        }
        if self.schedule.tick_interval_secs == 0 {
            problems.push("schedule.tick_interval_secs must be positive".to_string());
        }
        if self.schedule.failure_threshold == 0 {
            problems.push("schedule.failure_threshold must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Invalid(problems.join("; ")))
        }
    }
}
