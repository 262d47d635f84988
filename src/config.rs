// src/config.rs

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Pump detection and order sizing parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Quote-asset amount spent on every buy.
    pub buy_quote_budget: Decimal,
    /// 24h percent change that has to be exceeded before buying.
    pub buy_trigger_pct: Decimal,
    /// Gain over the entry price, in percent, that triggers the sell.
    pub sell_trigger_pct: Decimal,
    /// Percent added to the last price when placing the buy.
    pub buy_markup_pct: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub live_trading: bool,
    pub request_timeout_secs: u64,
    pub recv_window_ms: u64,
    pub database_url: String,
    pub log_dir: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    pub quote_asset: String,
    pub wait_time_secs: u64,
    pub sell_wait_time_secs: u64,
    pub strategy: StrategyConfig,
}

impl AppConfig {
    /// Defaults, then `Settings.toml` (optional), then `APP_*` environment
    /// variables. Nested keys use `__`, e.g. `APP_STRATEGY__BUY_TRIGGER_PCT`.
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("api_key", "")?
            .set_default("secret_key", "")?
            .set_default("base_url", "https://api.binance.com")?
            .set_default("live_trading", false)?
            .set_default("request_timeout_secs", 10)?
            .set_default("recv_window_ms", 10_000)?
            .set_default("database_url", "sqlite:trades.db")?
            .set_default("log_dir", "logs")?
            .set_default("quote_asset", "BTC")?
            .set_default("wait_time_secs", 5)?
            .set_default("sell_wait_time_secs", 5)?
            .set_default("strategy.buy_quote_budget", "0.0022")?
            .set_default("strategy.buy_trigger_pct", "2")?
            .set_default("strategy.sell_trigger_pct", "10")?
            .set_default("strategy.buy_markup_pct", "3")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_time_secs == 0 || self.sell_wait_time_secs == 0 {
            return Err(ConfigError::Message(
                "scan intervals must be at least one second".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.strategy.buy_quote_budget <= Decimal::ZERO {
            return Err(ConfigError::Message(
                "strategy.buy_quote_budget must be positive".to_string(),
            ));
        }
        let s = &self.strategy;
        if s.buy_trigger_pct.is_sign_negative()
            || s.sell_trigger_pct.is_sign_negative()
            || s.buy_markup_pct.is_sign_negative()
        {
            return Err(ConfigError::Message(
                "strategy percentages must not be negative".to_string(),
            ));
        }
        if self.live_trading && (self.api_key.is_empty() || self.secret_key.is_empty()) {
            return Err(ConfigError::Message(
                "live trading requires api_key and secret_key".to_string(),
            ));
        }
        if self.symbols.is_empty() && self.quote_asset.is_empty() {
            return Err(ConfigError::Message(
                "either symbols or quote_asset must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn buy_interval(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }

    pub fn sell_interval(&self) -> Duration {
        Duration::from_secs(self.sell_wait_time_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        api_key: "key".to_string(),
        secret_key: "secret".to_string(),
        base_url: "http://localhost".to_string(),
        live_trading: false,
        request_timeout_secs: 5,
        recv_window_ms: 10_000,
        database_url: "sqlite::memory:".to_string(),
        log_dir: "logs".to_string(),
        symbols: vec!["LTCBTC".to_string()],
        quote_asset: "BTC".to_string(),
        wait_time_secs: 5,
        sell_wait_time_secs: 5,
        strategy: StrategyConfig {
            buy_quote_budget: Decimal::from(10),
            buy_trigger_pct: Decimal::from(3),
            sell_trigger_pct: Decimal::from(10),
            buy_markup_pct: Decimal::from(1),
        },
    }
}
