// src/connectors/messages.rs
use rust_decimal::Decimal;
use serde::Deserialize;

/// Response of GET /api/v3/ticker/24hr?symbol=<symbol>.
/// Only the fields the bot reads are mapped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hr {
    pub symbol: String,
    pub last_price: Decimal,
    pub price_change_percent: Decimal,
}

/// Response of GET /api/v3/exchangeInfo.
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilterEntry>,
}

/// One element of `filters`, tagged by `filterType`.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilterEntry {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },

    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
        #[serde(rename = "minQty")]
        min_qty: Decimal,
    },

    // Older listings still report MIN_NOTIONAL, newer ones NOTIONAL.
    #[serde(rename = "MIN_NOTIONAL", alias = "NOTIONAL")]
    MinNotional {
        #[serde(rename = "minNotional")]
        min_notional: Decimal,
    },

    #[serde(other)]
    Other,
}

/// Response of POST /api/v3/order and GET /api/v3/order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceOrder {
    pub symbol: String,
    pub order_id: u64,
    pub status: String,
}

/// Error body returned with 4xx responses.
#[derive(Debug, Deserialize)]
pub struct BinanceErrorBody {
    pub code: i64,
    pub msg: String,
}
