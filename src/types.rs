// src/types.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fresh market data for one symbol. Never cached between scans.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub last_price: Decimal,
    pub percent_change_24h: Decimal,
}

/// Exchange trading rules for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFilters {
    pub tick_size: Decimal,
    pub step_size: Decimal,
    pub min_qty: Decimal,
    pub min_notional: Decimal,
}

impl SymbolFilters {
    pub fn new(tick_size: Decimal, step_size: Decimal) -> Self {
        Self {
            tick_size,
            step_size,
            min_qty: Decimal::ZERO,
            min_notional: Decimal::ZERO,
        }
    }
}

/// A limit order the pricing engine wants placed. Price and quantity already
/// carry the precision the exchange expects.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// Maps a raw Binance order status.
    pub fn from_exchange(status: &str) -> Option<Self> {
        match status {
            "NEW" | "PARTIALLY_FILLED" | "PENDING_CANCEL" | "PENDING_NEW" => Some(Self::Pending),
            "FILLED" => Some(Self::Filled),
            "CANCELED" | "REJECTED" | "EXPIRED" | "EXPIRED_IN_MATCH" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// An order as the exchange reports it right after placement, or while it
/// is still open.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub status: OrderStatus,
}

/// Lifecycle stage of a stored position. Idle and Closed are represented by
/// the absence of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    BuyPlaced,
    Holding,
    SellPlaced,
    /// The exchange cancelled or expired the buy. The row stays until an
    /// operator removes it.
    BuyCancelled,
}

impl PositionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionState::BuyPlaced => "BUY_PLACED",
            PositionState::Holding => "HOLDING",
            PositionState::SellPlaced => "SELL_PLACED",
            PositionState::BuyCancelled => "BUY_CANCELLED",
        }
    }

    /// Side of the order currently outstanding in this state, if any.
    pub fn pending_side(&self) -> Option<Side> {
        match self {
            PositionState::BuyPlaced => Some(Side::Buy),
            PositionState::Holding | PositionState::BuyCancelled => None,
            PositionState::SellPlaced => Some(Side::Sell),
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY_PLACED" => Ok(PositionState::BuyPlaced),
            "HOLDING" => Ok(PositionState::Holding),
            "SELL_PLACED" => Ok(PositionState::SellPlaced),
            "BUY_CANCELLED" => Ok(PositionState::BuyCancelled),
            other => Err(format!("unknown position state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_price: Decimal,
    pub order_id: Option<String>,
    pub quantity: Decimal,
    pub state: PositionState,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// A freshly accepted buy.
    pub fn opened(symbol: &str, entry_price: Decimal, order_id: String, quantity: Decimal) -> Self {
        let now = Utc::now();
        Self {
            symbol: symbol.to_string(),
            entry_price,
            order_id: Some(order_id),
            quantity,
            state: PositionState::BuyPlaced,
            opened_at: now,
            updated_at: now,
        }
    }
}
