// src/connectors/mock.rs
//! Scriptable in-memory gateway for tests.
use crate::connectors::traits::{GatewayResult, MarketGateway};
use crate::error::GatewayError;
use crate::types::{MarketSnapshot, OrderAck, OrderStatus, Side, SymbolFilters};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_id: String,
}

#[derive(Default)]
struct MockState {
    snapshots: HashMap<String, MarketSnapshot>,
    filters: HashMap<String, SymbolFilters>,
    statuses: HashMap<String, OrderStatus>,
    snapshot_errors: HashMap<String, GatewayError>,
    order_error: Option<GatewayError>,
    placed: Vec<PlacedOrder>,
    status_queries: Vec<String>,
    next_id: u64,
}

#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, symbol: &str, last_price: Decimal, percent_change_24h: Decimal) {
        self.state.lock().unwrap().snapshots.insert(
            symbol.to_string(),
            MarketSnapshot {
                symbol: symbol.to_string(),
                last_price,
                percent_change_24h,
            },
        );
    }

    pub fn set_filters(&self, symbol: &str, tick_size: &str, step_size: &str) {
        self.state.lock().unwrap().filters.insert(
            symbol.to_string(),
            SymbolFilters::new(
                Decimal::from_str(tick_size).unwrap(),
                Decimal::from_str(step_size).unwrap(),
            ),
        );
    }

    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(order_id.to_string(), status);
    }

    pub fn fail_snapshot(&self, symbol: &str, error: GatewayError) {
        self.state
            .lock()
            .unwrap()
            .snapshot_errors
            .insert(symbol.to_string(), error);
    }

    pub fn fail_orders(&self, error: GatewayError) {
        self.state.lock().unwrap().order_error = Some(error);
    }

    pub fn placed_orders(&self) -> Vec<PlacedOrder> {
        self.state.lock().unwrap().placed.clone()
    }

    pub fn status_queries(&self) -> Vec<String> {
        self.state.lock().unwrap().status_queries.clone()
    }

    fn place(&self, symbol: &str, side: Side, price: Decimal, quantity: Decimal) -> GatewayResult<OrderAck> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.order_error.clone() {
            return Err(err);
        }
        state.next_id += 1;
        let order_id = state.next_id.to_string();
        state.placed.push(PlacedOrder {
            symbol: symbol.to_string(),
            side,
            price,
            quantity,
            order_id: order_id.clone(),
        });
        state.statuses.insert(order_id.clone(), OrderStatus::Pending);
        Ok(OrderAck {
            order_id,
            status: OrderStatus::Pending,
        })
    }
}

#[async_trait]
impl MarketGateway for MockGateway {
    async fn ping(&self) -> GatewayResult<()> {
        Ok(())
    }

    async fn trading_symbols(&self, _quote_asset: &str) -> GatewayResult<Vec<String>> {
        let mut symbols: Vec<String> = self.state.lock().unwrap().snapshots.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    async fn get_price_snapshot(&self, symbol: &str) -> GatewayResult<MarketSnapshot> {
        let state = self.state.lock().unwrap();
        if let Some(err) = state.snapshot_errors.get(symbol) {
            return Err(err.clone());
        }
        state
            .snapshots
            .get(symbol)
            .cloned()
            .ok_or_else(|| GatewayError::DataInconsistency(format!("no ticker for {}", symbol)))
    }

    async fn get_symbol_filters(&self, symbol: &str) -> GatewayResult<SymbolFilters> {
        self.state
            .lock()
            .unwrap()
            .filters
            .get(symbol)
            .cloned()
            .ok_or_else(|| GatewayError::DataInconsistency(format!("no filters for {}", symbol)))
    }

    async fn place_limit_buy(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        self.place(symbol, Side::Buy, price, quantity)
    }

    async fn place_limit_sell(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        self.place(symbol, Side::Sell, price, quantity)
    }

    async fn get_order_status(&self, _symbol: &str, order_id: &str) -> GatewayResult<OrderStatus> {
        let mut state = self.state.lock().unwrap();
        state.status_queries.push(order_id.to_string());
        state
            .statuses
            .get(order_id)
            .copied()
            .ok_or_else(|| GatewayError::OrderRejected {
                code: -2013,
                msg: "Order does not exist.".to_string(),
            })
    }

    /// Every placed order whose scripted status is still pending.
    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderAck>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .placed
            .iter()
            .filter(|o| o.symbol == symbol)
            .filter(|o| state.statuses.get(&o.order_id) == Some(&OrderStatus::Pending))
            .map(|o| OrderAck {
                order_id: o.order_id.clone(),
                status: OrderStatus::Pending,
            })
            .collect())
    }
}
