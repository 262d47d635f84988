use crate::error::GatewayError;
use crate::types::{MarketSnapshot, OrderAck, OrderStatus, SymbolFilters};
use async_trait::async_trait;
use rust_decimal::Decimal;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Everything the trading loop needs from an exchange.
#[async_trait]
pub trait MarketGateway: Send + Sync {
    async fn ping(&self) -> GatewayResult<()>;

    /// Symbols currently trading against `quote_asset`.
    async fn trading_symbols(&self, quote_asset: &str) -> GatewayResult<Vec<String>>;

    async fn get_price_snapshot(&self, symbol: &str) -> GatewayResult<MarketSnapshot>;

    async fn get_symbol_filters(&self, symbol: &str) -> GatewayResult<SymbolFilters>;

    async fn place_limit_buy(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck>;

    async fn place_limit_sell(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck>;

    async fn get_order_status(&self, symbol: &str, order_id: &str) -> GatewayResult<OrderStatus>;

    /// Orders still working on the exchange for `symbol`, including ones
    /// this process never recorded.
    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderAck>>;
}
