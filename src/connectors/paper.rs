// src/connectors/paper.rs
use crate::connectors::traits::{GatewayResult, MarketGateway};
use crate::error::GatewayError;
use crate::storage::PaperLedger;
use crate::types::{MarketSnapshot, OrderAck, OrderStatus, Side, SymbolFilters};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

const ID_PREFIX: &str = "paper-";

/// Reads real market data through `inner` but never sends orders. A paper
/// limit order fills once the last price crosses its limit. Working orders
/// are kept in the ledger, so they outlive the process.
pub struct PaperGateway {
    inner: Arc<dyn MarketGateway>,
    ledger: PaperLedger,
}

impl PaperGateway {
    pub fn new(inner: Arc<dyn MarketGateway>, ledger: PaperLedger) -> Self {
        Self { inner, ledger }
    }

    async fn record(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        if price <= Decimal::ZERO || quantity <= Decimal::ZERO {
            return Err(GatewayError::OrderRejected {
                code: -1013,
                msg: "price and quantity must be positive".to_string(),
            });
        }

        let id = self.ledger.insert(symbol, side, price, quantity).await?;
        let order_id = format!("{}{}", ID_PREFIX, id);
        info!(%symbol, %side, %price, %quantity, %order_id, "Paper order accepted");

        Ok(OrderAck {
            order_id,
            status: OrderStatus::Pending,
        })
    }
}

fn unknown_order(order_id: &str) -> GatewayError {
    GatewayError::OrderRejected {
        code: -2013,
        msg: format!("Order {} does not exist.", order_id),
    }
}

#[async_trait]
impl MarketGateway for PaperGateway {
    async fn ping(&self) -> GatewayResult<()> {
        self.inner.ping().await
    }

    async fn trading_symbols(&self, quote_asset: &str) -> GatewayResult<Vec<String>> {
        self.inner.trading_symbols(quote_asset).await
    }

    async fn get_price_snapshot(&self, symbol: &str) -> GatewayResult<MarketSnapshot> {
        self.inner.get_price_snapshot(symbol).await
    }

    async fn get_symbol_filters(&self, symbol: &str) -> GatewayResult<SymbolFilters> {
        self.inner.get_symbol_filters(symbol).await
    }

    async fn place_limit_buy(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        self.record(symbol, Side::Buy, price, quantity).await
    }

    async fn place_limit_sell(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        self.record(symbol, Side::Sell, price, quantity).await
    }

    /// A fill is reported once; the order leaves the ledger at that point.
    async fn get_order_status(&self, symbol: &str, order_id: &str) -> GatewayResult<OrderStatus> {
        let id = order_id
            .strip_prefix(ID_PREFIX)
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| unknown_order(order_id))?;

        let order = self
            .ledger
            .get(id)
            .await?
            .filter(|o| o.symbol == symbol)
            .ok_or_else(|| unknown_order(order_id))?;

        let last_price = self.inner.get_price_snapshot(symbol).await?.last_price;
        let crossed = match order.side {
            Side::Buy => last_price <= order.price,
            Side::Sell => last_price >= order.price,
        };
        if !crossed {
            return Ok(OrderStatus::Pending);
        }

        self.ledger.remove(id).await?;
        info!(
            %symbol,
            side = %order.side,
            price = %order.price,
            quantity = %order.quantity,
            %last_price,
            %order_id,
            "Paper order filled"
        );
        Ok(OrderStatus::Filled)
    }

    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderAck>> {
        Ok(self
            .ledger
            .open_for(symbol)
            .await?
            .into_iter()
            .map(|o| OrderAck {
                order_id: format!("{}{}", ID_PREFIX, o.id),
                status: OrderStatus::Pending,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::mock::MockGateway;
    use crate::storage::SqlitePositionStore;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    async fn paper_over(market: Arc<MockGateway>) -> PaperGateway {
        let store = SqlitePositionStore::in_memory().await.unwrap();
        PaperGateway::new(market, store.paper_ledger().await.unwrap())
    }

    #[tokio::test]
    async fn buy_fills_once_price_drops_to_limit() {
        let market = Arc::new(MockGateway::new());
        market.set_snapshot("LTCBTC", dec(105), dec(5));
        let paper = paper_over(market.clone()).await;

        let ack = paper.place_limit_buy("LTCBTC", dec(101), dec(1)).await.unwrap();
        assert!(ack.order_id.starts_with("paper-"));
        assert_eq!(
            paper.get_order_status("LTCBTC", &ack.order_id).await.unwrap(),
            OrderStatus::Pending
        );
        assert_eq!(paper.get_open_orders("LTCBTC").await.unwrap().len(), 1);

        market.set_snapshot("LTCBTC", dec(100), dec(5));
        assert_eq!(
            paper.get_order_status("LTCBTC", &ack.order_id).await.unwrap(),
            OrderStatus::Filled
        );
        assert!(market.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn reported_fill_leaves_the_ledger() {
        let market = Arc::new(MockGateway::new());
        market.set_snapshot("LTCBTC", dec(110), dec(0));
        let paper = paper_over(market.clone()).await;

        let ack = paper.place_limit_sell("LTCBTC", dec(110), dec(2)).await.unwrap();
        assert_eq!(
            paper.get_order_status("LTCBTC", &ack.order_id).await.unwrap(),
            OrderStatus::Filled
        );

        assert!(paper.get_open_orders("LTCBTC").await.unwrap().is_empty());
        let err = paper
            .get_order_status("LTCBTC", &ack.order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::OrderRejected { code: -2013, .. }));
    }

    #[tokio::test]
    async fn working_orders_survive_a_restart() {
        let path = std::env::temp_dir().join(format!("pump_sniper_paper_{}.db", uuid::Uuid::new_v4().simple()));
        let url = format!("sqlite:{}", path.display());
        let market = Arc::new(MockGateway::new());
        market.set_snapshot("LTCBTC", dec(105), dec(5));

        let order_id = {
            let store = SqlitePositionStore::connect(&url).await.unwrap();
            let paper = PaperGateway::new(market.clone(), store.paper_ledger().await.unwrap());
            let ack = paper.place_limit_buy("LTCBTC", dec(101), dec(1)).await.unwrap();
            store.close().await;
            ack.order_id
        };

        let store = SqlitePositionStore::connect(&url).await.unwrap();
        let paper = PaperGateway::new(market.clone(), store.paper_ledger().await.unwrap());
        assert_eq!(
            paper.get_order_status("LTCBTC", &order_id).await.unwrap(),
            OrderStatus::Pending
        );
        market.set_snapshot("LTCBTC", dec(100), dec(5));
        assert_eq!(
            paper.get_order_status("LTCBTC", &order_id).await.unwrap(),
            OrderStatus::Filled
        );

        // a fresh order after the restart gets a new id
        let next = paper.place_limit_buy("LTCBTC", dec(99), dec(1)).await.unwrap();
        assert_ne!(next.order_id, order_id);

        store.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn unknown_order_is_rejected() {
        let paper = paper_over(Arc::new(MockGateway::new())).await;
        for order_id in ["paper-99", "28"] {
            let err = paper.get_order_status("LTCBTC", order_id).await.unwrap_err();
            assert!(matches!(err, GatewayError::OrderRejected { code: -2013, .. }));
        }
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let paper = paper_over(Arc::new(MockGateway::new())).await;
        let err = paper
            .place_limit_buy("LTCBTC", dec(1), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::OrderRejected { .. }));
        assert!(paper.get_open_orders("LTCBTC").await.unwrap().is_empty());
    }
}
