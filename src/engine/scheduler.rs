// src/engine/scheduler.rs
use crate::engine::controller::PositionController;
use crate::error::BotError;
use crate::types::Side;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Summary of one pass over a symbol list.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassReport {
    pub visited: usize,
    pub errors: usize,
    pub rate_limited: bool,
    pub retry_after: Option<Duration>,
}

impl PassReport {
    fn record(&mut self, symbol: &str, step: &str, err: BotError) {
        self.errors += 1;
        if err.is_rate_limited() {
            self.rate_limited = true;
            self.retry_after = self.retry_after.max(err.retry_after());
            warn!(%symbol, %step, error = %err, "Rate limited, ending pass");
        } else if err.is_transient() {
            warn!(%symbol, %step, error = %err, "Scan step failed, retrying next pass");
        } else {
            error!(%symbol, %step, error = %err, "Scan step failed");
        }
    }

    /// Sleep before the next pass: the interval, plus the exchange's
    /// Retry-After (or one more interval) after a rate limit.
    pub fn next_delay(&self, interval: Duration) -> Duration {
        if self.rate_limited {
            interval + self.retry_after.unwrap_or(interval)
        } else {
            interval
        }
    }
}

/// Drives the controller with two independent loops: buy scans over the
/// configured universe and sell scans over stored positions.
pub struct ScanScheduler {
    controller: Arc<PositionController>,
    symbols: Vec<String>,
    buy_interval: Duration,
    sell_interval: Duration,
}

impl ScanScheduler {
    pub fn new(
        controller: Arc<PositionController>,
        symbols: Vec<String>,
        buy_interval: Duration,
        sell_interval: Duration,
    ) -> Self {
        Self {
            controller,
            symbols,
            buy_interval,
            sell_interval,
        }
    }

    /// One buy-side pass, symbols in configured order. Errors are logged per
    /// symbol; only a rate limit ends the pass early.
    pub async fn run_buy_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        for symbol in &self.symbols {
            report.visited += 1;
            if let Err(e) = self.controller.evaluate_buy(symbol).await {
                report.record(symbol, "evaluate_buy", e);
                if report.rate_limited {
                    break;
                }
            }
            if let Err(e) = self.controller.poll_order_status(symbol, Side::Buy).await {
                report.record(symbol, "poll_buy", e);
                if report.rate_limited {
                    break;
                }
            }
        }

        report
    }

    /// One sell-side pass over every stored position.
    pub async fn run_sell_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        let positions = match self.controller.store().list_all().await {
            Ok(positions) => positions,
            Err(e) => {
                report.record("*", "list_positions", e.into());
                return report;
            }
        };

        for position in positions {
            let symbol = position.symbol.as_str();
            report.visited += 1;
            if let Err(e) = self.controller.evaluate_sell(symbol).await {
                report.record(symbol, "evaluate_sell", e);
                if report.rate_limited {
                    break;
                }
            }
            if let Err(e) = self.controller.poll_order_status(symbol, Side::Sell).await {
                report.record(symbol, "poll_sell", e);
                if report.rate_limited {
                    break;
                }
            }
        }

        report
    }

    async fn buy_loop(self: Arc<Self>) {
        info!(symbols = self.symbols.len(), "Looking for buy opportunities...");
        loop {
            let report = self.run_buy_pass().await;
            if report.errors > 0 {
                warn!(errors = report.errors, visited = report.visited, "Buy pass finished with errors");
            }
            tokio::time::sleep(report.next_delay(self.buy_interval)).await;
        }
    }

    async fn sell_loop(self: Arc<Self>) {
        info!("Looking for sell opportunities...");
        loop {
            let report = self.run_sell_pass().await;
            if report.errors > 0 {
                warn!(errors = report.errors, visited = report.visited, "Sell pass finished with errors");
            }
            tokio::time::sleep(report.next_delay(self.sell_interval)).await;
        }
    }

    /// Spawns both loops. They run until the process stops.
    pub fn spawn(self) -> (JoinHandle<()>, JoinHandle<()>) {
        let scheduler = Arc::new(self);
        let buy = tokio::spawn(scheduler.clone().buy_loop());
        let sell = tokio::spawn(scheduler.sell_loop());
        (buy, sell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::connectors::mock::MockGateway;
    use crate::error::GatewayError;
    use crate::storage::{PositionStore, SqlitePositionStore};
    use crate::types::{OrderStatus, Position, PositionState};
    use rust_decimal::Decimal;

    async fn scheduler(symbols: &[&str]) -> (Arc<MockGateway>, Arc<SqlitePositionStore>, ScanScheduler) {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(SqlitePositionStore::in_memory().await.unwrap());
        let controller = Arc::new(PositionController::new(
            gateway.clone(),
            store.clone(),
            &test_config().strategy,
        ));
        let scheduler = ScanScheduler::new(
            controller,
            symbols.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        (gateway, store, scheduler)
    }

    #[tokio::test]
    async fn failing_symbol_does_not_stop_the_pass() {
        let (gateway, store, scheduler) = scheduler(&["ADABTC", "LTCBTC"]).await;
        gateway.fail_snapshot("ADABTC", GatewayError::Network("timed out".to_string()));
        gateway.set_snapshot("LTCBTC", Decimal::from(100), Decimal::from(5));
        gateway.set_filters("LTCBTC", "0.01", "0.001");

        let report = scheduler.run_buy_pass().await;

        assert_eq!(report.visited, 2);
        assert_eq!(report.errors, 1);
        assert!(!report.rate_limited);
        assert!(store.get("ADABTC").await.unwrap().is_none());
        assert!(store.get("LTCBTC").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rate_limit_extends_the_next_sleep() {
        let (gateway, _store, scheduler) = scheduler(&["LTCBTC"]).await;
        gateway.fail_snapshot(
            "LTCBTC",
            GatewayError::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            },
        );

        let report = scheduler.run_buy_pass().await;

        assert!(report.rate_limited);
        assert_eq!(report.next_delay(Duration::from_secs(5)), Duration::from_secs(35));
        assert_eq!(
            PassReport::default().next_delay(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn rate_limit_ends_the_buy_pass() {
        let (gateway, store, scheduler) = scheduler(&["ADABTC", "LTCBTC"]).await;
        gateway.fail_snapshot("ADABTC", GatewayError::RateLimited { retry_after: None });
        gateway.set_snapshot("LTCBTC", Decimal::from(100), Decimal::from(5));
        gateway.set_filters("LTCBTC", "0.01", "0.001");

        let report = scheduler.run_buy_pass().await;

        assert!(report.rate_limited);
        assert_eq!(report.visited, 1);
        assert_eq!(report.errors, 1);
        assert!(gateway.placed_orders().is_empty());
        assert!(store.get("LTCBTC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rate_limit_ends_the_sell_pass() {
        let (gateway, store, scheduler) = scheduler(&[]).await;
        for symbol in ["ADABTC", "LTCBTC"] {
            let mut position = Position::opened(symbol, Decimal::from(100), "7".to_string(), Decimal::ONE);
            position.state = PositionState::Holding;
            store.upsert(&position).await.unwrap();
            gateway.set_filters(symbol, "0.01", "0.001");
        }
        gateway.fail_snapshot("ADABTC", GatewayError::RateLimited { retry_after: None });
        gateway.set_snapshot("LTCBTC", Decimal::from(120), Decimal::ZERO);

        let report = scheduler.run_sell_pass().await;

        assert!(report.rate_limited);
        assert_eq!(report.visited, 1);
        assert!(gateway.placed_orders().is_empty());
        assert_eq!(
            store.get("LTCBTC").await.unwrap().unwrap().state,
            PositionState::Holding
        );
    }

    #[tokio::test]
    async fn full_cycle_across_both_loops() {
        let (gateway, store, scheduler) = scheduler(&["LTCBTC"]).await;
        gateway.set_filters("LTCBTC", "0.01", "0.001");
        gateway.set_snapshot("LTCBTC", Decimal::from(100), Decimal::from(5));

        // buy placed, not yet filled
        scheduler.run_buy_pass().await;
        assert_eq!(
            store.get("LTCBTC").await.unwrap().unwrap().state,
            PositionState::BuyPlaced
        );

        // nothing to sell while the buy is working
        let report = scheduler.run_sell_pass().await;
        assert_eq!(report.visited, 1);
        assert_eq!(gateway.placed_orders().len(), 1);

        // buy fills on the next buy pass
        gateway.set_order_status("1", OrderStatus::Filled);
        scheduler.run_buy_pass().await;
        assert_eq!(
            store.get("LTCBTC").await.unwrap().unwrap().state,
            PositionState::Holding
        );

        // price reaches take-profit: sell placed, then filled
        gateway.set_snapshot("LTCBTC", Decimal::from(112), Decimal::from(12));
        scheduler.run_sell_pass().await;
        assert_eq!(gateway.placed_orders().len(), 2);
        gateway.set_order_status("2", OrderStatus::Filled);
        scheduler.run_sell_pass().await;

        assert!(store.list_all().await.unwrap().is_empty());

        // symbol is idle again and can be bought on the next pump
        scheduler.run_buy_pass().await;
        assert_eq!(gateway.placed_orders().len(), 3);
    }
}
