// src/engine/controller.rs
use crate::config::StrategyConfig;
use crate::connectors::traits::MarketGateway;
use crate::error::BotResult;
use crate::storage::PositionStore;
use crate::strategies::pump::{compute_buy_order, compute_sell_order, sell_target, BuyParams};
use crate::types::{OrderStatus, Position, PositionState, Side};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause before the second attempt at recording an accepted buy.
const RECORD_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    /// A position row already exists for the symbol.
    PositionOpen,
    NoSignal,
    /// The exchange still has working orders for the symbol that no row
    /// accounts for.
    OrdersOpen { order_ids: Vec<String> },
    Placed {
        order_id: String,
        price: Decimal,
        quantity: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SellOutcome {
    NoPosition,
    /// The buy is not filled yet or a sell is already working.
    NotHolding(PositionState),
    BelowTarget {
        last_price: Decimal,
        target: Decimal,
    },
    Placed {
        order_id: String,
        price: Decimal,
        quantity: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No outstanding order of the requested side.
    NoOrder,
    Pending,
    /// Buy filled, position is now held.
    BuyFilled,
    /// Sell filled, position row removed.
    Closed,
    Cancelled,
}

/// Per-symbol position lifecycle: Idle -> BuyPlaced -> Holding -> SellPlaced
/// -> Idle. The gateway and the store are the only collaborators.
pub struct PositionController {
    gateway: Arc<dyn MarketGateway>,
    store: Arc<dyn PositionStore>,
    buy_params: BuyParams,
    sell_trigger_pct: Decimal,
}

impl PositionController {
    pub fn new(
        gateway: Arc<dyn MarketGateway>,
        store: Arc<dyn PositionStore>,
        strategy: &StrategyConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            buy_params: BuyParams::from(strategy),
            sell_trigger_pct: strategy.sell_trigger_pct,
        }
    }

    pub fn store(&self) -> &Arc<dyn PositionStore> {
        &self.store
    }

    /// Places a limit buy when the symbol is idle and pumping. The row is
    /// written only after the exchange accepted the order. Working orders on
    /// the exchange block the buy even when no row exists.
    pub async fn evaluate_buy(&self, symbol: &str) -> BotResult<BuyOutcome> {
        if self.store.get(symbol).await?.is_some() {
            debug!(%symbol, "Position already open, skipping buy");
            return Ok(BuyOutcome::PositionOpen);
        }

        let snapshot = self.gateway.get_price_snapshot(symbol).await?;
        let filters = self.gateway.get_symbol_filters(symbol).await?;

        let Some(plan) = compute_buy_order(&snapshot, &filters, &self.buy_params) else {
            debug!(
                %symbol,
                last_price = %snapshot.last_price,
                change_pct = %snapshot.percent_change_24h,
                "No pump"
            );
            return Ok(BuyOutcome::NoSignal);
        };

        let open = self.gateway.get_open_orders(symbol).await?;
        if !open.is_empty() {
            let order_ids: Vec<String> = open.into_iter().map(|o| o.order_id).collect();
            warn!(%symbol, ?order_ids, "Untracked open orders on the exchange, skipping buy");
            return Ok(BuyOutcome::OrdersOpen { order_ids });
        }

        let ack = self
            .gateway
            .place_limit_buy(symbol, plan.price, plan.quantity)
            .await?;

        info!(
            %symbol,
            order_id = %ack.order_id,
            status = ?ack.status,
            price = %plan.price,
            quantity = %plan.quantity,
            last_price = %snapshot.last_price,
            change_pct = %snapshot.percent_change_24h,
            "Buy placed"
        );

        let position = Position::opened(symbol, plan.price, ack.order_id.clone(), plan.quantity);
        if let Err(first) = self.store.upsert(&position).await {
            warn!(%symbol, order_id = %ack.order_id, error = %first, "Recording buy failed, retrying");
            tokio::time::sleep(RECORD_RETRY_DELAY).await;
            if let Err(e) = self.store.upsert(&position).await {
                error!(
                    %symbol,
                    order_id = %ack.order_id,
                    price = %plan.price,
                    quantity = %plan.quantity,
                    error = %e,
                    "Buy is live on the exchange but not recorded"
                );
                return Err(e.into());
            }
        }

        Ok(BuyOutcome::Placed {
            order_id: ack.order_id,
            price: plan.price,
            quantity: plan.quantity,
        })
    }

    /// Places a take-profit sell for a held position once the price is far
    /// enough above the entry. Entry price and quantity stay as recorded.
    pub async fn evaluate_sell(&self, symbol: &str) -> BotResult<SellOutcome> {
        let Some(position) = self.store.get(symbol).await? else {
            return Ok(SellOutcome::NoPosition);
        };
        if position.state != PositionState::Holding {
            debug!(%symbol, state = %position.state, "Not holding, skipping sell");
            return Ok(SellOutcome::NotHolding(position.state));
        }

        let snapshot = self.gateway.get_price_snapshot(symbol).await?;
        let filters = self.gateway.get_symbol_filters(symbol).await?;

        let Some(plan) = compute_sell_order(
            &snapshot,
            &filters,
            position.entry_price,
            position.quantity,
            self.sell_trigger_pct,
        ) else {
            let target = sell_target(position.entry_price, self.sell_trigger_pct);
            debug!(%symbol, last_price = %snapshot.last_price, %target, "Below take-profit");
            return Ok(SellOutcome::BelowTarget {
                last_price: snapshot.last_price,
                target,
            });
        };

        let ack = self
            .gateway
            .place_limit_sell(symbol, plan.price, plan.quantity)
            .await?;

        info!(
            %symbol,
            order_id = %ack.order_id,
            status = ?ack.status,
            price = %plan.price,
            quantity = %plan.quantity,
            entry_price = %position.entry_price,
            "Sell placed"
        );

        self.store
            .set_order_id(symbol, Some(&ack.order_id), PositionState::SellPlaced)
            .await?;

        Ok(SellOutcome::Placed {
            order_id: ack.order_id,
            price: plan.price,
            quantity: plan.quantity,
        })
    }

    /// Checks the outstanding order of `side` for the symbol. A filled sell
    /// closes the position; a filled buy turns it into a holding.
    pub async fn poll_order_status(&self, symbol: &str, side: Side) -> BotResult<PollOutcome> {
        let Some(position) = self.store.get(symbol).await? else {
            return Ok(PollOutcome::NoOrder);
        };
        let order_id = match (&position.order_id, position.state.pending_side()) {
            (Some(order_id), Some(pending)) if pending == side => order_id.clone(),
            _ => return Ok(PollOutcome::NoOrder),
        };

        let status = self.gateway.get_order_status(symbol, &order_id).await?;

        let outcome = match (side, status) {
            (_, OrderStatus::Pending) => {
                debug!(%symbol, %order_id, %side, "Not filled yet");
                PollOutcome::Pending
            }
            (Side::Buy, OrderStatus::Filled) => {
                self.store.set_state(symbol, PositionState::Holding).await?;
                info!(
                    %symbol,
                    %order_id,
                    price = %position.entry_price,
                    quantity = %position.quantity,
                    "Buy filled, holding"
                );
                PollOutcome::BuyFilled
            }
            (Side::Sell, OrderStatus::Filled) => {
                self.store.delete(symbol).await?;
                info!(
                    %symbol,
                    %order_id,
                    entry_price = %position.entry_price,
                    quantity = %position.quantity,
                    "Sell filled, position closed"
                );
                PollOutcome::Closed
            }
            (Side::Sell, OrderStatus::Cancelled) => {
                // Back to holding so the next sell scan can try again.
                self.store
                    .set_order_id(symbol, None, PositionState::Holding)
                    .await?;
                warn!(%symbol, %order_id, "Sell order cancelled, holding again");
                PollOutcome::Cancelled
            }
            (Side::Buy, OrderStatus::Cancelled) => {
                // Kept out of the poll rotation; only an operator removes it.
                self.store
                    .set_state(symbol, PositionState::BuyCancelled)
                    .await?;
                error!(
                    %symbol,
                    %order_id,
                    price = %position.entry_price,
                    quantity = %position.quantity,
                    "Buy order cancelled on the exchange, position needs manual cleanup"
                );
                PollOutcome::Cancelled
            }
        };

        Ok(outcome)
    }
}
