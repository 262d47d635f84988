// src/strategies/pump.rs
//! Pump detection and take-profit pricing. Pure functions, no I/O.

use crate::config::StrategyConfig;
use crate::types::{MarketSnapshot, OrderPlan, Side, SymbolFilters};
use crate::utils::precision::{normalize_price, normalize_quantity, with_step_precision};
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq)]
pub struct BuyParams {
    pub quote_budget: Decimal,
    pub markup_pct: Decimal,
    pub trigger_pct: Decimal,
}

impl From<&StrategyConfig> for BuyParams {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            quote_budget: config.buy_quote_budget,
            markup_pct: config.buy_markup_pct,
            trigger_pct: config.buy_trigger_pct,
        }
    }
}

/// Buy plan for a symbol whose 24h change is above the trigger.
///
/// The limit price is `last_price` marked up by `markup_pct` and floored to
/// the tick; the quantity spends at most `quote_budget` at that price,
/// floored to the step. Returns `None` when there is no pump or when the
/// floored order would be empty or below the exchange minimums.
pub fn compute_buy_order(
    snapshot: &MarketSnapshot,
    filters: &SymbolFilters,
    params: &BuyParams,
) -> Option<OrderPlan> {
    if snapshot.percent_change_24h <= params.trigger_pct {
        return None;
    }

    let target = snapshot.last_price * (Decimal::ONE + params.markup_pct / HUNDRED);
    let price = normalize_price(target, filters.tick_size);
    if price <= Decimal::ZERO {
        return None;
    }

    let quantity = normalize_quantity(params.quote_budget / price, filters.step_size);
    if quantity <= Decimal::ZERO || quantity < filters.min_qty {
        return None;
    }
    if price * quantity < filters.min_notional {
        return None;
    }

    Some(OrderPlan {
        side: Side::Buy,
        price,
        quantity,
    })
}

/// Take-profit plan: sell the whole holding at the current price once it is
/// at least `trigger_pct` above the entry price.
pub fn compute_sell_order(
    snapshot: &MarketSnapshot,
    filters: &SymbolFilters,
    entry_price: Decimal,
    held_quantity: Decimal,
    trigger_pct: Decimal,
) -> Option<OrderPlan> {
    if snapshot.last_price < sell_target(entry_price, trigger_pct) {
        return None;
    }

    let price = with_step_precision(snapshot.last_price, filters.tick_size);
    let quantity = with_step_precision(held_quantity, filters.step_size);
    if price <= Decimal::ZERO || quantity <= Decimal::ZERO {
        return None;
    }

    Some(OrderPlan {
        side: Side::Sell,
        price,
        quantity,
    })
}

/// Price at which a holding bought at `entry_price` becomes sellable.
pub fn sell_target(entry_price: Decimal, trigger_pct: Decimal) -> Decimal {
    entry_price * (Decimal::ONE + trigger_pct / HUNDRED)
}
