// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits implied by a tick or step size.
/// Example: step=0.00100000 -> 3, step=1.00000000 -> 0
pub fn decimals_of(step: Decimal) -> u32 {
    step.normalize().scale()
}

/// Rounds quantity DOWN to the nearest multiple of step_size.
/// Example: amount=10.999, step=1.0 -> 10
pub fn normalize_quantity(amount: Decimal, step_size: Decimal) -> Decimal {
    floor_to_step(amount, step_size)
}

/// Rounds price DOWN to the nearest multiple of tick_size. Rounding up could
/// produce a price the exchange rejects.
/// Example: price=100.16, tick=0.1 -> 100.1
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    floor_to_step(price, tick_size)
}

fn floor_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    let floored = (value / step).floor() * step;
    with_step_precision(floored, step)
}

/// Sets the scale to exactly the step's fractional digits, truncating any
/// excess, so `to_string()` yields the fixed-digit form the exchange expects.
pub fn with_step_precision(value: Decimal, step: Decimal) -> Decimal {
    let dp = decimals_of(step);
    let mut v = value.round_dp_with_strategy(dp, RoundingStrategy::ToZero);
    v.rescale(dp);
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn decimals_follow_significant_step_digits() {
        assert_eq!(decimals_of(d("0.00100000")), 3);
        assert_eq!(decimals_of(d("0.01")), 2);
        assert_eq!(decimals_of(d("1.00000000")), 0);
        assert_eq!(decimals_of(d("0.00000100")), 6);
    }

    #[test]
    fn quantity_is_floored_to_step() {
        assert_eq!(normalize_quantity(d("10.999"), d("1.0")), d("10"));
        assert_eq!(normalize_quantity(d("0.0990099"), d("0.001")).to_string(), "0.099");
    }

    #[test]
    fn price_is_floored_never_rounded_up() {
        assert_eq!(normalize_price(d("100.16"), d("0.1")).to_string(), "100.1");
        assert_eq!(normalize_price(d("101"), d("0.01")).to_string(), "101.00");
        assert_eq!(normalize_price(d("0.0035999"), d("0.000001")).to_string(), "0.003599");
    }

    #[test]
    fn zero_step_leaves_value_untouched() {
        assert_eq!(normalize_price(d("1.23456"), Decimal::ZERO), d("1.23456"));
    }

    #[test]
    fn fixed_digits_pad_and_truncate() {
        assert_eq!(with_step_precision(d("110"), d("0.01")).to_string(), "110.00");
        assert_eq!(with_step_precision(d("1.23456"), d("0.001")).to_string(), "1.234");
    }
}
