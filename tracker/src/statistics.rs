use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Population standard deviation (divisor `n`). `None` for an empty slice.
pub fn population_std_dev(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

    Some(variance.sqrt())
}

/// Round to 2 decimal places, midpoint away from zero.
///
/// Non-finite or out-of-range inputs fall back to float rounding.
pub fn round_2dp(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| (value * 100.0).round() / 100.0)
}

/// Deviation as served by the API: population std-dev rounded to cents.
pub fn deviation(prices: &[f64]) -> Option<f64> {
    population_std_dev(prices).map(round_2dp)
}
