//! Simple Moving Average of close.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> Series {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close)).collect();
    rolling_mean(&closes, period)
}
