//! Average True Range.
//!
//! TR[0] = high - low; TR[i] = max(high - low, |high - C[i-1]|, |low - C[i-1]|).
//! ATR(n) is the simple rolling mean of TR. Warmup: first (n-1) bars.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::ohlcv::PriceBar;

pub fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> Series {
    let tr: Vec<Option<f64>> = true_ranges(bars).into_iter().map(Some).collect();
    rolling_mean(&tr, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_hlc_bars;

    #[test]
    fn atr_warmup() {
        let bars = make_hlc_bars(&[(110.0, 90.0, 100.0); 5]);
        let series = calculate_atr(&bars, 3);
        assert_eq!(series.len(), 5);
        assert!(series[0].is_none());
        assert!(series[1].is_none());
        assert_eq!(series[2], Some(20.0));
        assert_eq!(series[4], Some(20.0));
    }

    #[test]
    fn atr_uses_gaps() {
        let bars = make_hlc_bars(&[
            (110.0, 100.0, 105.0),
            (130.0, 120.0, 125.0),
            (120.0, 110.0, 115.0),
        ]);
        // TR: 10, max(10, 25, 15)=25, max(10, 5, 15)=15
        assert_eq!(true_ranges(&bars), vec![10.0, 25.0, 15.0]);
        let series = calculate_atr(&bars, 2);
        assert_eq!(series[1], Some(17.5));
        assert_eq!(series[2], Some(20.0));
    }

    #[test]
    fn atr_insufficient_bars_all_undefined() {
        let bars = make_hlc_bars(&[(110.0, 90.0, 100.0); 2]);
        assert_eq!(calculate_atr(&bars, 5), vec![None, None]);
    }
}
