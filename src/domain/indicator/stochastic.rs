//! Stochastic Oscillator.
//!
//! %K = 100 * (C - LL(k)) / (HH(k) - LL(k)), undefined when HH == LL.
//! %D = SMA(d) of %K.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::{RollingExtreme, rolling_mean};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: Series,
    pub d: Series,
}

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> StochasticSeries {
    let mut highest = RollingExtreme::max(k_period);
    let mut lowest = RollingExtreme::min(k_period);

    let k: Series = bars
        .iter()
        .map(|bar| {
            highest.push(bar.high);
            lowest.push(bar.low);
            let (hh, ll) = (highest.value()?, lowest.value()?);
            let range = hh - ll;
            (range > 0.0).then(|| 100.0 * (bar.close - ll) / range)
        })
        .collect();
    let d = rolling_mean(&k, d_period);

    StochasticSeries { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_bars, make_hlc_bars};

    #[test]
    fn stochastic_close_at_high_is_100() {
        let bars = make_hlc_bars(&[(10.0, 8.0, 9.0), (12.0, 9.0, 11.0), (14.0, 10.0, 14.0)]);
        let s = calculate_stochastic(&bars, 3, 1);
        assert!(s.k[1].is_none());
        assert_eq!(s.k[2], Some(100.0));
        assert_eq!(s.d[2], Some(100.0));
    }

    #[test]
    fn stochastic_midpoint() {
        let bars = make_hlc_bars(&[(20.0, 10.0, 12.0), (18.0, 12.0, 15.0)]);
        let s = calculate_stochastic(&bars, 2, 1);
        assert_eq!(s.k[1], Some(50.0));
    }

    #[test]
    fn stochastic_flat_range_is_undefined() {
        let s = calculate_stochastic(&make_bars(&[100.0; 5]), 3, 2);
        assert!(s.k.iter().all(Option::is_none));
        assert!(s.d.iter().all(Option::is_none));
    }

    #[test]
    fn stochastic_d_warmup() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64 * 1.3).sin() * 5.0).collect();
        let bars = make_hlc_bars(
            &prices
                .iter()
                .map(|&p| (p + 1.0, p - 1.0, p))
                .collect::<Vec<_>>(),
        );
        let s = calculate_stochastic(&bars, DEFAULT_K_PERIOD, DEFAULT_D_PERIOD);
        assert!(s.k[12].is_none());
        assert!(s.k[13].is_some());
        assert!(s.d[14].is_none());
        assert!(s.d[15].is_some());
        for v in s.k.iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
