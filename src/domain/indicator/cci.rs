//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP)) / (0.015 * MAD), where MAD is the mean absolute
//! deviation of TP from its window mean. Undefined when MAD is zero
//! relative to the mean's scale.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::RollingWindow;
use crate::domain::ohlcv::PriceBar;

const LAMBERT_CONSTANT: f64 = 0.015;
const FLAT_EPSILON: f64 = 1e-12;

pub fn calculate_cci(bars: &[PriceBar], period: usize) -> Series {
    let mut window = RollingWindow::new(period);
    bars.iter()
        .map(|bar| {
            let tp = bar.typical_price();
            window.push(Some(tp));
            window.mean()?;
            // MAD is O(n) per bar anyway, so take the mean from the window contents.
            let mean = window.defined_values().sum::<f64>() / period as f64;
            let mad = window.defined_values().map(|v| (v - mean).abs()).sum::<f64>()
                / period as f64;
            (mad > FLAT_EPSILON * mean.abs().max(1.0))
                .then(|| (tp - mean) / (LAMBERT_CONSTANT * mad))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_bars, make_hlc_bars};

    #[test]
    fn cci_known_value() {
        // TP = close when high == low == close: 1, 2, 3 → mean 2, MAD 2/3
        let series = calculate_cci(&make_bars(&[1.0, 2.0, 3.0]), 3);
        let expected = (3.0 - 2.0) / (0.015 * (2.0 / 3.0));
        assert!(series[1].is_none());
        assert!((series[2].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn cci_flat_is_undefined() {
        let series = calculate_cci(&make_bars(&[50.0; 4]), 2);
        assert!(series.iter().all(Option::is_none));
    }

    #[test]
    fn cci_flat_after_volatile_prefix_is_undefined() {
        let mut closes = vec![13.37, 250.91, 7.03, 99.99, 1234.567, 3.3, 42.42];
        closes.extend([100.1; 25]);
        let series = calculate_cci(&make_bars(&closes), 20);
        assert!(series[25].is_some());
        assert!(series[26..].iter().all(Option::is_none));
    }

    #[test]
    fn cci_uses_typical_price() {
        let bars = make_hlc_bars(&[(12.0, 6.0, 9.0), (15.0, 9.0, 12.0)]);
        // TP: 9, 12 → mean 10.5, MAD 1.5
        let series = calculate_cci(&bars, 2);
        let expected = (12.0 - 10.5) / (0.015 * 1.5);
        assert!((series[1].unwrap() - expected).abs() < 1e-9);
    }
}
