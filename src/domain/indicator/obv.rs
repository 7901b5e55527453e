//! OBV (On-Balance Volume).
//!
//! OBV[0] = 0
//! If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
//! If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
//! If close[i] == close[i-1]: OBV[i] = OBV[i-1]
//!
//! No warmup period; all bars are defined.

use crate::domain::indicator::Series;
use crate::domain::ohlcv::PriceBar;

pub fn calculate_obv(bars: &[PriceBar]) -> Series {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv: f64 = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].close;
            if bar.close > prev_close {
                obv += bar.volume as f64;
            } else if bar.close < prev_close {
                obv -= bar.volume as f64;
            }
        }
        values.push(Some(obv));
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn obv_empty_bars() {
        assert!(calculate_obv(&[]).is_empty());
    }

    #[test]
    fn obv_first_bar_is_zero() {
        assert_eq!(calculate_obv(&make_bars(&[100.0])), vec![Some(0.0)]);
    }

    #[test]
    fn obv_signed_by_direction() {
        let mut bars = make_bars(&[10.0, 11.0, 11.0, 9.0, 12.0]);
        let volumes = [100, 200, 300, 400, 500];
        for (bar, v) in bars.iter_mut().zip(volumes) {
            bar.volume = v;
        }
        let obv = calculate_obv(&bars);
        assert_eq!(
            obv,
            vec![Some(0.0), Some(200.0), Some(200.0), Some(-200.0), Some(300.0)]
        );
    }
}
