//! Average Directional Index.
//!
//! up = H[i] - H[i-1], down = L[i-1] - L[i]
//! +DM = up if up > down and up > 0, else 0; -DM symmetric.
//! ±DI = 100 * SMA(n) of ±DM / ATR(n)
//! DX = 100 * |+DI - -DI| / (+DI + -DI)
//! ADX = SMA(n) of DX
//!
//! Warmup: DX is defined from bar n, ADX from bar 2n-1.

use crate::domain::indicator::Series;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::ohlcv::PriceBar;

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> Series {
    let mut plus_dm: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    let mut minus_dm: Vec<Option<f64>> = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            plus_dm.push(None);
            minus_dm.push(None);
            continue;
        }
        let up = bar.high - bars[i - 1].high;
        let down = bars[i - 1].low - bar.low;
        plus_dm.push(Some(if up > down && up > 0.0 { up } else { 0.0 }));
        minus_dm.push(Some(if down > up && down > 0.0 { down } else { 0.0 }));
    }

    let atr = calculate_atr(bars, period);
    let plus_avg = rolling_mean(&plus_dm, period);
    let minus_avg = rolling_mean(&minus_dm, period);

    let dx: Series = (0..bars.len())
        .map(|i| {
            let tr = atr[i]?;
            if tr <= 0.0 {
                return None;
            }
            let plus_di = 100.0 * plus_avg[i]? / tr;
            let minus_di = 100.0 * minus_avg[i]? / tr;
            let total = plus_di + minus_di;
            (total > 0.0).then(|| 100.0 * (plus_di - minus_di).abs() / total)
        })
        .collect();

    rolling_mean(&dx, period)
}
