//! Bollinger Bands.
//!
//! - Middle: SMA(n) of close
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1) of the same
//! window. Default parameters: period=20, multiplier=2.0.
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::Series;
use crate::domain::indicator::rolling::RollingWindow;
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STD_DEV: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

pub fn calculate_bollinger(bars: &[PriceBar], period: usize, std_dev: f64) -> BollingerBands {
    let mut window = RollingWindow::new(period);
    let mut upper = Vec::with_capacity(bars.len());
    let mut middle = Vec::with_capacity(bars.len());
    let mut lower = Vec::with_capacity(bars.len());

    for bar in bars {
        window.push(Some(bar.close));
        let mid = window.mean();
        let width = window.sample_std().map(|sd| std_dev * sd);
        middle.push(mid);
        match (mid, width) {
            (Some(m), Some(w)) => {
                upper.push(Some(m + w));
                lower.push(Some(m - w));
            }
            _ => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
