//! Externally supplied per-date inputs: factor scores and model predictions.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::ohlcv::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    Size,
    Value,
    Prediction,
}

impl Factor {
    pub const ALL: [Factor; 3] = [Factor::Size, Factor::Value, Factor::Prediction];

    /// File and column suffix, e.g. `size` in `AAPL_size.csv`.
    pub fn name(self) -> &'static str {
        match self {
            Factor::Size => "size",
            Factor::Value => "value",
            Factor::Prediction => "prediction",
        }
    }
}

/// Date-keyed values for one symbol and factor.
pub type FactorSeries = BTreeMap<NaiveDate, f64>;

/// Index-align `factor` with the bars of `series`; dates without a value are undefined.
pub fn align_factor(series: &PriceSeries, factor: &FactorSeries) -> Vec<Option<f64>> {
    series
        .bars()
        .iter()
        .map(|bar| factor.get(&bar.date).copied())
        .collect()
}
