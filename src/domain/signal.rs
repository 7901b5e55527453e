//! Signal series produced by strategy rules.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::QuantError;
use super::ohlcv::PriceSeries;

/// Per-date trading instructions, index-aligned with a `PriceSeries`.
///
/// Directional rules emit -1 (short), 0 (flat) or 1 (long); `None` marks a
/// bar whose inputs were undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSeries {
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl SignalSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Result<Self, QuantError> {
        if dates.len() != values.len() {
            return Err(QuantError::invalid(format!(
                "signal series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        if dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(QuantError::invalid(
                "signal dates must be strictly ascending",
            ));
        }
        Ok(Self { dates, values })
    }

    /// Aligns `values` with the dates of `series`.
    pub fn aligned(series: &PriceSeries, values: Vec<Option<f64>>) -> Result<Self, QuantError> {
        Self::new(series.dates(), values)
    }

    /// The same value on every bar of `series`.
    pub fn constant(series: &PriceSeries, value: f64) -> Self {
        Self {
            dates: series.dates(),
            values: vec![Some(value); series.len()],
        }
    }

    /// Value on `date`; `None` if the date is absent or the signal undefined.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .and_then(|idx| self.values[idx])
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
