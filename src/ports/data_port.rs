//! Market data acquisition port.

use crate::domain::error::QuantError;
use crate::domain::factor::{Factor, FactorSeries};
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Full daily history for `symbol`, validated.
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, QuantError>;

    /// Externally supplied per-date factor values. `Ok(None)` when the source
    /// has nothing for this symbol and factor.
    fn fetch_factor(&self, symbol: &str, factor: Factor)
    -> Result<Option<FactorSeries>, QuantError>;

    fn list_symbols(&self) -> Result<Vec<String>, QuantError>;
}
