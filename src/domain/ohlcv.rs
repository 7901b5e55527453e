//! Daily price bars and validated price series.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::QuantError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// An immutable, validated snapshot of daily bars for one symbol.
///
/// Dates are strictly ascending and unique. Gaps in the trading calendar are
/// not checked; that is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, QuantError> {
        let symbol = symbol.into();
        for (i, bar) in bars.iter().enumerate() {
            validate_bar(bar)?;
            if i > 0 {
                let prev = bars[i - 1].date;
                if bar.date == prev {
                    return Err(QuantError::invalid(format!(
                        "{symbol}: duplicate date {}",
                        bar.date
                    )));
                }
                if bar.date < prev {
                    return Err(QuantError::invalid(format!(
                        "{symbol}: dates not ascending ({} after {prev})",
                        bar.date
                    )));
                }
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Close-to-close simple returns, index-aligned with the bars.
    /// The first entry is undefined.
    pub fn returns(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.bars.len());
        for (i, bar) in self.bars.iter().enumerate() {
            if i == 0 {
                out.push(None);
            } else {
                out.push(Some(bar.close / self.bars[i - 1].close - 1.0));
            }
        }
        out
    }

    /// The series truncated to its first `len` bars.
    pub fn prefix(&self, len: usize) -> PriceSeries {
        PriceSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }
}

fn validate_bar(bar: &PriceBar) -> Result<(), QuantError> {
    let prices = [bar.open, bar.high, bar.low, bar.close];
    if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return Err(QuantError::invalid(format!(
            "{}: prices must be finite and positive",
            bar.date
        )));
    }
    if bar.high < bar.low {
        return Err(QuantError::invalid(format!(
            "{}: high {} below low {}",
            bar.date, bar.high, bar.low
        )));
    }
    if bar.volume < 0 {
        return Err(QuantError::invalid(format!(
            "{}: negative volume {}",
            bar.date, bar.volume
        )));
    }
    Ok(())
}
