#![allow(dead_code)]

use chrono::NaiveDate;
use quantcore::domain::error::QuantError;
use quantcore::domain::factor::{Factor, FactorSeries};
pub use quantcore::domain::ohlcv::{PriceBar, PriceSeries};
use quantcore::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub factors: HashMap<(String, Factor), FactorSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            factors: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_factor(mut self, symbol: &str, factor: Factor, values: FactorSeries) -> Self {
        self.factors.insert((symbol.to_string(), factor), values);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, QuantError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantError::DataSource {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => PriceSeries::new(symbol, bars.clone()),
            None => Err(QuantError::DataSource {
                reason: format!("no data for {symbol}"),
            }),
        }
    }

    fn fetch_factor(
        &self,
        symbol: &str,
        factor: Factor,
    ) -> Result<Option<FactorSeries>, QuantError> {
        Ok(self.factors.get(&(symbol.to_string(), factor)).cloned())
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars from 2024-01-01 with the given closes; high/low bracket the close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        })
        .collect()
}

/// `count` bars rising by one from `start_price`.
pub fn rising_bars(count: usize, start_price: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(&closes)
}

/// A deterministic wavy series with an upward drift.
pub fn wavy_bars(count: usize, start_price: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| start_price + 0.3 * i as f64 + 4.0 * (i as f64 * 0.45).sin())
        .collect();
    bars_from_closes(&closes)
}

pub fn series(symbol: &str, bars: Vec<PriceBar>) -> PriceSeries {
    PriceSeries::new(symbol, bars).unwrap()
}

pub fn write_price_csv(dir: &std::path::Path, symbol: &str, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}
