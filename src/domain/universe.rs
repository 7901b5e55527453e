//! Symbol universe: parses symbol lists from configuration and loads the
//! price history for each, skipping symbols whose data is missing.

use std::collections::HashSet;

use crate::domain::error::QuantError;
use crate::domain::ohlcv::PriceSeries;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

impl From<UniverseError> for QuantError {
    fn from(err: UniverseError) -> Self {
        QuantError::ConfigInvalid {
            section: "data".into(),
            key: "symbols".into(),
            reason: err.to_string(),
        }
    }
}

/// Comma-separated, case-insensitive symbol list, uppercased and de-duplicated.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SkippedSymbol>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.series.len()
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.iter().find(|s| s.symbol() == symbol)
    }
}

/// Fetch every symbol's prices. Symbols whose source is missing or unreadable,
/// or that have no bars, are skipped with a warning; it is an error if none
/// remain. Data that loads but fails validation aborts the call.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
) -> Result<Universe, QuantError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        match data_port.fetch_prices(symbol) {
            Ok(s) if s.is_empty() => {
                tracing::warn!(symbol = %symbol, "skipping symbol with no bars");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::Empty,
                });
            }
            Ok(s) => {
                tracing::debug!(symbol = %symbol, bars = s.len(), "loaded prices");
                series.push(s);
            }
            Err(e @ (QuantError::DataSource { .. } | QuantError::Io(_))) => {
                tracing::warn!(symbol = %symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "invalid price data");
                return Err(e);
            }
        }
    }

    if series.is_empty() {
        return Err(QuantError::DataSource {
            reason: format!("none of {} symbols had usable data", symbols.len()),
        });
    }
    if !skipped.is_empty() {
        tracing::info!(
            loaded = series.len(),
            requested = symbols.len(),
            "some symbols were skipped"
        );
    }

    Ok(Universe { series, skipped })
}
