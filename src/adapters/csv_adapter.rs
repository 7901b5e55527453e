//! CSV file adapters: a `DataPort` over a directory of per-symbol files, and
//! the tabular readers and writers used by the command line.
//!
//! Layout: `<dir>/<SYMBOL>.csv` with `date,open,high,low,close,volume`, and
//! `<dir>/<SYMBOL>_<factor>.csv` with `date,value`.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::domain::config_validation::DATE_FORMAT;
use crate::domain::error::QuantError;
use crate::domain::factor::{Factor, FactorSeries};
use crate::domain::indicator::IndicatorSet;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::domain::signal::SignalSeries;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn factor_path(&self, symbol: &str, factor: Factor) -> PathBuf {
        self.base_path
            .join(format!("{symbol}_{}.csv", factor.name()))
    }
}

fn data_error(path: &Path, detail: impl std::fmt::Display) -> QuantError {
    QuantError::DataSource {
        reason: format!("{}: {detail}", path.display()),
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, name: &str, path: &Path) -> Result<&'r str, QuantError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| data_error(path, format!("missing {name} column")))
}

fn parse_field<T>(record: &csv::StringRecord, idx: usize, name: &str, path: &Path) -> Result<T, QuantError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = field(record, idx, name, path)?;
    raw.parse()
        .map_err(|e| data_error(path, format!("invalid {name} value '{raw}': {e}")))
}

fn parse_date(record: &csv::StringRecord, path: &Path) -> Result<NaiveDate, QuantError> {
    let raw = field(record, 0, "date", path)?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| data_error(path, format!("invalid date '{raw}': {e}")))
}

/// Read `date,<value>` rows keyed by date.
fn read_dated_values<R: Read>(reader: R, path: &Path) -> Result<BTreeMap<NaiveDate, f64>, QuantError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut values = BTreeMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| data_error(path, format!("CSV parse error: {e}")))?;
        let date = parse_date(&record, path)?;
        let value: f64 = parse_field(&record, 1, "value", path)?;
        if values.insert(date, value).is_some() {
            return Err(data_error(path, format!("duplicate date {date}")));
        }
    }
    Ok(values)
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, QuantError> {
        let path = self.price_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| data_error(&path, e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_error(&path, format!("CSV parse error: {e}")))?;
            bars.push(PriceBar {
                date: parse_date(&record, &path)?,
                open: parse_field(&record, 1, "open", &path)?,
                high: parse_field(&record, 2, "high", &path)?,
                low: parse_field(&record, 3, "low", &path)?,
                close: parse_field(&record, 4, "close", &path)?,
                volume: parse_field(&record, 5, "volume", &path)?,
            });
        }

        PriceSeries::new(symbol, bars)
    }

    fn fetch_factor(
        &self,
        symbol: &str,
        factor: Factor,
    ) -> Result<Option<FactorSeries>, QuantError> {
        let path = self.factor_path(symbol, factor);
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&path).map_err(|e| data_error(&path, e))?;
        read_dated_values(file, &path).map(Some)
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| data_error(&self.base_path, e))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(&self.base_path, e))?;
            let name = entry.file_name();
            let Some(stem) = name.to_string_lossy().strip_suffix(".csv").map(str::to_string) else {
                continue;
            };
            let is_factor = Factor::ALL
                .iter()
                .any(|f| stem.ends_with(&format!("_{}", f.name())));
            if !is_factor {
                symbols.push(stem);
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Read a `date,return` file, returning the values in date order.
pub fn read_returns(path: &Path) -> Result<Vec<(NaiveDate, f64)>, QuantError> {
    let file = fs::File::open(path).map_err(|e| data_error(path, e))?;
    Ok(read_dated_values(file, path)?.into_iter().collect())
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per bar: date, close, then every indicator. Undefined cells are empty.
pub fn write_indicator_table<W: Write>(
    writer: W,
    series: &PriceSeries,
    indicators: &IndicatorSet,
) -> Result<(), QuantError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let names: Vec<&str> = indicators.names().collect();

    let mut header = vec!["date", "close"];
    header.extend(&names);
    wtr.write_record(&header).map_err(csv_write_error)?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut row = vec![bar.date.format(DATE_FORMAT).to_string(), bar.close.to_string()];
        row.extend(
            names
                .iter()
                .map(|name| cell(indicators.get(name).and_then(|s| s[i]))),
        );
        wtr.write_record(&row).map_err(csv_write_error)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per date, one column per rule.
pub fn write_signal_table<W: Write>(
    writer: W,
    series: &PriceSeries,
    signals: &BTreeMap<String, SignalSeries>,
) -> Result<(), QuantError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["date"];
    header.extend(signals.keys().map(String::as_str));
    wtr.write_record(&header).map_err(csv_write_error)?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut row = vec![bar.date.format(DATE_FORMAT).to_string()];
        row.extend(
            signals
                .values()
                .map(|s| cell(s.values().get(i).copied().flatten())),
        );
        wtr.write_record(&row).map_err(csv_write_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn csv_write_error(e: csv::Error) -> QuantError {
    QuantError::Io(std::io::Error::other(e))
}
