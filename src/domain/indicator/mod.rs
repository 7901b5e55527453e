//! Technical indicator implementations.
//!
//! This module provides:
//! - `Series`: an indicator sequence, index-aligned with the price bars,
//!   where `None` marks an undefined cell (warm-up or degenerate input)
//! - `IndicatorSet`: canonical-name → `Series` mapping
//! - `IndicatorConfig` / `WindowMode`: windows used by `compute_all`
//! - `IndicatorEngine`: validated entry point over one `PriceSeries`

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod stochastic;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::TRADING_DAYS_PER_YEAR;
use crate::domain::error::QuantError;
use crate::domain::ohlcv::PriceSeries;

pub use bollinger::BollingerBands;
pub use macd::MacdSeries;
pub use stochastic::StochasticSeries;

pub type Series = Vec<Option<f64>>;

/// Canonical indicator names used as `IndicatorSet` keys.
pub mod names {
    pub const SMA_20: &str = "SMA_20";
    pub const EMA_20: &str = "EMA_20";
    pub const RSI_14: &str = "RSI_14";
    pub const MACD: &str = "MACD";
    pub const MACD_SIGNAL: &str = "MACD_Signal";
    pub const MACD_HIST: &str = "MACD_Hist";
    pub const BB_UPPER: &str = "BB_Upper";
    pub const BB_MID: &str = "BB_Mid";
    pub const BB_LOWER: &str = "BB_Lower";
    pub const ATR_14: &str = "ATR_14";
    pub const STOCHASTIC_K: &str = "Stochastic_K";
    pub const STOCHASTIC_D: &str = "Stochastic_D";
    pub const CCI_20: &str = "CCI_20";
    pub const ADX_14: &str = "ADX_14";
    pub const OBV: &str = "OBV";

    pub const ALL: [&str; 15] = [
        SMA_20,
        EMA_20,
        RSI_14,
        MACD,
        MACD_SIGNAL,
        MACD_HIST,
        BB_UPPER,
        BB_MID,
        BB_LOWER,
        ATR_14,
        STOCHASTIC_K,
        STOCHASTIC_D,
        CCI_20,
        ADX_14,
        OBV,
    ];
}

/// Indicator sequences keyed by canonical name, all of length `len`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    len: usize,
    series: BTreeMap<String, Series>,
}

impl IndicatorSet {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            series: BTreeMap::new(),
        }
    }

    /// Insert a sequence; its length must match the set's length.
    pub fn insert(&mut self, name: impl Into<String>, values: Series) -> Result<(), QuantError> {
        let name = name.into();
        if values.len() != self.len {
            return Err(QuantError::invalid(format!(
                "indicator {name} has {} entries, expected {}",
                values.len(),
                self.len
            )));
        }
        self.series.insert(name, values);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[Option<f64>]> {
        self.series.get(name).map(Vec::as_slice)
    }

    /// Like `get`, but a missing indicator is malformed input.
    pub fn require(&self, name: &str) -> Result<&[Option<f64>], QuantError> {
        self.get(name)
            .ok_or_else(|| QuantError::invalid(format!("missing required indicator {name}")))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WindowMode {
    /// Windows are used exactly as configured.
    #[default]
    Fixed,
    /// SMA, EMA and Bollinger windows become floor(base * (1 + annualized
    /// volatility of the whole snapshot)). Results then depend on the full
    /// snapshot, so this is opt-in.
    VolatilityAdaptive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub atr_period: usize,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub cci_period: usize,
    pub adx_period: usize,
    pub window_mode: WindowMode,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            sma_period: 20,
            ema_period: 20,
            rsi_period: 14,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_std_dev: bollinger::DEFAULT_STD_DEV,
            atr_period: 14,
            stochastic_k: stochastic::DEFAULT_K_PERIOD,
            stochastic_d: stochastic::DEFAULT_D_PERIOD,
            cci_period: 20,
            adx_period: 14,
            window_mode: WindowMode::Fixed,
        }
    }
}

/// Computes indicators over one immutable price snapshot.
pub struct IndicatorEngine<'a> {
    series: &'a PriceSeries,
    config: IndicatorConfig,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(series: &'a PriceSeries) -> Self {
        Self::with_config(series, IndicatorConfig::default())
    }

    pub fn with_config(series: &'a PriceSeries, config: IndicatorConfig) -> Self {
        Self { series, config }
    }

    pub fn sma(&self, period: usize) -> Result<Series, QuantError> {
        check_period("sma", period)?;
        Ok(sma::calculate_sma(self.series.bars(), period))
    }

    pub fn ema(&self, period: usize) -> Result<Series, QuantError> {
        check_period("ema", period)?;
        Ok(ema::calculate_ema(self.series.bars(), period))
    }

    pub fn rsi(&self, period: usize) -> Result<Series, QuantError> {
        check_period("rsi", period)?;
        Ok(rsi::calculate_rsi(self.series.bars(), period))
    }

    pub fn macd(&self, fast: usize, slow: usize, signal: usize) -> Result<MacdSeries, QuantError> {
        check_period("macd fast", fast)?;
        check_period("macd slow", slow)?;
        check_period("macd signal", signal)?;
        Ok(macd::calculate_macd(self.series.bars(), fast, slow, signal))
    }

    pub fn bollinger(&self, period: usize, std_dev: f64) -> Result<BollingerBands, QuantError> {
        check_period("bollinger", period)?;
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(QuantError::invalid(format!(
                "bollinger std_dev must be non-negative, got {std_dev}"
            )));
        }
        Ok(bollinger::calculate_bollinger(self.series.bars(), period, std_dev))
    }

    pub fn atr(&self, period: usize) -> Result<Series, QuantError> {
        check_period("atr", period)?;
        Ok(atr::calculate_atr(self.series.bars(), period))
    }

    pub fn stochastic(&self, k_period: usize, d_period: usize) -> Result<StochasticSeries, QuantError> {
        check_period("stochastic k", k_period)?;
        check_period("stochastic d", d_period)?;
        Ok(stochastic::calculate_stochastic(self.series.bars(), k_period, d_period))
    }

    pub fn cci(&self, period: usize) -> Result<Series, QuantError> {
        check_period("cci", period)?;
        Ok(cci::calculate_cci(self.series.bars(), period))
    }

    pub fn adx(&self, period: usize) -> Result<Series, QuantError> {
        check_period("adx", period)?;
        Ok(adx::calculate_adx(self.series.bars(), period))
    }

    pub fn obv(&self) -> Series {
        obv::calculate_obv(self.series.bars())
    }

    /// Annualized volatility of close-to-close returns over the snapshot.
    /// Undefined for fewer than three bars.
    pub fn annualized_volatility(&self) -> Option<f64> {
        let returns: Vec<f64> = self.series.returns().into_iter().flatten().collect();
        if returns.len() < 2 {
            return None;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
    }

    /// The window actually used for `base` under the configured mode.
    pub fn effective_period(&self, base: usize) -> usize {
        match self.config.window_mode {
            WindowMode::Fixed => base,
            WindowMode::VolatilityAdaptive => match self.annualized_volatility() {
                Some(vol) => ((base as f64 * (1.0 + vol)).floor() as usize).max(1),
                None => base,
            },
        }
    }

    /// Every indicator under its canonical name.
    pub fn compute_all(&self) -> Result<IndicatorSet, QuantError> {
        let cfg = &self.config;
        let sma_period = self.effective_period(cfg.sma_period);
        let ema_period = self.effective_period(cfg.ema_period);
        let bollinger_period = self.effective_period(cfg.bollinger_period);
        if cfg.window_mode == WindowMode::VolatilityAdaptive {
            tracing::debug!(
                symbol = self.series.symbol(),
                sma_period,
                ema_period,
                bollinger_period,
                "adapted indicator windows"
            );
        }

        let macd = self.macd(cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)?;
        let bands = self.bollinger(bollinger_period, cfg.bollinger_std_dev)?;
        let stoch = self.stochastic(cfg.stochastic_k, cfg.stochastic_d)?;

        let mut set = IndicatorSet::new(self.series.len());
        set.insert(names::SMA_20, self.sma(sma_period)?)?;
        set.insert(names::EMA_20, self.ema(ema_period)?)?;
        set.insert(names::RSI_14, self.rsi(cfg.rsi_period)?)?;
        set.insert(names::MACD, macd.line)?;
        set.insert(names::MACD_SIGNAL, macd.signal)?;
        set.insert(names::MACD_HIST, macd.histogram)?;
        set.insert(names::BB_UPPER, bands.upper)?;
        set.insert(names::BB_MID, bands.middle)?;
        set.insert(names::BB_LOWER, bands.lower)?;
        set.insert(names::ATR_14, self.atr(cfg.atr_period)?)?;
        set.insert(names::STOCHASTIC_K, stoch.k)?;
        set.insert(names::STOCHASTIC_D, stoch.d)?;
        set.insert(names::CCI_20, self.cci(cfg.cci_period)?)?;
        set.insert(names::ADX_14, self.adx(cfg.adx_period)?)?;
        set.insert(names::OBV, self.obv())?;
        Ok(set)
    }
}

fn check_period(indicator: &str, period: usize) -> Result<(), QuantError> {
    if period == 0 {
        return Err(QuantError::invalid(format!(
            "{indicator} period must be at least 1"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::PriceBar;
    use chrono::NaiveDate;

    pub fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    pub fn make_hlc_bars(rows: &[(f64, f64, f64)]) -> Vec<PriceBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }
}
