//! Strategy rules: pure functions from prices and indicators to signals.
//!
//! Each rule is a variant of [`StrategyRule`]; rules share no state, so the
//! [`StrategyEngine`] can evaluate them independently and in parallel. A bar
//! whose inputs are undefined yields an undefined signal, never a default 0.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::TRADING_DAYS_PER_YEAR;
use crate::domain::error::QuantError;
use crate::domain::indicator::rolling::{RollingCovariance, RollingWindow, rolling_mean};
use crate::domain::indicator::{IndicatorSet, Series, names};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::SignalSeries;

const MOMENTUM_WEIGHT: f64 = 0.4;
const SIZE_WEIGHT: f64 = 0.3;
const VALUE_WEIGHT: f64 = 0.3;

/// Externally supplied inputs some rules need, index-aligned with the prices.
///
/// A rule whose input is absent produces an all-undefined series.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyInputs<'a> {
    /// Benchmark prices on the same dates, for `hedging`.
    pub benchmark: Option<&'a PriceSeries>,
    /// Normalized size factor per bar, for `multi_factor`.
    pub size_scores: Option<&'a [Option<f64>]>,
    /// Normalized value factor per bar, for `multi_factor`.
    pub value_scores: Option<&'a [Option<f64>]>,
    /// Opaque point price prediction per bar, for `ml_signal`.
    pub predictions: Option<&'a [Option<f64>]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyRule {
    /// Long when close beats the previous bar's SMA(`smoothing`) of SMA_20.
    MomentumBreakout { smoothing: usize },
    /// Long below `oversold` RSI, short above `overbought`.
    MeanReversion { oversold: f64, overbought: f64 },
    /// Long when ATR exceeds its trailing mean plus one standard deviation.
    VolatilityArbitrage { window: usize },
    /// Weighted momentum/size/value score against `threshold`.
    MultiFactor { momentum_smoothing: usize, threshold: f64 },
    /// Trailing beta to the benchmark, signed against the day's move.
    /// Zero on a day the asset does not move.
    Hedging { window: usize },
    /// Prediction direction damped by realized-volatility bucket.
    MlSignal { volatility_window: usize },
}

impl StrategyRule {
    pub const NAMES: [&'static str; 6] = [
        "momentum_breakout",
        "mean_reversion",
        "volatility_arbitrage",
        "multi_factor",
        "hedging",
        "ml_signal",
    ];

    pub fn defaults() -> Vec<StrategyRule> {
        Self::NAMES
            .iter()
            .filter_map(|name| Self::from_name(name).ok())
            .collect()
    }

    /// The rule called `name`, with default parameters.
    pub fn from_name(name: &str) -> Result<StrategyRule, QuantError> {
        let rule = match name {
            "momentum_breakout" => StrategyRule::MomentumBreakout { smoothing: 1 },
            "mean_reversion" => StrategyRule::MeanReversion {
                oversold: 30.0,
                overbought: 70.0,
            },
            "volatility_arbitrage" => StrategyRule::VolatilityArbitrage { window: 20 },
            "multi_factor" => StrategyRule::MultiFactor {
                momentum_smoothing: 1,
                threshold: 0.5,
            },
            "hedging" => StrategyRule::Hedging { window: 60 },
            "ml_signal" => StrategyRule::MlSignal {
                volatility_window: 20,
            },
            other => {
                return Err(QuantError::invalid(format!("unknown strategy rule {other}")));
            }
        };
        Ok(rule)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyRule::MomentumBreakout { .. } => "momentum_breakout",
            StrategyRule::MeanReversion { .. } => "mean_reversion",
            StrategyRule::VolatilityArbitrage { .. } => "volatility_arbitrage",
            StrategyRule::MultiFactor { .. } => "multi_factor",
            StrategyRule::Hedging { .. } => "hedging",
            StrategyRule::MlSignal { .. } => "ml_signal",
        }
    }

    fn validate(&self) -> Result<(), QuantError> {
        let bad = |reason: &str| Err(QuantError::invalid(format!("{}: {reason}", self.name())));
        match *self {
            StrategyRule::MomentumBreakout { smoothing }
            | StrategyRule::MultiFactor {
                momentum_smoothing: smoothing,
                ..
            } if smoothing == 0 => bad("smoothing must be at least 1"),
            StrategyRule::MultiFactor { threshold, .. } if !threshold.is_finite() => {
                bad("threshold must be finite")
            }
            StrategyRule::MeanReversion {
                oversold,
                overbought,
            } if !(oversold.is_finite() && overbought.is_finite() && oversold < overbought) => {
                bad("oversold must be below overbought")
            }
            StrategyRule::VolatilityArbitrage { window }
            | StrategyRule::Hedging { window }
            | StrategyRule::MlSignal {
                volatility_window: window,
            } if window < 2 => bad("window must be at least 2"),
            _ => Ok(()),
        }
    }

    /// Evaluate this rule over one symbol.
    pub fn evaluate(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSet,
        inputs: &StrategyInputs<'_>,
    ) -> Result<SignalSeries, QuantError> {
        self.validate()?;
        check_inputs(series, indicators, inputs)?;

        let values = match *self {
            StrategyRule::MomentumBreakout { smoothing } => {
                momentum_breakout(series, indicators, smoothing)?
            }
            StrategyRule::MeanReversion {
                oversold,
                overbought,
            } => mean_reversion(indicators, oversold, overbought)?,
            StrategyRule::VolatilityArbitrage { window } => {
                volatility_arbitrage(indicators, window)?
            }
            StrategyRule::MultiFactor {
                momentum_smoothing,
                threshold,
            } => multi_factor(series, indicators, inputs, momentum_smoothing, threshold)?,
            StrategyRule::Hedging { window } => hedging(series, inputs, window),
            StrategyRule::MlSignal { volatility_window } => {
                ml_signal(series, inputs, volatility_window)
            }
        };

        tracing::debug!(
            symbol = series.symbol(),
            rule = self.name(),
            defined = values.iter().filter(|v| v.is_some()).count(),
            "evaluated strategy rule"
        );
        SignalSeries::aligned(series, values)
    }
}

fn check_inputs(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    inputs: &StrategyInputs<'_>,
) -> Result<(), QuantError> {
    if indicators.len() != series.len() {
        return Err(QuantError::invalid(format!(
            "indicator set has {} entries, price series has {}",
            indicators.len(),
            series.len()
        )));
    }
    let aligned = [
        ("size scores", inputs.size_scores),
        ("value scores", inputs.value_scores),
        ("predictions", inputs.predictions),
    ];
    for (label, values) in aligned {
        if let Some(v) = values {
            if v.len() != series.len() {
                return Err(QuantError::invalid(format!(
                    "{label} have {} entries, price series has {}",
                    v.len(),
                    series.len()
                )));
            }
        }
    }
    if let Some(benchmark) = inputs.benchmark {
        if benchmark.dates() != series.dates() {
            return Err(QuantError::invalid(format!(
                "benchmark {} dates do not match {}",
                benchmark.symbol(),
                series.symbol()
            )));
        }
    }
    Ok(())
}

fn momentum_breakout(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    smoothing: usize,
) -> Result<Series, QuantError> {
    let sma = indicators.require(names::SMA_20)?;
    let trend = rolling_mean(sma, smoothing);
    Ok(series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_trend = trend[i.checked_sub(1)?]?;
            Some(if bar.close > prev_trend { 1.0 } else { 0.0 })
        })
        .collect())
}

fn mean_reversion(
    indicators: &IndicatorSet,
    oversold: f64,
    overbought: f64,
) -> Result<Series, QuantError> {
    let rsi = indicators.require(names::RSI_14)?;
    Ok(rsi
        .iter()
        .map(|r| {
            let r = (*r)?;
            Some(if r < oversold {
                1.0
            } else if r > overbought {
                -1.0
            } else {
                0.0
            })
        })
        .collect())
}

fn volatility_arbitrage(indicators: &IndicatorSet, window: usize) -> Result<Series, QuantError> {
    let atr = indicators.require(names::ATR_14)?;
    let mut stats = RollingWindow::new(window);
    Ok(atr
        .iter()
        .map(|a| {
            stats.push(*a);
            let a = (*a)?;
            let band = stats.mean()? + stats.sample_std()?;
            Some(if a > band { 1.0 } else { 0.0 })
        })
        .collect())
}

fn multi_factor(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    inputs: &StrategyInputs<'_>,
    momentum_smoothing: usize,
    threshold: f64,
) -> Result<Series, QuantError> {
    let (Some(size), Some(value)) = (inputs.size_scores, inputs.value_scores) else {
        return Ok(vec![None; series.len()]);
    };
    let momentum = momentum_breakout(series, indicators, momentum_smoothing)?;
    Ok(momentum
        .iter()
        .zip(size)
        .zip(value)
        .map(|((m, s), v)| {
            let score = MOMENTUM_WEIGHT * (*m)? + SIZE_WEIGHT * (*s)? + VALUE_WEIGHT * (*v)?;
            Some(if score > threshold { 1.0 } else { 0.0 })
        })
        .collect())
}

fn hedging(series: &PriceSeries, inputs: &StrategyInputs<'_>, window: usize) -> Series {
    let Some(benchmark) = inputs.benchmark else {
        return vec![None; series.len()];
    };
    let asset = series.returns();
    let bench = benchmark.returns();
    let mut cov = RollingCovariance::new(window);

    asset
        .iter()
        .zip(&bench)
        .map(|(r, b)| {
            let pair = r.zip(*b);
            cov.push(pair);
            let (r, _) = pair?;
            let beta = cov.beta()?;
            Some(match r.partial_cmp(&0.0)? {
                Ordering::Greater => -beta,
                Ordering::Less => beta,
                Ordering::Equal => 0.0,
            })
        })
        .collect()
}

fn ml_signal(series: &PriceSeries, inputs: &StrategyInputs<'_>, volatility_window: usize) -> Series {
    let Some(predictions) = inputs.predictions else {
        return vec![None; series.len()];
    };
    let mut returns = RollingWindow::new(volatility_window);

    series
        .bars()
        .iter()
        .zip(series.returns())
        .zip(predictions)
        .map(|((bar, r), prediction)| {
            returns.push(r);
            let vol = returns.sample_std()? * TRADING_DAYS_PER_YEAR.sqrt();
            let base = if (*prediction)? > bar.close { 1.0 } else { -1.0 };
            Some(base * volatility_damping(vol))
        })
        .map(|v| v.map(|s: f64| if s == 0.0 { 0.0 } else { s }))
        .collect()
}

/// Full weight below 10% annualized volatility, half below 20%, none above.
pub fn volatility_damping(annualized_vol: f64) -> f64 {
    if annualized_vol < 0.10 {
        1.0
    } else if annualized_vol < 0.20 {
        0.5
    } else {
        0.0
    }
}

/// Evaluates a fixed set of rules over one symbol.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    rules: Vec<StrategyRule>,
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::new(StrategyRule::defaults())
    }
}

impl StrategyEngine {
    pub fn new(rules: Vec<StrategyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[StrategyRule] {
        &self.rules
    }

    /// Rule name → signal series. Fails if any rule rejects its input.
    pub fn evaluate_all(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSet,
        inputs: &StrategyInputs<'_>,
    ) -> Result<BTreeMap<String, SignalSeries>, QuantError> {
        self.rules
            .par_iter()
            .map(|rule| {
                rule.evaluate(series, indicators, inputs)
                    .map(|signals| (rule.name().to_string(), signals))
            })
            .collect()
    }
}
