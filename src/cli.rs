//! CLI definition and dispatch.
//!
//! Each subcommand loads and validates its configuration, acquires data through
//! a [`DataPort`], runs the domain computations and writes machine-readable
//! output to stdout (or `--output`). Diagnostics go to the tracing subscriber.

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self, BacktestConfig, BacktestJob, BacktestResult};
use crate::domain::config_validation::{parse_date, validate_config};
use crate::domain::error::QuantError;
use crate::domain::factor::{Factor, align_factor};
use crate::domain::indicator::{IndicatorConfig, IndicatorEngine, IndicatorSet, WindowMode};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::portfolio::{self, PortfolioSummary};
use crate::domain::risk::{RiskConfig, RiskEngine, RiskReport};
use crate::domain::signal::SignalSeries;
use crate::domain::strategy::{StrategyEngine, StrategyInputs, StrategyRule};
use crate::domain::universe::{load_universe, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "quantcore",
    about = "Technical indicators, strategy signals, backtests and risk metrics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the indicator table for one symbol as CSV
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write every strategy rule's signals for one symbol as CSV
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest a strategy rule over the configured symbols
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        rule: Option<String>,
    },
    /// Equal-weight portfolio summary over the configured symbols
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Compute risk metrics from a `date,return` CSV
    Risk {
        #[arg(long)]
        returns: PathBuf,
        #[arg(long)]
        benchmark: Option<PathBuf>,
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,
        #[arg(long, default_value_t = 0.01)]
        risk_free_rate: f64,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Indicators {
            config,
            symbol,
            output,
        } => run_indicators(&config, symbol.as_deref(), output.as_deref()),
        Command::Signals {
            config,
            symbol,
            output,
        } => run_signals(&config, symbol.as_deref(), output.as_deref()),
        Command::Backtest {
            config,
            symbol,
            rule,
        } => run_backtest(&config, symbol.as_deref(), rule.as_deref()),
        Command::Portfolio { config, symbols } => run_portfolio(&config, symbols.as_deref()),
        Command::Risk {
            returns,
            benchmark,
            confidence,
            risk_free_rate,
        } => run_risk(
            &returns,
            benchmark.as_deref(),
            RiskConfig {
                confidence,
                risk_free_rate,
            },
        ),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

/// Load an INI file and validate every section.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantError> {
    tracing::info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

fn data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, QuantError> {
    let dir = config
        .get_string("data", "dir")
        .ok_or_else(|| QuantError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir.trim())))
}

fn usize_key(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, QuantError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| QuantError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{value} is not a valid window"),
    })
}

pub fn build_indicator_config(config: &dyn ConfigPort) -> IndicatorConfig {
    let window_mode = if config.get_bool("indicators", "adaptive", false) {
        WindowMode::VolatilityAdaptive
    } else {
        WindowMode::Fixed
    };
    IndicatorConfig {
        window_mode,
        ..IndicatorConfig::default()
    }
}

/// All six rules with their configured parameters.
pub fn build_strategy_rules(config: &dyn ConfigPort) -> Result<Vec<StrategyRule>, QuantError> {
    let smoothing = usize_key(config, "strategy", "momentum_smoothing", 1)?;
    Ok(vec![
        StrategyRule::MomentumBreakout { smoothing },
        StrategyRule::MeanReversion {
            oversold: config.get_double("strategy", "oversold", 30.0),
            overbought: config.get_double("strategy", "overbought", 70.0),
        },
        StrategyRule::VolatilityArbitrage {
            window: usize_key(config, "strategy", "volatility_window", 20)?,
        },
        StrategyRule::MultiFactor {
            momentum_smoothing: smoothing,
            threshold: config.get_double("strategy", "multi_factor_threshold", 0.5),
        },
        StrategyRule::Hedging {
            window: usize_key(config, "strategy", "hedge_window", 60)?,
        },
        StrategyRule::MlSignal {
            volatility_window: usize_key(config, "strategy", "ml_volatility_window", 20)?,
        },
    ])
}

/// The rule named by `rule_override`, else `[strategy] rule`, else momentum_breakout.
pub fn build_strategy_rule(
    config: &dyn ConfigPort,
    rule_override: Option<&str>,
) -> Result<StrategyRule, QuantError> {
    let name = rule_override
        .map(str::to_string)
        .or_else(|| config.get_string("strategy", "rule"))
        .unwrap_or_else(|| "momentum_breakout".to_string());
    let name = name.trim();
    build_strategy_rules(config)?
        .into_iter()
        .find(|rule| rule.name() == name)
        .ok_or_else(|| QuantError::invalid(format!("unknown strategy rule {name}")))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, QuantError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        start_date: parse_date(config, "backtest", "start_date")?,
        end_date: parse_date(config, "backtest", "end_date")?,
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
        allow_shorting: config.get_bool("backtest", "allow_shorting", defaults.allow_shorting),
        commission_per_trade: config.get_double("backtest", "commission_per_trade", 0.0),
        commission_pct: config.get_double("backtest", "commission_pct", 0.0),
        slippage_pct: config.get_double("backtest", "slippage_pct", 0.0),
    })
}

pub fn build_risk_config(config: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    RiskConfig {
        confidence: config.get_double("risk", "confidence", defaults.confidence),
        risk_free_rate: config.get_double("risk", "risk_free_rate", defaults.risk_free_rate),
    }
}

/// `--symbol` if given, else `[data] symbols`, else every symbol the source has.
/// The benchmark symbol is never traded.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, QuantError> {
    let mut symbols = match symbol_override {
        Some(s) => parse_symbols(s)?,
        None => match config.get_string("data", "symbols") {
            Some(s) => parse_symbols(&s)?,
            None => data_port.list_symbols()?,
        },
    };
    if symbol_override.is_none() {
        if let Some(benchmark) = benchmark_symbol(config) {
            symbols.retain(|s| *s != benchmark);
        }
    }
    if symbols.is_empty() {
        return Err(QuantError::DataSource {
            reason: "no symbols to process".into(),
        });
    }
    Ok(symbols)
}

fn benchmark_symbol(config: &dyn ConfigPort) -> Option<String> {
    config
        .get_string("data", "benchmark")
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

/// Auxiliary inputs for one symbol, already index-aligned with its prices.
#[derive(Debug, Clone, Default)]
pub struct SymbolInputs {
    pub benchmark: Option<PriceSeries>,
    pub size_scores: Option<Vec<Option<f64>>>,
    pub value_scores: Option<Vec<Option<f64>>>,
    pub predictions: Option<Vec<Option<f64>>>,
}

impl SymbolInputs {
    pub fn as_strategy_inputs(&self) -> StrategyInputs<'_> {
        StrategyInputs {
            benchmark: self.benchmark.as_ref(),
            size_scores: self.size_scores.as_deref(),
            value_scores: self.value_scores.as_deref(),
            predictions: self.predictions.as_deref(),
        }
    }
}

/// The benchmark restricted to `series`' dates, if it covers all of them.
fn align_benchmark(series: &PriceSeries, benchmark: &PriceSeries) -> Option<PriceSeries> {
    let wanted = series.dates();
    let bars: Vec<_> = benchmark
        .bars()
        .iter()
        .filter(|b| wanted.binary_search(&b.date).is_ok())
        .cloned()
        .collect();
    if bars.len() != wanted.len() {
        tracing::warn!(
            symbol = series.symbol(),
            benchmark = benchmark.symbol(),
            "benchmark does not cover every date; hedging signals will be undefined"
        );
        return None;
    }
    PriceSeries::new(benchmark.symbol(), bars).ok()
}

pub fn load_inputs(
    data_port: &dyn DataPort,
    series: &PriceSeries,
    benchmark: Option<&PriceSeries>,
) -> Result<SymbolInputs, QuantError> {
    let factor = |f: Factor| -> Result<Option<Vec<Option<f64>>>, QuantError> {
        Ok(data_port
            .fetch_factor(series.symbol(), f)?
            .map(|values| align_factor(series, &values)))
    };
    Ok(SymbolInputs {
        benchmark: benchmark.and_then(|b| align_benchmark(series, b)),
        size_scores: factor(Factor::Size)?,
        value_scores: factor(Factor::Value)?,
        predictions: factor(Factor::Prediction)?,
    })
}

fn load_benchmark(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Option<PriceSeries>, QuantError> {
    benchmark_symbol(config)
        .map(|symbol| data_port.fetch_prices(&symbol))
        .transpose()
}

fn load_single(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    symbol_override: Option<&str>,
) -> Result<PriceSeries, QuantError> {
    let symbols = resolve_symbols(symbol_override, config, data_port)?;
    let symbol = &symbols[0];
    data_port.fetch_prices(symbol)
}

/// Prices and indicator set for one symbol.
pub fn run_indicators_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: Option<&str>,
) -> Result<(PriceSeries, IndicatorSet), QuantError> {
    let series = load_single(config, data_port, symbol)?;
    let indicators =
        IndicatorEngine::with_config(&series, build_indicator_config(config)).compute_all()?;
    Ok((series, indicators))
}

/// Prices and every rule's signals for one symbol.
pub fn run_signals_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: Option<&str>,
) -> Result<(PriceSeries, BTreeMap<String, SignalSeries>), QuantError> {
    let (series, indicators) = run_indicators_pipeline(data_port, config, symbol)?;
    let benchmark = load_benchmark(config, data_port)?;
    let inputs = load_inputs(data_port, &series, benchmark.as_ref())?;
    let engine = StrategyEngine::new(build_strategy_rules(config)?);
    let signals = engine.evaluate_all(&series, &indicators, &inputs.as_strategy_inputs())?;
    Ok((series, signals))
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub rule: String,
    pub result: BacktestResult,
    pub risk: RiskReport,
}

/// Close-to-close returns of the underlying over the backtest's window.
fn underlying_returns(series: &PriceSeries, result: &BacktestResult) -> Vec<f64> {
    let closes: Vec<f64> = result
        .equity_curve
        .iter()
        .filter_map(|p| {
            series
                .bars()
                .binary_search_by_key(&p.date, |b| b.date)
                .ok()
                .map(|i| series.bars()[i].close)
        })
        .collect();
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Backtest one rule over every resolved symbol; symbols without data are skipped.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: Option<&str>,
    rule: Option<&str>,
) -> Result<Vec<SymbolReport>, QuantError> {
    let rule = build_strategy_rule(config, rule)?;
    let indicator_config = build_indicator_config(config);
    let bt_config = build_backtest_config(config)?;
    let risk_config = build_risk_config(config);

    let symbols = resolve_symbols(symbol, config, data_port)?;
    let universe = load_universe(data_port, &symbols)?;
    let benchmark = load_benchmark(config, data_port)?;
    let inputs = universe
        .series
        .iter()
        .map(|s| load_inputs(data_port, s, benchmark.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        rule = rule.name(),
        symbols = universe.count(),
        "running backtests"
    );

    let signals = universe
        .series
        .par_iter()
        .zip(inputs.par_iter())
        .map(|(series, inputs)| {
            let indicators =
                IndicatorEngine::with_config(series, indicator_config.clone()).compute_all()?;
            rule.evaluate(series, &indicators, &inputs.as_strategy_inputs())
        })
        .collect::<Result<Vec<_>, QuantError>>()?;

    let jobs: Vec<BacktestJob<'_>> = universe
        .series
        .iter()
        .zip(&signals)
        .map(|(series, signals)| BacktestJob { series, signals })
        .collect();

    let mut reports = Vec::with_capacity(jobs.len());
    for (job, result) in jobs.iter().zip(backtest::run_batch(&jobs, &bt_config)) {
        let result = match result {
            Ok(r) => r,
            Err(e @ QuantError::InsufficientData { .. }) => {
                tracing::warn!(symbol = job.series.symbol(), error = %e, "skipping symbol");
                continue;
            }
            Err(e) => return Err(e),
        };
        let returns = result.daily_returns();
        let mut underlying = underlying_returns(job.series, &result);
        if returns.len() < underlying.len() {
            tracing::warn!(
                symbol = job.series.symbol(),
                bars = returns.len() + 1,
                "equity exhausted; risk metrics cover the bars before it"
            );
            underlying.truncate(returns.len());
        }
        let risk = RiskEngine::new(&returns, Some(underlying.as_slice()), risk_config)?.compute();
        reports.push(SymbolReport {
            symbol: job.series.symbol().to_string(),
            rule: rule.name().to_string(),
            result,
            risk,
        });
    }

    if reports.is_empty() {
        return Err(QuantError::InsufficientData {
            required: 1,
            available: 0,
        });
    }
    Ok(reports)
}

/// Equal-weight annualized return, volatility and Sharpe over the resolved
/// symbols, using the dates they all share.
pub fn run_portfolio_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbols: Option<&str>,
) -> Result<PortfolioSummary, QuantError> {
    let symbols = resolve_symbols(symbols, config, data_port)?;
    let universe = load_universe(data_port, &symbols)?;
    let columns = portfolio::aligned_returns(&universe.series);
    let summary = portfolio::equal_weight(&columns)?;
    if summary.observations == 0 {
        tracing::warn!(assets = columns.len(), "symbols share fewer than two dates");
    }
    Ok(summary)
}

/// Aligns two `date,return` files; both must carry the same dates.
pub fn run_risk_pipeline(
    returns_path: &Path,
    benchmark_path: Option<&Path>,
    config: RiskConfig,
) -> Result<RiskReport, QuantError> {
    let dated = csv_adapter::read_returns(returns_path)?;
    let returns: Vec<f64> = dated.iter().map(|(_, r)| *r).collect();

    let benchmark = match benchmark_path {
        Some(path) => {
            let bench = csv_adapter::read_returns(path)?;
            let same_dates = bench.len() == dated.len()
                && bench.iter().zip(&dated).all(|((a, _), (b, _))| a == b);
            if !same_dates {
                return Err(QuantError::invalid(format!(
                    "benchmark {} dates do not match {}",
                    path.display(),
                    returns_path.display()
                )));
            }
            Some(bench.into_iter().map(|(_, r)| r).collect::<Vec<f64>>())
        }
        None => None,
    };

    Ok(RiskEngine::new(&returns, benchmark.as_deref(), config)?.compute())
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>, QuantError> {
    Ok(match output {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), QuantError> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn run_indicators(config_path: &Path, symbol: Option<&str>, output: Option<&Path>) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let (series, indicators) = run_indicators_pipeline(&data_port, &config, symbol)?;
    csv_adapter::write_indicator_table(open_output(output)?, &series, &indicators)?;
    if let Some(path) = output {
        tracing::info!(path = %path.display(), bars = series.len(), "indicators written");
    }
    Ok(())
}

fn run_signals(config_path: &Path, symbol: Option<&str>, output: Option<&Path>) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let (series, signals) = run_signals_pipeline(&data_port, &config, symbol)?;
    csv_adapter::write_signal_table(open_output(output)?, &series, &signals)?;
    if let Some(path) = output {
        tracing::info!(path = %path.display(), rules = signals.len(), "signals written");
    }
    Ok(())
}

fn run_backtest(config_path: &Path, symbol: Option<&str>, rule: Option<&str>) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let reports = run_backtest_pipeline(&data_port, &config, symbol, rule)?;
    for report in &reports {
        tracing::info!(
            symbol = %report.symbol,
            return_pct = report.result.return_pct,
            benchmark_return_pct = report.result.benchmark_return_pct,
            trades = report.result.summary.total,
            "backtest result"
        );
    }
    print_json(&reports)
}

fn run_portfolio(config_path: &Path, symbols: Option<&str>) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let data_port = data_adapter(&config)?;
    let summary = run_portfolio_pipeline(&data_port, &config, symbols)?;
    print_json(&summary)
}

fn run_risk(returns: &Path, benchmark: Option<&Path>, config: RiskConfig) -> Result<(), QuantError> {
    let report = run_risk_pipeline(returns, benchmark, config)?;
    print_json(&report)
}

fn run_validate(config_path: &Path) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    build_strategy_rule(&config, None)?;
    build_backtest_config(&config)?.validate()?;
    build_risk_config(&config).validate()?;
    tracing::info!("configuration is valid");
    Ok(())
}
