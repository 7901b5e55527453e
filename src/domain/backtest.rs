//! Signal-driven backtest simulator.
//!
//! A run is a left fold over the bars in `[start_date, end_date]`. The only
//! state is a [`SimState`] value threaded from bar to bar; nothing outlives the
//! run. Independent runs can be executed in parallel with [`run_batch`].

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use super::error::QuantError;
use super::ohlcv::{PriceBar, PriceSeries};
use super::position::{ClosedTrade, Exposure, Position};
use super::signal::SignalSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub allow_shorting: bool,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: None,
            end_date: None,
            initial_capital: 100_000.0,
            allow_shorting: false,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), QuantError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(QuantError::invalid("initial capital must be positive"));
        }
        let costs = [
            ("commission_per_trade", self.commission_per_trade),
            ("commission_pct", self.commission_pct),
            ("slippage_pct", self.slippage_pct),
        ];
        for (name, value) in costs {
            if !(value.is_finite() && value >= 0.0) {
                return Err(QuantError::invalid(format!("{name} must be non-negative")));
            }
        }
        if self.slippage_pct >= 100.0 {
            return Err(QuantError::invalid("slippage_pct must be below 100"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(QuantError::invalid(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        Ok(())
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

/// Commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &BacktestConfig) -> f64 {
    config.commission_per_trade + trade_value * config.commission_pct / 100.0
}

/// Buying fills above the market.
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Selling fills below the market.
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Whole units affordable with `cash` at `execution_price`, commissions included.
pub fn position_size(cash: f64, execution_price: f64, config: &BacktestConfig) -> i64 {
    let budget = cash - config.commission_per_trade;
    let unit_cost = execution_price * (1.0 + config.commission_pct / 100.0);
    if budget <= 0.0 || unit_cost <= 0.0 {
        return 0;
    }
    (budget / unit_cost).floor() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeSummary {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    /// Undefined when no trade closed.
    pub win_rate: Option<f64>,
}

impl TradeSummary {
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        let won = trades.iter().filter(|t| t.is_winner()).count();
        let total = trades.len();
        TradeSummary {
            total,
            won,
            lost: total - won,
            win_rate: (total > 0).then(|| won as f64 / total as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub initial_capital: f64,
    pub final_value: f64,
    /// (final_value - initial_capital) / initial_capital
    pub return_pct: f64,
    /// Buy-and-hold return of the same bars, independent of the signal.
    pub benchmark_return_pct: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ClosedTrade>,
    pub summary: TradeSummary,
}

impl BacktestResult {
    /// Bar-over-bar returns of the equity curve; one shorter than the curve.
    ///
    /// A return is only defined from positive equity. Once a bar's equity is
    /// zero or negative (a short that ran away) the sequence stops, so the
    /// last return may be -1 or below and the result is shorter than the curve.
    pub fn daily_returns(&self) -> Vec<f64> {
        self.equity_curve
            .windows(2)
            .take_while(|w| w[0].equity > 0.0)
            .map(|w| w[1].equity / w[0].equity - 1.0)
            .collect()
    }
}

/// Fold state for one run.
#[derive(Debug, Clone)]
struct SimState {
    cash: f64,
    position: Position,
    trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
}

/// Simulate trading `signals` over `series`.
///
/// The signal for date D is acted on at D's close. A date without a defined
/// signal holds the current exposure.
pub fn run_backtest(
    series: &PriceSeries,
    signals: &SignalSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, QuantError> {
    config.validate()?;

    let window: Vec<&PriceBar> = series
        .bars()
        .iter()
        .filter(|bar| config.contains(bar.date))
        .collect();
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return Err(QuantError::InsufficientData {
            required: 1,
            available: 0,
        });
    };
    let benchmark_return_pct = last.close / first.close - 1.0;

    let initial = SimState {
        cash: config.initial_capital,
        position: Position::flat(),
        trades: Vec::new(),
        equity_curve: Vec::with_capacity(window.len()),
    };
    let state = window.iter().fold(initial, |state, bar| {
        step(state, bar, signals.get(bar.date), config)
    });

    let final_value = state
        .equity_curve
        .last()
        .map_or(config.initial_capital, |p| p.equity);
    let return_pct = (final_value - config.initial_capital) / config.initial_capital;

    tracing::info!(
        symbol = series.symbol(),
        bars = window.len(),
        trades = state.trades.len(),
        final_value,
        return_pct,
        benchmark_return_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        symbol: series.symbol().to_string(),
        initial_capital: config.initial_capital,
        final_value,
        return_pct,
        benchmark_return_pct,
        summary: TradeSummary::from_trades(&state.trades),
        equity_curve: state.equity_curve,
        trades: state.trades,
    })
}

fn step(mut state: SimState, bar: &PriceBar, signal: Option<f64>, config: &BacktestConfig) -> SimState {
    if let Some(signal) = signal {
        let target = Exposure::from_signal(signal, config.allow_shorting);
        if target != state.position.exposure {
            state = close_position(state, bar, config);
            if target != Exposure::Flat {
                state = open_position(state, target, bar, config);
            }
        }
    }
    let equity = state.cash + state.position.market_value(bar.close);
    state.equity_curve.push(EquityPoint {
        date: bar.date,
        equity,
    });
    state
}

fn close_position(mut state: SimState, bar: &PriceBar, config: &BacktestConfig) -> SimState {
    let position = std::mem::replace(&mut state.position, Position::flat());
    let Some(entry_date) = position.entry_date.filter(|_| !position.is_flat()) else {
        return state;
    };
    let units = position.size as f64;

    let (exit_price, pnl_per_unit) = match position.exposure {
        Exposure::Long => {
            let price = apply_slippage_sell(bar.close, config.slippage_pct);
            (price, price - position.entry_price)
        }
        Exposure::Short => {
            let price = apply_slippage_buy(bar.close, config.slippage_pct);
            (price, position.entry_price - price)
        }
        Exposure::Flat => return state,
    };
    let notional = units * exit_price;
    let commission = calculate_commission(notional, config);

    state.cash += match position.exposure {
        Exposure::Long => notional - commission,
        _ => -(notional + commission),
    };
    let pnl = units * pnl_per_unit - position.entry_commission - commission;

    tracing::debug!(
        date = %bar.date,
        exposure = ?position.exposure,
        size = position.size,
        exit_price,
        pnl,
        "closed position"
    );
    state.trades.push(ClosedTrade {
        exposure: position.exposure,
        size: position.size,
        entry_price: position.entry_price,
        exit_price,
        entry_date,
        exit_date: bar.date,
        pnl,
    });
    state
}

fn open_position(
    mut state: SimState,
    exposure: Exposure,
    bar: &PriceBar,
    config: &BacktestConfig,
) -> SimState {
    let entry_price = match exposure {
        Exposure::Long => apply_slippage_buy(bar.close, config.slippage_pct),
        Exposure::Short => apply_slippage_sell(bar.close, config.slippage_pct),
        Exposure::Flat => return state,
    };
    let size = position_size(state.cash, entry_price, config);
    if size <= 0 {
        tracing::debug!(date = %bar.date, cash = state.cash, "insufficient cash to open position");
        return state;
    }
    let notional = size as f64 * entry_price;
    let commission = calculate_commission(notional, config);

    state.cash += match exposure {
        Exposure::Long => -(notional + commission),
        _ => notional - commission,
    };
    tracing::debug!(
        date = %bar.date,
        exposure = ?exposure,
        size,
        entry_price,
        "opened position"
    );
    state.position = Position::open(exposure, size, entry_price, bar.date, commission);
    state
}

/// One independent simulation: a price series and the signals to trade on it.
#[derive(Debug, Clone, Copy)]
pub struct BacktestJob<'a> {
    pub series: &'a PriceSeries,
    pub signals: &'a SignalSeries,
}

/// Run every job in parallel. Results keep the order of `jobs`.
pub fn run_batch(
    jobs: &[BacktestJob<'_>],
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, QuantError>> {
    jobs.par_iter()
        .map(|job| run_backtest(job.series, job.signals, config))
        .collect()
}
