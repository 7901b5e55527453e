//! Property-based checks over randomly generated price paths:
//!
//! - indicator sequences are index-aligned and warm up as documented
//! - bounded oscillators stay in range
//! - indicators and signals never look ahead
//! - drawdowns are never positive

mod common;

use common::*;
use proptest::prelude::*;
use quantcore::domain::backtest::{BacktestConfig, run_backtest};
use quantcore::domain::indicator::{IndicatorEngine, names};
use quantcore::domain::risk::{RiskConfig, RiskEngine, drawdown_curve, percentile};
use quantcore::domain::strategy::{StrategyInputs, StrategyRule};

fn arb_closes(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(5.0f64..500.0, min_len..max_len)
}

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.2f64..0.2, 2..200)
}

mod indicator_invariants {
    use super::*;

    proptest! {
        #[test]
        fn every_indicator_is_aligned(closes in arb_closes(1, 120)) {
            let s = series("P", bars_from_closes(&closes));
            let set = IndicatorEngine::new(&s).compute_all().unwrap();
            for name in names::ALL {
                prop_assert_eq!(set.get(name).unwrap().len(), closes.len(), "{}", name);
            }
        }

        #[test]
        fn sma_warmup_prefix(closes in arb_closes(1, 80), period in 1usize..30) {
            let s = series("P", bars_from_closes(&closes));
            let sma = IndicatorEngine::new(&s).sma(period).unwrap();
            for (i, v) in sma.iter().enumerate() {
                prop_assert_eq!(v.is_some(), i + 1 >= period);
            }
        }

        #[test]
        fn rsi_is_bounded(closes in arb_closes(2, 120), period in 1usize..30) {
            let s = series("P", bars_from_closes(&closes));
            for v in IndicatorEngine::new(&s).rsi(period).unwrap().into_iter().flatten() {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }

        #[test]
        fn stochastic_is_bounded(closes in arb_closes(1, 120)) {
            let s = series("P", bars_from_closes(&closes));
            let stoch = IndicatorEngine::new(&s).stochastic(14, 3).unwrap();
            for v in stoch.k.iter().chain(&stoch.d).flatten() {
                prop_assert!((-1e-9..=100.0 + 1e-9).contains(v));
            }
        }

        #[test]
        fn macd_histogram_is_line_minus_signal(closes in arb_closes(1, 120)) {
            let s = series("P", bars_from_closes(&closes));
            let macd = IndicatorEngine::new(&s).macd(12, 26, 9).unwrap();
            for i in 0..closes.len() {
                if let (Some(l), Some(sig), Some(h)) = (macd.line[i], macd.signal[i], macd.histogram[i]) {
                    prop_assert_eq!(h, l - sig);
                }
            }
        }

        #[test]
        fn bollinger_bands_are_symmetric(closes in arb_closes(1, 120)) {
            let s = series("P", bars_from_closes(&closes));
            let bands = IndicatorEngine::new(&s).bollinger(20, 2.0).unwrap();
            for i in 0..closes.len() {
                if let (Some(u), Some(m), Some(l)) = (bands.upper[i], bands.middle[i], bands.lower[i]) {
                    prop_assert!(u >= m && m >= l);
                    prop_assert!(((u - m) - (m - l)).abs() < 1e-6 * m.abs().max(1.0));
                }
            }
        }

        #[test]
        fn indicators_never_look_ahead(closes in arb_closes(2, 100), cut in 1usize..100) {
            let cut = cut.min(closes.len());
            let full = series("P", bars_from_closes(&closes));
            let prefix = full.prefix(cut);
            let full_set = IndicatorEngine::new(&full).compute_all().unwrap();
            let prefix_set = IndicatorEngine::new(&prefix).compute_all().unwrap();
            for name in names::ALL {
                let a = &full_set.get(name).unwrap()[..cut];
                let b = prefix_set.get(name).unwrap();
                prop_assert_eq!(a, b, "{}", name);
            }
        }
    }
}

mod strategy_invariants {
    use super::*;

    proptest! {
        #[test]
        fn signals_never_look_ahead(closes in arb_closes(2, 100), cut in 1usize..100) {
            let cut = cut.min(closes.len());
            let full = series("P", bars_from_closes(&closes));
            let prefix = full.prefix(cut);
            let full_set = IndicatorEngine::new(&full).compute_all().unwrap();
            let prefix_set = IndicatorEngine::new(&prefix).compute_all().unwrap();
            let rules = [
                StrategyRule::MomentumBreakout { smoothing: 3 },
                StrategyRule::from_name("mean_reversion").unwrap(),
                StrategyRule::VolatilityArbitrage { window: 5 },
            ];
            for rule in rules {
                let a = rule.evaluate(&full, &full_set, &StrategyInputs::default()).unwrap();
                let b = rule.evaluate(&prefix, &prefix_set, &StrategyInputs::default()).unwrap();
                prop_assert_eq!(&a.values()[..cut], b.values(), "{}", rule.name());
            }
        }

        #[test]
        fn evaluation_is_deterministic(closes in arb_closes(1, 100)) {
            let s = series("P", bars_from_closes(&closes));
            let set = IndicatorEngine::new(&s).compute_all().unwrap();
            for rule in StrategyRule::defaults() {
                let a = rule.evaluate(&s, &set, &StrategyInputs::default()).unwrap();
                let b = rule.evaluate(&s, &set, &StrategyInputs::default()).unwrap();
                prop_assert_eq!(a, b);
            }
        }
    }
}

mod backtest_invariants {
    use super::*;

    proptest! {
        #[test]
        fn flat_signal_preserves_capital(closes in arb_closes(1, 100)) {
            let s = series("P", bars_from_closes(&closes));
            let signals = quantcore::domain::signal::SignalSeries::constant(&s, 0.0);
            let result = run_backtest(&s, &signals, &BacktestConfig::default()).unwrap();
            prop_assert!(result.trades.is_empty());
            prop_assert_eq!(result.final_value, 100_000.0);
        }

        #[test]
        fn equity_curve_covers_window(closes in arb_closes(1, 100), signal in -1.0f64..1.0) {
            let s = series("P", bars_from_closes(&closes));
            let signals = quantcore::domain::signal::SignalSeries::constant(&s, signal);
            let config = BacktestConfig { allow_shorting: true, ..BacktestConfig::default() };
            let result = run_backtest(&s, &signals, &config).unwrap();
            prop_assert_eq!(result.equity_curve.len(), closes.len());
            let returns = result.daily_returns();
            prop_assert!(returns.len() < closes.len());
            prop_assert!(returns.iter().all(|r| r.is_finite()));
        }
    }
}

mod risk_invariants {
    use super::*;

    proptest! {
        #[test]
        fn drawdowns_are_never_positive(returns in arb_returns()) {
            let curve = drawdown_curve(&returns).unwrap();
            prop_assert_eq!(curve.len(), returns.len());
            for dd in curve {
                prop_assert!(dd <= 0.0);
            }
        }

        #[test]
        fn var_bounds_cvar(returns in arb_returns()) {
            let report = RiskEngine::new(&returns, None, RiskConfig::default()).unwrap().compute();
            let var = report.var.unwrap();
            let cvar = report.cvar.unwrap();
            prop_assert!(cvar <= var + 1e-12);
            prop_assert!(report.max_drawdown.unwrap() <= 0.0);
        }

        #[test]
        fn percentile_within_range(values in prop::collection::vec(-1.0f64..1.0, 1..50), pct in 0.0f64..=100.0) {
            let p = percentile(&values, pct).unwrap();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(p >= min - 1e-12 && p <= max + 1e-12);
        }

        #[test]
        fn self_benchmark_has_unit_beta(returns in arb_returns()) {
            let engine = RiskEngine::new(&returns, Some(&returns[..]), RiskConfig::default()).unwrap();
            if let Some(beta) = engine.beta() {
                prop_assert!((beta - 1.0).abs() < 1e-9);
            }
            if let Some(te) = engine.tracking_error() {
                prop_assert!(te.abs() < 1e-12);
            }
        }
    }
}
