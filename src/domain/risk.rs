//! Risk and performance metrics over a daily return series.
//!
//! Every metric is an `Option<f64>`: `None` means the value is undefined for
//! this input (too few observations, a zero denominator, or no benchmark).

use serde::Serialize;

use super::TRADING_DAYS_PER_YEAR;
use super::error::QuantError;

/// Denominators at or below this magnitude are treated as zero.
const DEGENERATE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    /// VaR/CVaR confidence level, strictly between 0 and 1.
    pub confidence: f64,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            confidence: 0.95,
            risk_free_rate: 0.01,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), QuantError> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(QuantError::invalid(format!(
                "confidence {} must be strictly between 0 and 1",
                self.confidence
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(QuantError::invalid("risk-free rate must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskReport {
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub var: Option<f64>,
    pub cvar: Option<f64>,
    pub volatility: Option<f64>,
    pub downside_deviation: Option<f64>,
    pub upside_potential: Option<f64>,
    pub omega_ratio: Option<f64>,
    pub beta: Option<f64>,
    pub alpha: Option<f64>,
    pub treynor_ratio: Option<f64>,
    pub information_ratio: Option<f64>,
    pub tracking_error: Option<f64>,
    pub calmar_ratio: Option<f64>,
    pub sterling_ratio: Option<f64>,
    pub ulcer_index: Option<f64>,
    pub pain_index: Option<f64>,
    pub recovery_time: Option<f64>,
}

impl RiskReport {
    pub const NAMES: [&'static str; 19] = [
        "sharpe_ratio",
        "sortino_ratio",
        "max_drawdown",
        "var",
        "cvar",
        "volatility",
        "downside_deviation",
        "upside_potential",
        "omega_ratio",
        "beta",
        "alpha",
        "treynor_ratio",
        "information_ratio",
        "tracking_error",
        "calmar_ratio",
        "sterling_ratio",
        "ulcer_index",
        "pain_index",
        "recovery_time",
    ];

    /// Metric name → value, in report order.
    pub fn entries(&self) -> [(&'static str, Option<f64>); 19] {
        let values = [
            self.sharpe_ratio,
            self.sortino_ratio,
            self.max_drawdown,
            self.var,
            self.cvar,
            self.volatility,
            self.downside_deviation,
            self.upside_potential,
            self.omega_ratio,
            self.beta,
            self.alpha,
            self.treynor_ratio,
            self.information_ratio,
            self.tracking_error,
            self.calmar_ratio,
            self.sterling_ratio,
            self.ulcer_index,
            self.pain_index,
            self.recovery_time,
        ];
        std::array::from_fn(|i| (Self::NAMES[i], values[i]))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| value)
    }

    pub fn is_all_undefined(&self) -> bool {
        self.entries().iter().all(|(_, v)| v.is_none())
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

fn sample_covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let s: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    Some(s / (x.len() - 1) as f64)
}

/// `num / den`, undefined when the denominator is effectively zero.
pub(crate) fn ratio(num: f64, den: f64) -> Option<f64> {
    if den.abs() <= DEGENERATE_EPSILON {
        return None;
    }
    let value = num / den;
    value.is_finite().then_some(value)
}

/// Linear-interpolated percentile of `values`, `pct` in [0, 100].
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Drawdown of the compounded return curve at each bar, all values ≤ 0.
///
/// The running peak starts at the first compounded value. Undefined if the
/// curve ever reaches zero or below.
pub fn drawdown_curve(returns: &[f64]) -> Option<Vec<f64>> {
    let mut cum = 1.0;
    let mut peak: Option<f64> = None;
    let mut out = Vec::with_capacity(returns.len());
    for r in returns {
        cum *= 1.0 + r;
        if cum <= DEGENERATE_EPSILON {
            return None;
        }
        let p = peak.map_or(cum, |p: f64| p.max(cum));
        peak = Some(p);
        out.push((cum - p) / p);
    }
    Some(out)
}

fn annualized_sharpe(returns: &[f64], daily_rf: f64) -> Option<f64> {
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    ratio(mean(&excess)?, sample_std(&excess)?).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Computes a [`RiskReport`] for one return series.
#[derive(Debug, Clone, Copy)]
pub struct RiskEngine<'a> {
    returns: &'a [f64],
    benchmark: Option<&'a [f64]>,
    config: RiskConfig,
}

impl<'a> RiskEngine<'a> {
    pub fn new(
        returns: &'a [f64],
        benchmark: Option<&'a [f64]>,
        config: RiskConfig,
    ) -> Result<Self, QuantError> {
        config.validate()?;
        if let Some(i) = returns.iter().position(|r| !r.is_finite()) {
            return Err(QuantError::invalid(format!("return {i} is not finite")));
        }
        if let Some(b) = benchmark {
            if b.len() != returns.len() {
                return Err(QuantError::invalid(format!(
                    "benchmark has {} returns, series has {}",
                    b.len(),
                    returns.len()
                )));
            }
            if let Some(i) = b.iter().position(|r| !r.is_finite()) {
                return Err(QuantError::invalid(format!(
                    "benchmark return {i} is not finite"
                )));
            }
        }
        Ok(Self {
            returns,
            benchmark,
            config,
        })
    }

    fn daily_rf(&self) -> f64 {
        self.config.risk_free_rate / TRADING_DAYS_PER_YEAR
    }

    fn excess_mean(&self) -> Option<f64> {
        mean(self.returns).map(|m| m - self.daily_rf())
    }

    fn losses(&self) -> Vec<f64> {
        self.returns.iter().copied().filter(|r| *r < 0.0).collect()
    }

    fn gains(&self) -> Vec<f64> {
        self.returns.iter().copied().filter(|r| *r > 0.0).collect()
    }

    fn annualized_mean(&self) -> Option<f64> {
        mean(self.returns).map(|m| m * TRADING_DAYS_PER_YEAR)
    }

    fn active_returns(&self) -> Option<Vec<f64>> {
        let b = self.benchmark?;
        Some(self.returns.iter().zip(b).map(|(r, b)| r - b).collect())
    }

    pub fn sharpe_ratio(&self) -> Option<f64> {
        annualized_sharpe(self.returns, self.daily_rf())
    }

    pub fn sortino_ratio(&self) -> Option<f64> {
        let downside = sample_std(&self.losses())?;
        ratio(self.excess_mean()?, downside).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
    }

    pub fn max_drawdown(&self) -> Option<f64> {
        drawdown_curve(self.returns)?
            .into_iter()
            .min_by(f64::total_cmp)
    }

    pub fn var(&self) -> Option<f64> {
        percentile(self.returns, (1.0 - self.config.confidence) * 100.0)
    }

    pub fn cvar(&self) -> Option<f64> {
        let var = self.var()?;
        let tail: Vec<f64> = self.returns.iter().copied().filter(|r| *r <= var).collect();
        mean(&tail)
    }

    pub fn volatility(&self) -> Option<f64> {
        sample_std(self.returns).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
    }

    pub fn downside_deviation(&self) -> Option<f64> {
        sample_std(&self.losses()).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
    }

    pub fn upside_potential(&self) -> Option<f64> {
        mean(&self.gains())
    }

    pub fn omega_ratio(&self) -> Option<f64> {
        let gains: f64 = self.gains().iter().sum();
        let losses: f64 = self.losses().iter().map(|l| l.abs()).sum();
        ratio(gains, losses)
    }

    pub fn beta(&self) -> Option<f64> {
        let b = self.benchmark?;
        ratio(sample_covariance(self.returns, b)?, sample_variance(b)?)
    }

    pub fn alpha(&self) -> Option<f64> {
        let b = self.benchmark?;
        let bench_sharpe = annualized_sharpe(b, self.daily_rf())?;
        Some(self.sharpe_ratio()? - self.beta()? * bench_sharpe)
    }

    pub fn treynor_ratio(&self) -> Option<f64> {
        ratio(self.excess_mean()? * TRADING_DAYS_PER_YEAR, self.beta()?)
    }

    pub fn information_ratio(&self) -> Option<f64> {
        let active = self.active_returns()?;
        ratio(mean(&active)?, sample_std(&active)?).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
    }

    pub fn tracking_error(&self) -> Option<f64> {
        let active = self.active_returns()?;
        sample_std(&active).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
    }

    pub fn calmar_ratio(&self) -> Option<f64> {
        ratio(self.annualized_mean()?, self.max_drawdown()?.abs())
    }

    pub fn sterling_ratio(&self) -> Option<f64> {
        let underwater: Vec<f64> = drawdown_curve(self.returns)?
            .into_iter()
            .filter(|dd| *dd < 0.0)
            .map(f64::abs)
            .collect();
        ratio(self.annualized_mean()?, mean(&underwater)?)
    }

    pub fn ulcer_index(&self) -> Option<f64> {
        let squares: Vec<f64> = drawdown_curve(self.returns)?
            .iter()
            .map(|dd| dd * dd)
            .collect();
        mean(&squares).map(f64::sqrt)
    }

    pub fn pain_index(&self) -> Option<f64> {
        let depths: Vec<f64> = drawdown_curve(self.returns)?
            .iter()
            .map(|dd| dd.abs())
            .collect();
        mean(&depths)
    }

    /// Longest run of consecutive bars below the prior peak.
    pub fn recovery_time(&self) -> Option<f64> {
        let curve = drawdown_curve(self.returns)?;
        let (longest, _) = curve.iter().fold((0usize, 0usize), |(longest, run), dd| {
            let run = if *dd < 0.0 { run + 1 } else { 0 };
            (longest.max(run), run)
        });
        Some(longest as f64)
    }

    /// Every metric. Fewer than two returns yields an all-undefined report.
    pub fn compute(&self) -> RiskReport {
        if self.returns.len() < 2 {
            tracing::debug!(
                observations = self.returns.len(),
                "too few returns for risk metrics"
            );
            return RiskReport::default();
        }
        RiskReport {
            sharpe_ratio: self.sharpe_ratio(),
            sortino_ratio: self.sortino_ratio(),
            max_drawdown: self.max_drawdown(),
            var: self.var(),
            cvar: self.cvar(),
            volatility: self.volatility(),
            downside_deviation: self.downside_deviation(),
            upside_potential: self.upside_potential(),
            omega_ratio: self.omega_ratio(),
            beta: self.beta(),
            alpha: self.alpha(),
            treynor_ratio: self.treynor_ratio(),
            information_ratio: self.information_ratio(),
            tracking_error: self.tracking_error(),
            calmar_ratio: self.calmar_ratio(),
            sterling_ratio: self.sterling_ratio(),
            ulcer_index: self.ulcer_index(),
            pain_index: self.pain_index(),
            recovery_time: self.recovery_time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: [f64; 8] = [0.01, -0.02, 0.015, 0.005, -0.01, 0.02, -0.005, 0.01];

    fn engine<'a>(returns: &'a [f64], benchmark: Option<&'a [f64]>) -> RiskEngine<'a> {
        RiskEngine::new(returns, benchmark, RiskConfig::default()).unwrap()
    }

    #[test]
    fn empty_and_single_return_all_undefined() {
        assert!(engine(&[], None).compute().is_all_undefined());
        assert!(engine(&[0.01], None).compute().is_all_undefined());
    }

    #[test]
    fn constant_returns_have_undefined_sharpe() {
        let r = [0.001; 30];
        let report = engine(&r, None).compute();
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.max_drawdown, Some(0.0));
    }

    #[test]
    fn sharpe_matches_definition() {
        let rf = 0.01 / 252.0;
        let excess: Vec<f64> = SAMPLE.iter().map(|r| r - rf).collect();
        let m = excess.iter().sum::<f64>() / 8.0;
        let var = excess.iter().map(|e| (e - m).powi(2)).sum::<f64>() / 7.0;
        let expected = m / var.sqrt() * 252f64.sqrt();
        assert_relative_eq!(
            engine(&SAMPLE, None).sharpe_ratio().unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn max_drawdown_from_compounded_curve() {
        // 1.1, 0.99, 1.089
        let r = [0.1, -0.1, 0.1];
        assert_relative_eq!(
            engine(&r, None).max_drawdown().unwrap(),
            -0.1,
            epsilon = 1e-12
        );
    }

    #[test]
    fn max_drawdown_zero_when_non_decreasing() {
        let r = [0.01, 0.0, 0.02];
        assert_eq!(engine(&r, None).max_drawdown(), Some(0.0));
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 50.0), Some(3.0));
        assert_relative_eq!(percentile(&v, 5.0).unwrap(), 1.2, epsilon = 1e-12);
        assert_eq!(percentile(&[], 5.0), None);
    }

    #[test]
    fn var_and_cvar() {
        let e = engine(&SAMPLE, None);
        // sorted: -0.02, -0.01, -0.005, 0.005, ...; rank 0.35
        let var = e.var().unwrap();
        assert_relative_eq!(var, -0.02 + 0.01 * 0.35, epsilon = 1e-12);
        assert_relative_eq!(e.cvar().unwrap(), -0.02, epsilon = 1e-12);
    }

    #[test]
    fn omega_and_upside() {
        let e = engine(&SAMPLE, None);
        // gains 0.06, losses 0.035
        assert_relative_eq!(e.omega_ratio().unwrap(), 0.06 / 0.035, epsilon = 1e-12);
        assert_relative_eq!(e.upside_potential().unwrap(), 0.012, epsilon = 1e-12);
    }

    #[test]
    fn omega_undefined_without_losses() {
        assert_eq!(engine(&[0.01, 0.02], None).omega_ratio(), None);
    }

    #[test]
    fn benchmark_metrics_undefined_without_benchmark() {
        let report = engine(&SAMPLE, None).compute();
        assert_eq!(report.beta, None);
        assert_eq!(report.alpha, None);
        assert_eq!(report.treynor_ratio, None);
        assert_eq!(report.information_ratio, None);
        assert_eq!(report.tracking_error, None);
        assert!(report.volatility.is_some());
    }

    #[test]
    fn beta_of_scaled_returns() {
        let r: Vec<f64> = SAMPLE.iter().map(|b| 1.5 * b).collect();
        let e = engine(&r, Some(&SAMPLE[..]));
        assert_relative_eq!(e.beta().unwrap(), 1.5, epsilon = 1e-12);
        let treynor = e.treynor_ratio().unwrap();
        assert!(treynor.is_finite());
    }

    #[test]
    fn alpha_zero_against_itself() {
        let e = engine(&SAMPLE, Some(&SAMPLE[..]));
        assert_relative_eq!(e.beta().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(e.alpha().unwrap(), 0.0, epsilon = 1e-12);
        // identical series: zero tracking error, undefined information ratio
        assert_relative_eq!(e.tracking_error().unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(e.information_ratio(), None);
    }

    #[test]
    fn flat_benchmark_beta_undefined() {
        let flat = [0.0; 8];
        assert_eq!(engine(&SAMPLE, Some(&flat[..])).beta(), None);
    }

    #[test]
    fn drawdown_family() {
        // cum: 1.0, 0.9, 0.99, 1.089, 0.9801
        let r = [0.0, -0.1, 0.1, 0.1, -0.1];
        let e = engine(&r, None);
        let dd = drawdown_curve(&r).unwrap();
        assert_eq!(dd.len(), 5);
        assert_eq!(dd[0], 0.0);
        assert_eq!(e.recovery_time(), Some(2.0));
        let pain = dd.iter().map(|d| d.abs()).sum::<f64>() / 5.0;
        assert_relative_eq!(e.pain_index().unwrap(), pain, epsilon = 1e-12);
        let ulcer = (dd.iter().map(|d| d * d).sum::<f64>() / 5.0).sqrt();
        assert_relative_eq!(e.ulcer_index().unwrap(), ulcer, epsilon = 1e-12);
        assert!(e.calmar_ratio().is_some());
        assert!(e.sterling_ratio().is_some());
    }

    #[test]
    fn sortino_needs_two_losses() {
        assert_eq!(engine(&[0.01, -0.01, 0.02], None).sortino_ratio(), None);
        assert!(engine(&SAMPLE, None).sortino_ratio().is_some());
    }

    #[test]
    fn rejects_bad_input() {
        let cfg = RiskConfig::default();
        assert!(RiskEngine::new(&[0.01, f64::NAN], None, cfg).is_err());
        assert!(RiskEngine::new(&[0.01, 0.02], Some(&[0.01][..]), cfg).is_err());
        for confidence in [0.0, 1.0, 1.5] {
            let cfg = RiskConfig {
                confidence,
                ..RiskConfig::default()
            };
            let err = RiskEngine::new(&[0.01, 0.02], None, cfg).unwrap_err();
            assert!(matches!(err, QuantError::InvalidInput { .. }));
        }
    }

    #[test]
    fn report_lookup_by_name() {
        let report = engine(&SAMPLE, None).compute();
        assert_eq!(report.entries().len(), RiskReport::NAMES.len());
        assert_eq!(report.get("volatility"), report.volatility);
        assert_eq!(report.get("no_such_metric"), None);
    }

    #[test]
    fn report_serializes_undefined_as_null() {
        let json = serde_json::to_value(RiskReport::default()).unwrap();
        assert!(json["beta"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 19);
    }
}
