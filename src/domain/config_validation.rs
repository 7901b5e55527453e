//! Configuration validation.
//!
//! Every section is checked before any data is loaded or computed. Absent
//! optional keys fall back to their defaults; present keys must parse.

use chrono::NaiveDate;

use crate::domain::error::QuantError;
use crate::domain::strategy::StrategyRule;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    validate_data_config(config)?;
    validate_indicator_config(config)?;
    validate_strategy_config(config)?;
    validate_backtest_config(config)?;
    validate_risk_config(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantError {
    QuantError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// The value of a numeric key if present; an error if present but not a number.
fn number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, QuantError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

fn window(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<(), QuantError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(v) if v >= min => Ok(()),
            _ => Err(invalid(
                section,
                key,
                format!("must be an integer of at least {min}"),
            )),
        },
    }
}

fn boolean(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), QuantError> {
    // get_bool falls back to the default on unparseable text, so try both defaults
    if config.get_string(section, key).is_some()
        && config.get_bool(section, key, true) != config.get_bool(section, key, false)
    {
        return Err(invalid(section, key, "must be true or false"));
    }
    Ok(())
}

pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, QuantError> {
    config
        .get_string(section, key)
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|_| invalid(section, key, "invalid date format, expected YYYY-MM-DD"))
        })
        .transpose()
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    match config.get_string("data", "dir") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(QuantError::ConfigMissing {
                section: "data".into(),
                key: "dir".into(),
            });
        }
    }
    if let Some(symbols) = config.get_string("data", "symbols") {
        parse_symbols(&symbols)?;
    }
    if let Some(benchmark) = config.get_string("data", "benchmark") {
        if benchmark.trim().is_empty() {
            return Err(invalid("data", "benchmark", "must not be empty"));
        }
    }
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    boolean(config, "indicators", "adaptive")
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    if let Some(rule) = config.get_string("strategy", "rule") {
        if !StrategyRule::NAMES.contains(&rule.trim()) {
            return Err(invalid(
                "strategy",
                "rule",
                format!(
                    "unknown rule '{}', expected one of {}",
                    rule.trim(),
                    StrategyRule::NAMES.join(", ")
                ),
            ));
        }
    }
    window(config, "strategy", "momentum_smoothing", 1)?;
    window(config, "strategy", "volatility_window", 2)?;
    window(config, "strategy", "hedge_window", 2)?;
    window(config, "strategy", "ml_volatility_window", 2)?;
    number(config, "strategy", "multi_factor_threshold")?;

    let oversold = number(config, "strategy", "oversold")?.unwrap_or(30.0);
    let overbought = number(config, "strategy", "overbought")?.unwrap_or(70.0);
    for (key, value) in [("oversold", oversold), ("overbought", overbought)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid("strategy", key, "must be between 0 and 100"));
        }
    }
    if oversold >= overbought {
        return Err(invalid(
            "strategy",
            "oversold",
            "oversold must be below overbought",
        ));
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    if let Some(capital) = number(config, "backtest", "initial_capital")? {
        if capital <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    for key in ["commission_per_trade", "commission_pct", "slippage_pct"] {
        if let Some(value) = number(config, "backtest", key)? {
            if value < 0.0 {
                return Err(invalid("backtest", key, format!("{key} must be non-negative")));
            }
        }
    }
    if number(config, "backtest", "slippage_pct")?.is_some_and(|v| v >= 100.0) {
        return Err(invalid("backtest", "slippage_pct", "slippage_pct must be below 100"));
    }
    boolean(config, "backtest", "allow_shorting")?;

    let start = parse_date(config, "backtest", "start_date")?;
    let end = parse_date(config, "backtest", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    if let Some(confidence) = number(config, "risk", "confidence")? {
        if confidence <= 0.0 || confidence >= 1.0 {
            return Err(invalid(
                "risk",
                "confidence",
                "confidence must be strictly between 0 and 1",
            ));
        }
    }
    number(config, "risk", "risk_free_rate")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[data]
dir = ./data
symbols = AAPL, MSFT
benchmark = SPY

[indicators]
adaptive = false

[strategy]
rule = mean_reversion
oversold = 25
overbought = 75

[backtest]
initial_capital = 50000
start_date = 2023-01-01
end_date = 2023-12-31
allow_shorting = true
commission_pct = 0.1

[risk]
confidence = 0.99
risk_free_rate = 0.02
"#;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn assert_invalid(content: &str, section: &str, key: &str) {
        match validate_config(&config(content)) {
            Err(QuantError::ConfigInvalid {
                section: s, key: k, ..
            }) => {
                assert_eq!((s.as_str(), k.as_str()), (section, key));
            }
            other => panic!("expected ConfigInvalid [{section}] {key}, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        validate_config(&config(VALID)).unwrap();
    }

    #[test]
    fn minimal_config_passes() {
        validate_config(&config("[data]\ndir = data\n")).unwrap();
    }

    #[test]
    fn missing_data_dir() {
        let err = validate_config(&config("[strategy]\nrule = hedging\n")).unwrap_err();
        assert!(matches!(err, QuantError::ConfigMissing { .. }));
    }

    #[test]
    fn bad_symbol_list() {
        assert_invalid("[data]\ndir = d\nsymbols = A,,B\n", "data", "symbols");
    }

    #[test]
    fn bad_adaptive_flag() {
        assert_invalid(
            "[data]\ndir = d\n[indicators]\nadaptive = maybe\n",
            "indicators",
            "adaptive",
        );
    }

    #[test]
    fn unknown_rule() {
        assert_invalid("[data]\ndir = d\n[strategy]\nrule = martingale\n", "strategy", "rule");
    }

    #[test]
    fn zero_window() {
        assert_invalid(
            "[data]\ndir = d\n[strategy]\nhedge_window = 1\n",
            "strategy",
            "hedge_window",
        );
    }

    #[test]
    fn inverted_rsi_thresholds() {
        assert_invalid(
            "[data]\ndir = d\n[strategy]\noversold = 80\n",
            "strategy",
            "oversold",
        );
    }

    #[test]
    fn non_positive_capital() {
        assert_invalid(
            "[data]\ndir = d\n[backtest]\ninitial_capital = 0\n",
            "backtest",
            "initial_capital",
        );
    }

    #[test]
    fn non_numeric_commission() {
        assert_invalid(
            "[data]\ndir = d\n[backtest]\ncommission_pct = lots\n",
            "backtest",
            "commission_pct",
        );
    }

    #[test]
    fn bad_date_format() {
        assert_invalid(
            "[data]\ndir = d\n[backtest]\nstart_date = 01/02/2023\n",
            "backtest",
            "start_date",
        );
    }

    #[test]
    fn start_after_end() {
        assert_invalid(
            "[data]\ndir = d\n[backtest]\nstart_date = 2024-01-02\nend_date = 2024-01-01\n",
            "backtest",
            "start_date",
        );
    }

    #[test]
    fn confidence_out_of_range() {
        assert_invalid("[data]\ndir = d\n[risk]\nconfidence = 1\n", "risk", "confidence");
    }

    #[test]
    fn parse_date_absent_is_none() {
        assert_eq!(
            parse_date(&config("[backtest]\n"), "backtest", "start_date").unwrap(),
            None
        );
    }
}
