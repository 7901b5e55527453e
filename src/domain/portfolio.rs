//! Equal-weight portfolio summary over several assets.
//!
//! Every asset gets weight 1/N. The portfolio's daily return is the weighted
//! sum of the asset returns on the same date, so its sample variance equals
//! `wᵀΣw` for the sample covariance matrix Σ of the asset returns.

use serde::Serialize;
use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::TRADING_DAYS_PER_YEAR;
use crate::domain::error::QuantError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::risk::{mean, ratio, sample_std};

/// One asset's daily returns, index-aligned with every other column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnColumn {
    pub symbol: String,
    pub returns: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub symbols: Vec<String>,
    pub weights: Vec<f64>,
    pub observations: usize,
    /// Mean daily portfolio return × 252.
    pub annual_return: Option<f64>,
    /// Sample std of the daily portfolio return × √252.
    pub volatility: Option<f64>,
    /// `annual_return / volatility`.
    pub sharpe_ratio: Option<f64>,
}

/// Close-to-close returns of each series over the dates every series shares.
pub fn aligned_returns(series: &[PriceSeries]) -> Vec<ReturnColumn> {
    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for s in series {
        let dates: BTreeSet<NaiveDate> = s.bars().iter().map(|b| b.date).collect();
        common = Some(match common {
            Some(c) => c.intersection(&dates).copied().collect(),
            None => dates,
        });
    }
    let common = common.unwrap_or_default();

    series
        .iter()
        .map(|s| {
            let closes: Vec<f64> = s
                .bars()
                .iter()
                .filter(|b| common.contains(&b.date))
                .map(|b| b.close)
                .collect();
            ReturnColumn {
                symbol: s.symbol().to_string(),
                returns: closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect(),
            }
        })
        .collect()
}

pub fn equal_weight(columns: &[ReturnColumn]) -> Result<PortfolioSummary, QuantError> {
    let Some(first) = columns.first() else {
        return Err(QuantError::invalid("portfolio needs at least one asset"));
    };
    let rows = first.returns.len();
    for column in columns {
        if column.returns.len() != rows {
            return Err(QuantError::invalid(format!(
                "{} has {} returns, {} has {rows}",
                column.symbol,
                column.returns.len(),
                first.symbol
            )));
        }
        if let Some(i) = column.returns.iter().position(|r| !r.is_finite()) {
            return Err(QuantError::invalid(format!(
                "{} return {i} is not finite",
                column.symbol
            )));
        }
    }

    let weight = 1.0 / columns.len() as f64;
    let daily: Vec<f64> = (0..rows)
        .map(|i| columns.iter().map(|c| weight * c.returns[i]).sum())
        .collect();

    let annual_return = mean(&daily).map(|m| m * TRADING_DAYS_PER_YEAR);
    let volatility = sample_std(&daily).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt());
    let sharpe_ratio = annual_return
        .zip(volatility)
        .and_then(|(r, v)| ratio(r, v));

    tracing::debug!(assets = columns.len(), observations = rows, "portfolio summary");

    Ok(PortfolioSummary {
        symbols: columns.iter().map(|c| c.symbol.clone()).collect(),
        weights: vec![weight; columns.len()],
        observations: rows,
        annual_return,
        volatility,
        sharpe_ratio,
    })
}
