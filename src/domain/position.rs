//! Position state for a single backtest run.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exposure {
    Flat,
    Long,
    Short,
}

impl Exposure {
    /// Exposure a signal asks for. Negative signals are flat unless shorting
    /// is allowed; the magnitude is ignored.
    pub fn from_signal(signal: f64, allow_shorting: bool) -> Self {
        if signal > 0.0 {
            Exposure::Long
        } else if signal < 0.0 && allow_shorting {
            Exposure::Short
        } else {
            Exposure::Flat
        }
    }

    fn sign(self) -> f64 {
        match self {
            Exposure::Flat => 0.0,
            Exposure::Long => 1.0,
            Exposure::Short => -1.0,
        }
    }
}

/// An open (or absent) holding. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub exposure: Exposure,
    pub size: i64,
    pub entry_price: f64,
    pub entry_date: Option<NaiveDate>,
    pub entry_commission: f64,
}

impl Position {
    pub fn flat() -> Self {
        Position {
            exposure: Exposure::Flat,
            size: 0,
            entry_price: 0.0,
            entry_date: None,
            entry_commission: 0.0,
        }
    }

    pub fn open(
        exposure: Exposure,
        size: i64,
        entry_price: f64,
        entry_date: NaiveDate,
        entry_commission: f64,
    ) -> Self {
        Position {
            exposure,
            size,
            entry_price,
            entry_date: Some(entry_date),
            entry_commission,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.exposure == Exposure::Flat || self.size == 0
    }

    /// Units held, negative when short.
    pub fn signed_size(&self) -> f64 {
        self.exposure.sign() * self.size as f64
    }

    /// Contribution to equity at `price`: positive for longs, a liability for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_size() * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.signed_size() * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTrade {
    pub exposure: Exposure,
    pub size: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    /// Net of entry and exit commissions.
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
