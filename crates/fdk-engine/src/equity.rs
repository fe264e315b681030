//! Equity & balance accumulation.
//!
//! Folds one phase's ordered trades into a running balance sequence, the
//! final balance, and the high-water mark (seeded at the starting balance).
//! Input must be the phase's *own* trades, sorted ascending by
//! `(exit_time, trade_id)` — anything else is a data-integrity error, not a
//! silently tolerated condition.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use fdk_schemas::Trade;
use uuid::Uuid;

use crate::error::EngineError;

/// One step of the running-balance sequence (balance *after* the trade).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquityPoint {
    pub trade_id: Uuid,
    pub exit_time: DateTime<Utc>,
    pub balance_micros: i64,
}

/// Result of accumulating a phase's trades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquityCurve {
    pub starting_balance_micros: i64,
    pub final_balance_micros: i64,
    /// Maximum of the running balance sequence, seeded at the starting
    /// balance — monotonically non-decreasing along the sequence.
    pub high_water_mark_micros: i64,
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    /// Balance at the open of the local trading day `date` in `tz`: the
    /// balance after the last trade that exited on an earlier local date,
    /// or the starting balance when no such trade exists.
    ///
    /// This seeds the lazily-created daily anchor.
    pub fn balance_at_day_open(&self, date: NaiveDate, tz: Tz) -> i64 {
        let mut balance = self.starting_balance_micros;
        for p in &self.points {
            if p.exit_time.with_timezone(&tz).date_naive() < date {
                balance = p.balance_micros;
            } else {
                break;
            }
        }
        balance
    }
}

/// Fold `trades` over `starting_balance_micros`.
///
/// Each trade contributes `pnl - commission`. Returns
/// [`EngineError::DataIntegrity`] when a trade is missing its exit timestamp
/// or the sequence is not strictly ascending by `(exit_time, trade_id)`.
pub fn accumulate(
    starting_balance_micros: i64,
    trades: &[Trade],
) -> Result<EquityCurve, EngineError> {
    let mut balance = starting_balance_micros;
    let mut high_water_mark = starting_balance_micros;
    let mut points = Vec::with_capacity(trades.len());
    let mut prev: Option<(DateTime<Utc>, Uuid)> = None;

    for trade in trades {
        let exit_time = trade.exit_time.ok_or_else(|| {
            EngineError::DataIntegrity(format!("trade {} has no exit_time", trade.trade_id))
        })?;

        let key = (exit_time, trade.trade_id);
        if let Some(prev_key) = prev {
            if key <= prev_key {
                return Err(EngineError::DataIntegrity(format!(
                    "trades out of order at trade {} (exit_time {})",
                    trade.trade_id, exit_time
                )));
            }
        }
        prev = Some(key);

        balance += trade.net_micros();
        if balance > high_water_mark {
            high_water_mark = balance;
        }
        points.push(EquityPoint {
            trade_id: trade.trade_id,
            exit_time,
            balance_micros: balance,
        });
    }

    Ok(EquityCurve {
        starting_balance_micros,
        final_balance_micros: balance,
        high_water_mark_micros: high_water_mark,
        points,
    })
}
