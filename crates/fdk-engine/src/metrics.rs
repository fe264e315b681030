//! Win-rate / profit-factor statistics over a trade set.

use fdk_schemas::Trade;
use serde::{Deserialize, Serialize};

use crate::money::MICROS_SCALE;

/// Aggregate statistics for downstream reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// `winning / total × 100`; 0 when there are no trades.
    pub win_rate_percent: f64,
    pub gross_win_micros: i64,
    /// Stored as a positive magnitude.
    pub gross_loss_micros: i64,
    /// `gross_win / gross_loss`. When `gross_loss` is zero the denominator is
    /// taken as one currency unit, so a loss-free profitable set reports its
    /// gross win in currency units — finite, never `inf`/`NaN`.
    pub profit_factor: f64,
}

/// Compute metrics over a trade set. Net per trade is `pnl - commission`;
/// break-even trades count toward the total but neither wins nor losses.
pub fn compute_risk_metrics(trades: &[Trade]) -> RiskMetrics {
    let mut winning: u32 = 0;
    let mut losing: u32 = 0;
    let mut gross_win: i64 = 0;
    let mut gross_loss: i64 = 0;

    for t in trades {
        let net = t.net_micros();
        if net > 0 {
            winning += 1;
            gross_win += net;
        } else if net < 0 {
            losing += 1;
            gross_loss += -net;
        }
    }

    let total = trades.len() as u32;
    let win_rate_percent = if total == 0 {
        0.0
    } else {
        winning as f64 / total as f64 * 100.0
    };

    let profit_factor = if gross_win == 0 {
        0.0
    } else {
        gross_win as f64 / gross_loss.max(MICROS_SCALE) as f64
    };

    RiskMetrics {
        total_trades: total,
        winning_trades: winning,
        losing_trades: losing,
        win_rate_percent,
        gross_win_micros: gross_win,
        gross_loss_micros: gross_loss,
        profit_factor,
    }
}
