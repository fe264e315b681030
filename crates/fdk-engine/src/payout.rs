//! Funded-phase payout eligibility.
//!
//! Policy module kept separate from the drawdown engine: cycle gating,
//! effective profit split and payable amount. Day arithmetic is whole
//! calendar days on UTC timestamps — the payout cycle is a contractual
//! duration, not a trading-day count.

use chrono::{DateTime, Duration, Utc};
use fdk_schemas::{PayoutRequest, PhaseConfig};
use serde::{Deserialize, Serialize};

use crate::money::percent_of;

/// Inputs for one payout-eligibility evaluation.
#[derive(Debug, Clone)]
pub struct PayoutInputs<'a> {
    pub config: &'a PhaseConfig,
    pub phase_started_at: DateTime<Utc>,
    /// Prior payouts for this funded phase, any order.
    pub prior_payouts: &'a [PayoutRequest],
    /// Funded-phase net P&L since the phase started.
    pub current_profit_micros: i64,
    pub now: DateTime<Utc>,
}

/// Whether a payout may be requested now, and on what terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutEligibility {
    pub eligible: bool,
    /// Split applied to the *next* payout:
    /// `min(max, base + increment × payouts_taken)`.
    pub effective_split_percent: f64,
    pub next_eligible_at: DateTime<Utc>,
    /// Trader share of current profit at the effective split, clamped to the
    /// configured payout bounds. 0 when there is no profit to pay.
    pub amount_micros: i64,
    pub payouts_taken: u32,
}

/// Evaluate payout eligibility for a funded phase.
pub fn evaluate_payout(inp: &PayoutInputs) -> PayoutEligibility {
    let cfg = inp.config;
    let payouts_taken = inp.prior_payouts.len() as u32;

    let mut split = cfg.profit_split_percent
        + cfg.profit_split_increment_per_payout * payouts_taken as f64;
    if cfg.max_profit_split_percent > 0.0 {
        split = split.min(cfg.max_profit_split_percent);
    }

    let next_eligible_at = match inp.prior_payouts.iter().map(|p| p.requested_at).max() {
        None => {
            inp.phase_started_at + Duration::days(cfg.min_days_before_first_payout as i64)
        }
        Some(last) => last + Duration::days(cfg.payout_cycle_days as i64),
    };

    let mut amount = percent_of(inp.current_profit_micros.max(0), split);
    if let Some(max) = cfg.max_payout_micros {
        amount = amount.min(max);
    }

    let eligible = inp.now >= next_eligible_at
        && inp.current_profit_micros > 0
        && amount >= cfg.min_payout_micros
        && amount > 0;

    PayoutEligibility {
        eligible,
        effective_split_percent: split,
        next_eligible_at,
        amount_micros: amount,
        payouts_taken,
    }
}
