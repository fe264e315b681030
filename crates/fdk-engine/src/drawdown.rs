//! Daily / max drawdown evaluation.
//!
//! Usage, remaining headroom and breach status for one phase at one point in
//! time. Breach priority is fixed: the daily limit is checked first, and a
//! daily breach wins even when the max limit is simultaneously exceeded.
//! A configured percent of 0 disables that limit entirely.

use fdk_schemas::{BreachType, DrawdownMode};
use serde::{Deserialize, Serialize};

use crate::money::percent_of;

/// Inputs for one drawdown evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownInputs {
    pub account_size_micros: i64,
    /// Daily drawdown limit as a percent of account size; 0 = unconstrained.
    pub daily_drawdown_percent: f64,
    /// Max drawdown limit as a percent of the base; 0 = unconstrained.
    pub max_drawdown_percent: f64,
    pub max_drawdown_mode: DrawdownMode,
    pub current_equity_micros: i64,
    /// Equity at the start of the current trading day (daily anchor, or the
    /// account size when no anchor exists yet).
    pub daily_start_balance_micros: i64,
    pub high_water_mark_micros: i64,
}

/// Pure value object describing drawdown state. No side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownResult {
    pub daily_drawdown_limit_micros: i64,
    pub daily_drawdown_used_micros: i64,
    pub daily_drawdown_remaining_micros: i64,
    /// High-water mark when trailing, account size when static.
    pub max_drawdown_base_micros: i64,
    pub max_drawdown_limit_micros: i64,
    pub max_drawdown_used_micros: i64,
    pub max_drawdown_remaining_micros: i64,
    pub daily_start_balance_micros: i64,
    pub highest_equity_micros: i64,
    pub current_equity_micros: i64,
    pub is_breached: bool,
    pub breach_type: Option<BreachType>,
}

/// Evaluate drawdown usage and breach status.
pub fn evaluate_drawdown(inp: &DrawdownInputs) -> DrawdownResult {
    let daily_limit = percent_of(inp.account_size_micros, inp.daily_drawdown_percent);
    let daily_used = (inp.daily_start_balance_micros - inp.current_equity_micros).max(0);
    let daily_remaining = (daily_limit - daily_used).max(0);

    let max_base = match inp.max_drawdown_mode {
        DrawdownMode::Trailing => inp.high_water_mark_micros,
        DrawdownMode::Static => inp.account_size_micros,
    };
    let max_limit = percent_of(max_base, inp.max_drawdown_percent);
    let max_used = (max_base - inp.current_equity_micros).max(0);
    let max_remaining = (max_limit - max_used).max(0);

    // Daily first; only an un-breached daily limit lets max drawdown decide.
    let breach_type = if daily_limit > 0 && daily_used > daily_limit {
        Some(BreachType::DailyDrawdown)
    } else if max_limit > 0 && max_used > max_limit {
        Some(BreachType::MaxDrawdown)
    } else {
        None
    };

    DrawdownResult {
        daily_drawdown_limit_micros: daily_limit,
        daily_drawdown_used_micros: daily_used,
        daily_drawdown_remaining_micros: daily_remaining,
        max_drawdown_base_micros: max_base,
        max_drawdown_limit_micros: max_limit,
        max_drawdown_used_micros: max_used,
        max_drawdown_remaining_micros: max_remaining,
        daily_start_balance_micros: inp.daily_start_balance_micros,
        highest_equity_micros: inp.high_water_mark_micros,
        current_equity_micros: inp.current_equity_micros,
        is_breached: breach_type.is_some(),
        breach_type,
    }
}
