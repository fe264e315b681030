//! Profit-target progress and advancement readiness.
//!
//! Trading days are distinct *local* calendar dates in the account's
//! configured timezone — a trade closed at 23:30 New York time belongs to
//! that New York date even though it is already the next day in UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use fdk_schemas::{PhaseConfig, Trade};
use serde::{Deserialize, Serialize};

use crate::money::percent_of;

/// Inputs for one progress evaluation.
#[derive(Debug, Clone)]
pub struct ProgressInputs<'a> {
    pub account_size_micros: i64,
    pub config: &'a PhaseConfig,
    /// Phase net P&L (final balance minus starting balance).
    pub current_profit_micros: i64,
    /// The phase's own trades, ordered; only exit dates are read here.
    pub trades: &'a [Trade],
    pub timezone: Tz,
    pub is_breached: bool,
    pub phase_started_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// Progress toward passing the phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResult {
    pub profit_target_micros: i64,
    /// Clamped to `[0, 100]`, one decimal place.
    pub progress_percent: f64,
    pub days_traded: u32,
    /// False while a single trading day's net profit exceeds the configured
    /// share of the profit-target amount.
    pub consistency_ok: bool,
    /// True once the phase time limit has elapsed (0 = no limit, never
    /// expires).
    pub time_expired: bool,
    pub ready_to_advance: bool,
}

/// Evaluate profit-target progress, trading-day count and readiness.
///
/// A profit target of 0 means progress is always 0 and advancement is never
/// automatic.
pub fn evaluate_progress(inp: &ProgressInputs) -> ProgressResult {
    let target = percent_of(inp.account_size_micros, inp.config.profit_target_percent);

    let progress_percent = if target > 0 {
        let raw = inp.current_profit_micros as f64 / target as f64 * 1000.0;
        (raw.round() / 10.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let day_profits = profits_by_local_date(inp.trades, inp.timezone);
    let days_traded = day_profits.len() as u32;

    let consistency_ok = match inp.config.consistency_rule_percent {
        Some(pct) if target > 0 => {
            let cap = percent_of(target, pct);
            day_profits.values().all(|&net| net <= cap)
        }
        _ => true,
    };

    let time_expired = inp.config.time_limit_days > 0
        && inp.now > inp.phase_started_at + Duration::days(inp.config.time_limit_days as i64);

    let ready_to_advance = target > 0
        && progress_percent >= 100.0
        && days_traded >= inp.config.min_trading_days
        && !inp.is_breached
        && consistency_ok
        && !time_expired;

    ProgressResult {
        profit_target_micros: target,
        progress_percent,
        days_traded,
        consistency_ok,
        time_expired,
        ready_to_advance,
    }
}

/// Net P&L per distinct local trading date. Trades without an exit timestamp
/// are skipped — the equity calculator has already rejected them by the time
/// this runs in the orchestrator.
fn profits_by_local_date(trades: &[Trade], tz: Tz) -> BTreeMap<NaiveDate, i64> {
    let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for t in trades {
        if let Some(exit) = t.exit_time {
            let date = exit.with_timezone(&tz).date_naive();
            *days.entry(date).or_insert(0) += t.net_micros();
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::MICROS_SCALE;
    use chrono::TimeZone;
    use fdk_schemas::{DrawdownMode, PhaseType};
    use uuid::Uuid;

    fn units(u: i64) -> i64 {
        u * MICROS_SCALE
    }

    fn config() -> PhaseConfig {
        PhaseConfig {
            phase_number: 1,
            phase_type: PhaseType::Evaluation,
            profit_target_percent: 10.0,
            daily_drawdown_percent: 5.0,
            max_drawdown_percent: 10.0,
            max_drawdown_mode: DrawdownMode::Static,
            min_trading_days: 3,
            time_limit_days: 0,
            consistency_rule_percent: None,
            profit_split_percent: 80.0,
            profit_split_increment_per_payout: 0.0,
            max_profit_split_percent: 0.0,
            payout_cycle_days: 14,
            min_days_before_first_payout: 7,
            min_payout_micros: 0,
            max_payout_micros: None,
        }
    }

    fn trade_on(day: u32, net_units: i64) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            phase_id: Uuid::nil(),
            pnl_micros: units(net_units),
            commission_micros: 0,
            entry_time: None,
            exit_time: Some(Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap()),
        }
    }

    fn inputs<'a>(
        cfg: &'a PhaseConfig,
        profit_units: i64,
        trades: &'a [Trade],
        breached: bool,
    ) -> ProgressInputs<'a> {
        ProgressInputs {
            account_size_micros: units(100_000),
            config: cfg,
            current_profit_micros: units(profit_units),
            trades,
            timezone: chrono_tz::UTC,
            is_breached: breached,
            phase_started_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            now: Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn target_met_enough_days_no_breach_is_ready() {
        let cfg = config();
        let trades = vec![trade_on(4, 4_000), trade_on(5, 3_000), trade_on(6, 3_000)];
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, false));
        assert_eq!(r.progress_percent, 100.0);
        assert_eq!(r.days_traded, 3);
        assert!(r.ready_to_advance);
    }

    #[test]
    fn progress_clamped_to_zero_and_hundred() {
        let cfg = config();
        let r = evaluate_progress(&inputs(&cfg, -5_000, &[], false));
        assert_eq!(r.progress_percent, 0.0);
        let r = evaluate_progress(&inputs(&cfg, 50_000, &[], false));
        assert_eq!(r.progress_percent, 100.0);
    }

    #[test]
    fn progress_rounds_to_one_decimal() {
        let cfg = config();
        // 1234 / 10000 = 12.34% -> 12.3
        let r = evaluate_progress(&inputs(&cfg, 1_234, &[], false));
        assert_eq!(r.progress_percent, 12.3);
    }

    #[test]
    fn zero_target_never_advances() {
        let mut cfg = config();
        cfg.profit_target_percent = 0.0;
        let trades = vec![trade_on(4, 4_000), trade_on(5, 4_000), trade_on(6, 4_000)];
        let r = evaluate_progress(&inputs(&cfg, 12_000, &trades, false));
        assert_eq!(r.progress_percent, 0.0);
        assert!(!r.ready_to_advance);
    }

    #[test]
    fn breach_blocks_advancement() {
        let cfg = config();
        let trades = vec![trade_on(4, 4_000), trade_on(5, 3_000), trade_on(6, 3_000)];
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, true));
        assert!(!r.ready_to_advance);
    }

    #[test]
    fn too_few_trading_days_blocks_advancement() {
        let cfg = config();
        let trades = vec![trade_on(4, 10_000)];
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, false));
        assert_eq!(r.days_traded, 1);
        assert!(!r.ready_to_advance);
    }

    #[test]
    fn multiple_trades_same_day_count_once() {
        let cfg = config();
        let trades = vec![trade_on(4, 2_000), trade_on(4, 2_000), trade_on(5, 6_000)];
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, false));
        assert_eq!(r.days_traded, 2);
    }

    #[test]
    fn consistency_rule_caps_best_day() {
        let mut cfg = config();
        cfg.consistency_rule_percent = Some(40.0);
        // Target 10k; cap 4k/day. Day 4 made 6k -> violation.
        let trades = vec![trade_on(4, 6_000), trade_on(5, 2_000), trade_on(6, 2_000)];
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, false));
        assert!(!r.consistency_ok);
        assert!(!r.ready_to_advance);

        // Spread evenly, same total: fine.
        let trades = vec![
            trade_on(4, 4_000),
            trade_on(5, 3_000),
            trade_on(6, 3_000),
        ];
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, false));
        assert!(r.consistency_ok);
        assert!(r.ready_to_advance);
    }

    #[test]
    fn expired_time_limit_blocks_advancement() {
        let mut cfg = config();
        cfg.time_limit_days = 10;
        let trades = vec![trade_on(4, 4_000), trade_on(5, 3_000), trade_on(6, 3_000)];
        // now = March 20, started March 1 -> past the 10-day limit.
        let r = evaluate_progress(&inputs(&cfg, 10_000, &trades, false));
        assert!(r.time_expired);
        assert!(!r.ready_to_advance);
    }

    #[test]
    fn trading_days_bucket_in_account_timezone() {
        let cfg = config();
        let tz: Tz = "America/New_York".parse().unwrap();
        // 04:30 UTC March 5 and 15:00 UTC March 4 are the same New York date.
        let trades = vec![
            Trade {
                trade_id: Uuid::from_u128(1),
                phase_id: Uuid::nil(),
                pnl_micros: units(1_000),
                commission_micros: 0,
                entry_time: None,
                exit_time: Some(Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()),
            },
            Trade {
                trade_id: Uuid::from_u128(2),
                phase_id: Uuid::nil(),
                pnl_micros: units(1_000),
                commission_micros: 0,
                entry_time: None,
                exit_time: Some(Utc.with_ymd_and_hms(2024, 3, 5, 4, 30, 0).unwrap()),
            },
        ];
        let mut inp = inputs(&cfg, 2_000, &trades, false);
        inp.timezone = tz;
        let r = evaluate_progress(&inp);
        assert_eq!(r.days_traded, 1);
    }
}
