//! Canonical test fixtures: a 100k USD account with the usual two-step
//! challenge rule set. Scenario tests tweak fields from here instead of
//! building configs from scratch.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use fdk_engine::MICROS_SCALE;
use fdk_schemas::{
    AccountConfig, DrawdownMode, PayoutRequest, PhaseConfig, PhaseRecord, PhaseStatus, PhaseType,
    Trade,
};

pub fn units(u: i64) -> i64 {
    u * MICROS_SCALE
}

/// Phase start used across fixtures: 2024-03-01 00:00 UTC.
pub fn phase_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// 100k USD account, UTC trading days.
pub fn account(account_id: Uuid) -> AccountConfig {
    AccountConfig {
        account_id,
        account_size_micros: units(100_000),
        currency: "USD".to_string(),
        timezone: "UTC".to_string(),
        is_active: true,
    }
}

/// Phase-1 evaluation rules: 10% target, 5% daily, 10% static max, 3 days.
pub fn evaluation_config() -> PhaseConfig {
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
        profit_split_percent: 0.0,
        profit_split_increment_per_payout: 0.0,
        max_profit_split_percent: 0.0,
        payout_cycle_days: 0,
        min_days_before_first_payout: 0,
        min_payout_micros: 0,
        max_payout_micros: None,
    }
}

/// Funded rules: no target, 80% split, 14-day cycle, first payout after 7.
pub fn funded_config() -> PhaseConfig {
    PhaseConfig {
        phase_number: 3,
        phase_type: PhaseType::Funded,
        profit_target_percent: 0.0,
        daily_drawdown_percent: 5.0,
        max_drawdown_percent: 10.0,
        max_drawdown_mode: DrawdownMode::Static,
        min_trading_days: 0,
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

pub fn active_phase(phase_id: Uuid, account_id: Uuid) -> PhaseRecord {
    PhaseRecord {
        phase_id,
        account_id,
        status: PhaseStatus::Active,
        started_at: phase_start(),
        ended_at: None,
    }
}

/// Trade closed on 2024-03-`day` at `hour`:00 UTC with the given net P&L.
pub fn trade_on(phase_id: Uuid, day: u32, hour: u32, net_units: i64) -> Trade {
    Trade {
        trade_id: Uuid::new_v4(),
        phase_id,
        pnl_micros: units(net_units),
        commission_micros: 0,
        entry_time: Some(Utc.with_ymd_and_hms(2024, 3, day, hour.saturating_sub(1), 0, 0).unwrap()),
        exit_time: Some(Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()),
    }
}

/// A prior payout `days_after_start` days into the funded phase.
pub fn payout_after(phase_id: Uuid, days_after_start: i64, amount_units: i64) -> PayoutRequest {
    PayoutRequest {
        payout_id: Uuid::new_v4(),
        phase_id,
        amount_micros: units(amount_units),
        requested_at: phase_start() + chrono::Duration::days(days_after_start),
        profit_split_percent_applied: 80.0,
    }
}
