//! Phase-configuration sanity guards.
//!
//! Runs before any calculator touches the numbers, so a bad config can never
//! corrupt a breach decision or cause arithmetic surprises downstream.
//! Evaluation aborts for that phase only; the error names the offending
//! field.

use fdk_schemas::PhaseConfig;

use crate::error::EngineError;

fn reject(field: &'static str, message: impl Into<String>) -> Result<(), EngineError> {
    Err(EngineError::Configuration {
        field,
        message: message.into(),
    })
}

/// Validate a phase configuration against the owning account size.
pub fn validate_phase_config(
    account_size_micros: i64,
    cfg: &PhaseConfig,
) -> Result<(), EngineError> {
    if account_size_micros <= 0 {
        return reject("account_size", "must be positive");
    }

    let percent_fields: [(&'static str, f64); 5] = [
        ("profit_target_percent", cfg.profit_target_percent),
        ("daily_drawdown_percent", cfg.daily_drawdown_percent),
        ("max_drawdown_percent", cfg.max_drawdown_percent),
        ("profit_split_percent", cfg.profit_split_percent),
        (
            "profit_split_increment_per_payout",
            cfg.profit_split_increment_per_payout,
        ),
    ];
    for (field, value) in percent_fields {
        if !value.is_finite() || value < 0.0 {
            return reject(field, format!("must be a non-negative number, got {value}"));
        }
    }

    // Drawdown limits above 100% of their base are meaningless.
    if cfg.daily_drawdown_percent > 100.0 {
        return reject("daily_drawdown_percent", "must not exceed 100");
    }
    if cfg.max_drawdown_percent > 100.0 {
        return reject("max_drawdown_percent", "must not exceed 100");
    }
    if cfg.profit_split_percent > 100.0 {
        return reject("profit_split_percent", "must not exceed 100");
    }
    if !cfg.max_profit_split_percent.is_finite()
        || cfg.max_profit_split_percent < 0.0
        || cfg.max_profit_split_percent > 100.0
    {
        return reject("max_profit_split_percent", "must be within 0..=100");
    }

    if let Some(pct) = cfg.consistency_rule_percent {
        if !pct.is_finite() || pct <= 0.0 || pct > 100.0 {
            return reject(
                "consistency_rule_percent",
                format!("must be within (0, 100], got {pct}"),
            );
        }
    }

    if cfg.min_payout_micros < 0 {
        return reject("min_payout", "must not be negative");
    }
    if let Some(max) = cfg.max_payout_micros {
        if max < cfg.min_payout_micros {
            return reject("max_payout", "must not be below min_payout");
        }
    }

    Ok(())
}
