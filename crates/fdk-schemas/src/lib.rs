//! Shared domain records for the funded-account challenge engine.
//!
//! These are the types exchanged between the evaluation engine and the
//! persistence/boundary layer. One canonical shape per concept — repositories
//! decode straight into these structs and the engine never sees storage rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle of a phase record. `Passed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Active,
    Passed,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Active => "active",
            PhaseStatus::Passed => "passed",
            PhaseStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PhaseStatus::Active),
            "passed" => Some(PhaseStatus::Passed),
            "failed" => Some(PhaseStatus::Failed),
            _ => None,
        }
    }

    /// True once the record can no longer transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PhaseStatus::Active)
    }
}

/// Which kind of challenge stage a phase is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Evaluation,
    Funded,
}

impl PhaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseType::Evaluation => "evaluation",
            PhaseType::Funded => "funded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "evaluation" => Some(PhaseType::Evaluation),
            "funded" => Some(PhaseType::Funded),
            _ => None,
        }
    }
}

/// Whether the max-drawdown reference point trails new equity peaks or stays
/// fixed at the account size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownMode {
    Static,
    Trailing,
}

impl DrawdownMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawdownMode::Static => "static",
            DrawdownMode::Trailing => "trailing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(DrawdownMode::Static),
            "trailing" => Some(DrawdownMode::Trailing),
            _ => None,
        }
    }
}

/// Which limit a breach tripped. Daily always wins the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachType {
    DailyDrawdown,
    MaxDrawdown,
}

impl BreachType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreachType::DailyDrawdown => "daily_drawdown",
            BreachType::MaxDrawdown => "max_drawdown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily_drawdown" => Some(BreachType::DailyDrawdown),
            "max_drawdown" => Some(BreachType::MaxDrawdown),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Account & phase configuration
// ---------------------------------------------------------------------------

/// Immutable per-master-account configuration. Created at account setup and
/// never mutated by the engine (deactivation flips `is_active` only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_id: Uuid,
    /// Account size in micros (1 unit of currency = 1_000_000 micros).
    pub account_size_micros: i64,
    pub currency: String,
    /// IANA zone name used for trading-day bucketing (e.g. `"America/New_York"`).
    pub timezone: String,
    pub is_active: bool,
}

/// Per-phase rule set. Created when the phase starts; immutable thereafter —
/// advancement creates a new phase record, it never rewrites this one.
///
/// Percent fields are plain percents (`5.0` = 5%). A percent of 0 disables
/// the corresponding limit/target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub phase_number: u32,
    pub phase_type: PhaseType,
    pub profit_target_percent: f64,
    pub daily_drawdown_percent: f64,
    pub max_drawdown_percent: f64,
    pub max_drawdown_mode: DrawdownMode,
    pub min_trading_days: u32,
    /// Calendar-day deadline for the phase; 0 = no limit.
    pub time_limit_days: u32,
    /// Single-day profit cap as a percent of the profit-target amount.
    pub consistency_rule_percent: Option<f64>,
    pub profit_split_percent: f64,
    pub profit_split_increment_per_payout: f64,
    /// Upper bound for the incremented split; 0 = no cap.
    pub max_profit_split_percent: f64,
    pub payout_cycle_days: u32,
    pub min_days_before_first_payout: u32,
    pub min_payout_micros: i64,
    /// Unbounded above when absent.
    pub max_payout_micros: Option<i64>,
}

/// Mutable phase lifecycle record. Exactly one per master account may be
/// `active` at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase_id: Uuid,
    pub account_id: Uuid,
    pub status: PhaseStatus,
    pub started_at: DateTime<Utc>,
    /// Set once on the terminal transition.
    pub ended_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Trades & anchors
// ---------------------------------------------------------------------------

/// One closed trade, immutable once recorded. Net contribution to equity is
/// `pnl - commission`.
///
/// Timestamps are optional so that upstream records missing them surface as a
/// data-integrity error in the calculator instead of a decode failure here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub phase_id: Uuid,
    pub pnl_micros: i64,
    pub commission_micros: i64,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl Trade {
    /// `pnl - commission` in micros.
    pub fn net_micros(&self) -> i64 {
        self.pnl_micros - self.commission_micros
    }
}

/// Equity at the start of a trading day, one per `(phase, local date)`.
/// Created lazily the first time a day is evaluated; never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAnchor {
    pub phase_id: Uuid,
    pub date: NaiveDate,
    pub anchor_equity_micros: i64,
}

// ---------------------------------------------------------------------------
// Breach audit
// ---------------------------------------------------------------------------

/// Evidence captured at the moment a breach transition is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBreach {
    pub breach_type: BreachType,
    pub breached_at: DateTime<Utc>,
    pub daily_drawdown_used_micros: i64,
    pub daily_drawdown_limit_micros: i64,
    pub max_drawdown_used_micros: i64,
    pub max_drawdown_limit_micros: i64,
}

/// Persisted breach audit row. Created once per failed phase, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachRecord {
    pub breach_id: Uuid,
    pub phase_id: Uuid,
    pub breach_type: BreachType,
    pub breached_at: DateTime<Utc>,
    pub daily_drawdown_used_micros: i64,
    pub daily_drawdown_limit_micros: i64,
    pub max_drawdown_used_micros: i64,
    pub max_drawdown_limit_micros: i64,
}

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

/// A payout taken from a funded phase. Written by the payout workflow, read
/// (never mutated) by the eligibility evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub payout_id: Uuid,
    pub phase_id: Uuid,
    pub amount_micros: i64,
    pub requested_at: DateTime<Utc>,
    pub profit_split_percent_applied: f64,
}
