//! fdk-engine
//!
//! Pure calculators for funded-account challenge evaluation:
//! - equity curve + high-water mark accumulation
//! - daily / max drawdown usage and breach detection
//! - profit-target progress and advancement readiness
//! - funded-phase payout eligibility
//! - win-rate / profit-factor risk metrics
//!
//! Deterministic, pure logic. No IO, no clocks, no storage calls — every
//! function takes its full input set and returns a value object. Money is
//! fixed-point `i64` micros throughout; only ratios are `f64`.

mod config;
mod drawdown;
mod equity;
mod error;
mod metrics;
mod money;
mod payout;
mod progress;

pub use config::validate_phase_config;
pub use drawdown::{evaluate_drawdown, DrawdownInputs, DrawdownResult};
pub use equity::{accumulate, EquityCurve, EquityPoint};
pub use error::EngineError;
pub use metrics::{compute_risk_metrics, RiskMetrics};
pub use money::{bps_of, percent_of, percent_to_bps, MICROS_SCALE};
pub use payout::{evaluate_payout, PayoutEligibility, PayoutInputs};
pub use progress::{evaluate_progress, ProgressInputs, ProgressResult};
