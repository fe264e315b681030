//! fdk-evaluator
//!
//! Phase-evaluation orchestrator: the state-machine driver that recomputes a
//! phase's truth from raw trade data on every read and applies at most one
//! `active → failed` transition when a breach is found on a still-active
//! phase.
//!
//! The orchestrator is the only component here that performs IO, and it does
//! so exclusively through injected repository interfaces — no global clients,
//! no duck-typed access paths. Calculators come from `fdk-engine` and stay
//! pure.

mod error;
mod evaluator;
mod repo;

pub use error::EvaluatorError;
pub use evaluator::{PhaseEvaluation, PhaseEvaluator};
pub use repo::{
    AnchorRepository, CacheInvalidator, NoopInvalidator, PayoutRepository, PhaseRepository,
    PhaseSnapshot, TradeRepository, TransitionOutcome,
};
