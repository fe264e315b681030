//! Repository boundary for phase evaluation.
//!
//! One explicit, versioned data contract between the orchestrator and its
//! persistence layer. Implementations must be object-safe so callers can hold
//! `Arc<dyn …>` without knowing the concrete type, and `Send + Sync` so
//! evaluations can run concurrently across accounts.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fdk_schemas::{
    AccountConfig, DailyAnchor, NewBreach, PayoutRequest, PhaseConfig, PhaseRecord, PhaseStatus,
    Trade,
};
use uuid::Uuid;

/// Everything needed to evaluate one phase, loaded in one shot.
#[derive(Debug, Clone)]
pub struct PhaseSnapshot {
    pub account: AccountConfig,
    pub config: PhaseConfig,
    pub record: PhaseRecord,
}

/// Result of the conditional breach transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This call performed the `active → failed` transition.
    Applied,
    /// The optimistic re-check found the phase no longer active; nothing was
    /// written. Carries the status the transaction observed.
    AlreadyTerminal(PhaseStatus),
}

/// Phase records + the conditional breach transition.
#[async_trait]
pub trait PhaseRepository: Send + Sync {
    async fn load_phase(&self, phase_id: Uuid) -> Result<PhaseSnapshot>;

    /// Atomically: re-check `status == active`, set `status = failed` +
    /// `ended_at`, deactivate the owning account, and write the breach audit
    /// record — all in one transaction. A failed re-check must roll back and
    /// report [`TransitionOutcome::AlreadyTerminal`] instead of erroring.
    async fn fail_active_phase(
        &self,
        phase_id: Uuid,
        breach: NewBreach,
        ended_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome>;
}

/// Trades scoped to one phase.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Must return the phase's own trades only, ordered ascending by
    /// `(exit_time, trade_id)`. The calculator re-validates the ordering and
    /// rejects violations as data-integrity errors.
    async fn trades_for_phase(&self, phase_id: Uuid) -> Result<Vec<Trade>>;
}

/// Daily anchors: equity at the start of each trading day.
#[async_trait]
pub trait AnchorRepository: Send + Sync {
    async fn anchor_for(&self, phase_id: Uuid, date: NaiveDate) -> Result<Option<DailyAnchor>>;

    /// Create the anchor for `(phase, date)` if absent and return the stored
    /// row. The first writer wins; an existing anchor is never overwritten.
    async fn ensure_anchor(
        &self,
        phase_id: Uuid,
        date: NaiveDate,
        anchor_equity_micros: i64,
    ) -> Result<DailyAnchor>;
}

/// Prior payouts for a funded phase.
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    async fn payouts_for_phase(&self, phase_id: Uuid) -> Result<Vec<PayoutRequest>>;
}

/// Cache-invalidation signal for the boundary layer.
///
/// Called after a transition commits so account-read caches drop their tags.
/// Injected at construction rather than imported ad hoc; use
/// [`NoopInvalidator`] where no cache exists (tests, batch jobs).
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_account(&self, account_id: Uuid);
}

/// Does nothing. For callers without a cache layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate_account(&self, _account_id: Uuid) {}
}
