//! Test doubles and fixtures for the phase-evaluation engine.
//!
//! `MemoryStore` implements every evaluator repository trait over plain
//! mutex-guarded maps with the same semantics the Postgres store provides —
//! in particular the optimistic breach transition (re-check under the lock,
//! lose the race => `AlreadyTerminal`, no write) and first-writer-wins
//! anchors. Scenario tests under `tests/` drive the real `PhaseEvaluator`
//! through this store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use fdk_evaluator::{
    AnchorRepository, CacheInvalidator, PayoutRepository, PhaseEvaluator, PhaseRepository,
    PhaseSnapshot, TradeRepository, TransitionOutcome,
};
use fdk_schemas::{
    AccountConfig, BreachRecord, DailyAnchor, NewBreach, PayoutRequest, PhaseConfig, PhaseRecord,
    PhaseStatus, Trade,
};

pub mod fixtures;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, AccountConfig>,
    phases: HashMap<Uuid, (PhaseRecord, PhaseConfig)>,
    trades: Vec<Trade>,
    anchors: HashMap<(Uuid, NaiveDate), DailyAnchor>,
    breaches: Vec<BreachRecord>,
    payouts: Vec<PayoutRequest>,
}

/// In-memory repository for scenario tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_account(&self, account: AccountConfig) {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(account.account_id, account);
    }

    pub fn insert_phase(&self, record: PhaseRecord, config: PhaseConfig) {
        self.inner
            .lock()
            .unwrap()
            .phases
            .insert(record.phase_id, (record, config));
    }

    pub fn insert_trade(&self, trade: Trade) {
        self.inner.lock().unwrap().trades.push(trade);
    }

    pub fn insert_payout(&self, payout: PayoutRequest) {
        self.inner.lock().unwrap().payouts.push(payout);
    }

    pub fn insert_anchor(&self, anchor: DailyAnchor) {
        self.inner
            .lock()
            .unwrap()
            .anchors
            .insert((anchor.phase_id, anchor.date), anchor);
    }

    pub fn phase_status(&self, phase_id: Uuid) -> Option<PhaseStatus> {
        self.inner
            .lock()
            .unwrap()
            .phases
            .get(&phase_id)
            .map(|(r, _)| r.status)
    }

    pub fn phase_ended_at(&self, phase_id: Uuid) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .unwrap()
            .phases
            .get(&phase_id)
            .and_then(|(r, _)| r.ended_at)
    }

    pub fn account_is_active(&self, account_id: Uuid) -> Option<bool> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .get(&account_id)
            .map(|a| a.is_active)
    }

    pub fn breaches(&self) -> Vec<BreachRecord> {
        self.inner.lock().unwrap().breaches.clone()
    }

    pub fn anchor(&self, phase_id: Uuid, date: NaiveDate) -> Option<DailyAnchor> {
        self.inner
            .lock()
            .unwrap()
            .anchors
            .get(&(phase_id, date))
            .cloned()
    }
}

#[async_trait]
impl PhaseRepository for MemoryStore {
    async fn load_phase(&self, phase_id: Uuid) -> Result<PhaseSnapshot> {
        let inner = self.inner.lock().unwrap();
        let (record, config) = inner
            .phases
            .get(&phase_id)
            .ok_or_else(|| anyhow!("phase {phase_id} not found"))?;
        let account = inner
            .accounts
            .get(&record.account_id)
            .ok_or_else(|| anyhow!("account {} not found", record.account_id))?;
        Ok(PhaseSnapshot {
            account: account.clone(),
            config: config.clone(),
            record: record.clone(),
        })
    }

    async fn fail_active_phase(
        &self,
        phase_id: Uuid,
        breach: NewBreach,
        ended_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        // Everything under one lock: the in-memory analogue of the single
        // transaction with an optimistic status re-check.
        let mut inner = self.inner.lock().unwrap();
        let account_id = {
            let (record, _) = inner
                .phases
                .get_mut(&phase_id)
                .ok_or_else(|| anyhow!("phase {phase_id} not found"))?;
            if record.status != PhaseStatus::Active {
                return Ok(TransitionOutcome::AlreadyTerminal(record.status));
            }
            record.status = PhaseStatus::Failed;
            record.ended_at = Some(ended_at);
            record.account_id
        };
        if let Some(account) = inner.accounts.get_mut(&account_id) {
            account.is_active = false;
        }
        inner.breaches.push(BreachRecord {
            breach_id: Uuid::new_v4(),
            phase_id,
            breach_type: breach.breach_type,
            breached_at: breach.breached_at,
            daily_drawdown_used_micros: breach.daily_drawdown_used_micros,
            daily_drawdown_limit_micros: breach.daily_drawdown_limit_micros,
            max_drawdown_used_micros: breach.max_drawdown_used_micros,
            max_drawdown_limit_micros: breach.max_drawdown_limit_micros,
        });
        Ok(TransitionOutcome::Applied)
    }
}

#[async_trait]
impl TradeRepository for MemoryStore {
    async fn trades_for_phase(&self, phase_id: Uuid) -> Result<Vec<Trade>> {
        let inner = self.inner.lock().unwrap();
        let mut trades: Vec<Trade> = inner
            .trades
            .iter()
            .filter(|t| t.phase_id == phase_id)
            .cloned()
            .collect();
        // Contract order: (exit_time, trade_id) ascending, missing exits first.
        trades.sort_by_key(|t| (t.exit_time, t.trade_id));
        Ok(trades)
    }
}

#[async_trait]
impl AnchorRepository for MemoryStore {
    async fn anchor_for(&self, phase_id: Uuid, date: NaiveDate) -> Result<Option<DailyAnchor>> {
        Ok(self.anchor(phase_id, date))
    }

    async fn ensure_anchor(
        &self,
        phase_id: Uuid,
        date: NaiveDate,
        anchor_equity_micros: i64,
    ) -> Result<DailyAnchor> {
        let mut inner = self.inner.lock().unwrap();
        let anchor = inner
            .anchors
            .entry((phase_id, date))
            .or_insert(DailyAnchor {
                phase_id,
                date,
                anchor_equity_micros,
            });
        Ok(anchor.clone())
    }
}

#[async_trait]
impl PayoutRepository for MemoryStore {
    async fn payouts_for_phase(&self, phase_id: Uuid) -> Result<Vec<PayoutRequest>> {
        let inner = self.inner.lock().unwrap();
        let mut payouts: Vec<PayoutRequest> = inner
            .payouts
            .iter()
            .filter(|p| p.phase_id == phase_id)
            .cloned()
            .collect();
        payouts.sort_by_key(|p| (p.requested_at, p.payout_id));
        Ok(payouts)
    }
}

// ---------------------------------------------------------------------------
// RecordingInvalidator
// ---------------------------------------------------------------------------

/// Captures cache-invalidation signals so tests can assert on them.
#[derive(Default)]
pub struct RecordingInvalidator {
    invalidated: Mutex<Vec<Uuid>>,
}

impl RecordingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn invalidated(&self) -> Vec<Uuid> {
        self.invalidated.lock().unwrap().clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate_account(&self, account_id: Uuid) {
        self.invalidated.lock().unwrap().push(account_id);
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Wire a `PhaseEvaluator` onto one store + invalidator pair.
pub fn evaluator(
    store: &Arc<MemoryStore>,
    cache: Arc<dyn CacheInvalidator>,
) -> PhaseEvaluator {
    PhaseEvaluator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache,
    )
}
