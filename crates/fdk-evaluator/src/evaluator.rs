//! Phase evaluation driver.
//!
//! Invoked on every read of a phase's live state, not on a schedule. The
//! driver never trusts the persisted `status` for breach truth: it recomputes
//! from raw trades each time, which is what makes historical breaches missed
//! by older code paths eventually consistent with ground truth.
//!
//! Write discipline: at most one `active → failed` transition per call, gated
//! by the repository's in-transaction optimistic re-check. Losing that race
//! is a success, not an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fdk_engine::{
    accumulate, compute_risk_metrics, evaluate_drawdown, evaluate_payout, evaluate_progress,
    validate_phase_config, DrawdownInputs, DrawdownResult, EngineError, PayoutEligibility,
    PayoutInputs, ProgressInputs, ProgressResult, RiskMetrics,
};
use fdk_schemas::{NewBreach, PhaseStatus, PhaseType};

use crate::error::EvaluatorError;
use crate::repo::{
    AnchorRepository, CacheInvalidator, PayoutRepository, PhaseRepository, TradeRepository,
    TransitionOutcome,
};

/// Computed truth for one phase at one instant. Returned on every call,
/// including for phases that were already terminal before this call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvaluation {
    pub phase_id: Uuid,
    pub account_id: Uuid,
    /// Status after this evaluation (reflects a transition applied by this
    /// call or by a concurrent one).
    pub status: PhaseStatus,
    /// True only when THIS call performed the `active → failed` transition.
    pub transition_applied: bool,
    pub drawdown: DrawdownResult,
    pub progress: ProgressResult,
    /// Present for funded phases only.
    pub payout: Option<PayoutEligibility>,
    pub metrics: RiskMetrics,
}

/// The state-machine driver. Construct once with injected repositories and
/// share across requests; evaluations of unrelated phases need no
/// coordination.
pub struct PhaseEvaluator {
    phases: Arc<dyn PhaseRepository>,
    trades: Arc<dyn TradeRepository>,
    anchors: Arc<dyn AnchorRepository>,
    payouts: Arc<dyn PayoutRepository>,
    cache: Arc<dyn CacheInvalidator>,
}

impl PhaseEvaluator {
    pub fn new(
        phases: Arc<dyn PhaseRepository>,
        trades: Arc<dyn TradeRepository>,
        anchors: Arc<dyn AnchorRepository>,
        payouts: Arc<dyn PayoutRepository>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            phases,
            trades,
            anchors,
            payouts,
            cache,
        }
    }

    /// Evaluate one phase as of `now`.
    ///
    /// Load → pure calculators → conditional transition → full result. The
    /// only writes are the lazy creation of today's anchor (active phases)
    /// and the at-most-one breach transition.
    pub async fn evaluate(
        &self,
        phase_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PhaseEvaluation, EvaluatorError> {
        let snapshot = self
            .phases
            .load_phase(phase_id)
            .await
            .map_err(EvaluatorError::Storage)?;
        let account = &snapshot.account;
        let config = &snapshot.config;
        let record = &snapshot.record;

        validate_phase_config(account.account_size_micros, config)?;
        let tz: Tz = account.timezone.parse().map_err(|_| {
            EngineError::Configuration {
                field: "timezone",
                message: format!("unknown IANA zone {:?}", account.timezone),
            }
        })?;

        let trades = self
            .trades
            .trades_for_phase(phase_id)
            .await
            .map_err(EvaluatorError::Storage)?;
        let curve = accumulate(account.account_size_micros, &trades)?;

        // Daily anchor: lazily created for active phases from the curve's
        // day-open balance; terminal phases stay read-only and fall back to
        // the account size when no anchor exists.
        let today = now.with_timezone(&tz).date_naive();
        let daily_start_balance_micros = if record.status == PhaseStatus::Active {
            let day_open = curve.balance_at_day_open(today, tz);
            self.anchors
                .ensure_anchor(phase_id, today, day_open)
                .await
                .map_err(EvaluatorError::Storage)?
                .anchor_equity_micros
        } else {
            self.anchors
                .anchor_for(phase_id, today)
                .await
                .map_err(EvaluatorError::Storage)?
                .map(|a| a.anchor_equity_micros)
                .unwrap_or(account.account_size_micros)
        };

        let drawdown = evaluate_drawdown(&DrawdownInputs {
            account_size_micros: account.account_size_micros,
            daily_drawdown_percent: config.daily_drawdown_percent,
            max_drawdown_percent: config.max_drawdown_percent,
            max_drawdown_mode: config.max_drawdown_mode,
            current_equity_micros: curve.final_balance_micros,
            daily_start_balance_micros,
            high_water_mark_micros: curve.high_water_mark_micros,
        });

        let current_profit_micros = curve.final_balance_micros - account.account_size_micros;

        let progress = evaluate_progress(&ProgressInputs {
            account_size_micros: account.account_size_micros,
            config,
            current_profit_micros,
            trades: &trades,
            timezone: tz,
            is_breached: drawdown.is_breached,
            phase_started_at: record.started_at,
            now,
        });

        let payout = if config.phase_type == PhaseType::Funded {
            let prior = self
                .payouts
                .payouts_for_phase(phase_id)
                .await
                .map_err(EvaluatorError::Storage)?;
            Some(evaluate_payout(&PayoutInputs {
                config,
                phase_started_at: record.started_at,
                prior_payouts: &prior,
                current_profit_micros,
                now,
            }))
        } else {
            None
        };

        let metrics = compute_risk_metrics(&trades);

        let (status, transition_applied) = match (record.status, drawdown.breach_type) {
            (PhaseStatus::Active, Some(breach_type)) => {
                let breach = NewBreach {
                    breach_type,
                    breached_at: now,
                    daily_drawdown_used_micros: drawdown.daily_drawdown_used_micros,
                    daily_drawdown_limit_micros: drawdown.daily_drawdown_limit_micros,
                    max_drawdown_used_micros: drawdown.max_drawdown_used_micros,
                    max_drawdown_limit_micros: drawdown.max_drawdown_limit_micros,
                };
                match self
                    .phases
                    .fail_active_phase(phase_id, breach, now)
                    .await
                    .map_err(EvaluatorError::Storage)?
                {
                    TransitionOutcome::Applied => {
                        tracing::info!(
                            phase_id = %phase_id,
                            account_id = %account.account_id,
                            breach_type = breach_type.as_str(),
                            "phase failed on drawdown breach"
                        );
                        self.cache.invalidate_account(account.account_id);
                        (PhaseStatus::Failed, true)
                    }
                    TransitionOutcome::AlreadyTerminal(observed) => {
                        tracing::debug!(
                            phase_id = %phase_id,
                            observed = observed.as_str(),
                            "breach transition lost optimistic race, no-op"
                        );
                        (observed, false)
                    }
                }
            }
            (status, _) => (status, false),
        };

        Ok(PhaseEvaluation {
            phase_id,
            account_id: account.account_id,
            status,
            transition_applied,
            drawdown,
            progress,
            payout,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{NoopInvalidator, PhaseSnapshot};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use fdk_engine::MICROS_SCALE;
    use fdk_schemas::{
        AccountConfig, DailyAnchor, DrawdownMode, PayoutRequest, PhaseConfig, PhaseRecord, Trade,
    };

    // Minimal single-phase stub store. The full in-memory store with real
    // transition semantics lives in fdk-testkit; these stubs only exercise
    // the driver's plumbing.
    struct StubStore {
        snapshot: PhaseSnapshot,
        trades: Vec<Trade>,
    }

    #[async_trait]
    impl PhaseRepository for StubStore {
        async fn load_phase(&self, _phase_id: Uuid) -> Result<PhaseSnapshot> {
            Ok(self.snapshot.clone())
        }

        async fn fail_active_phase(
            &self,
            _phase_id: Uuid,
            _breach: NewBreach,
            _ended_at: DateTime<Utc>,
        ) -> Result<TransitionOutcome> {
            Ok(TransitionOutcome::Applied)
        }
    }

    #[async_trait]
    impl TradeRepository for StubStore {
        async fn trades_for_phase(&self, _phase_id: Uuid) -> Result<Vec<Trade>> {
            Ok(self.trades.clone())
        }
    }

    #[async_trait]
    impl AnchorRepository for StubStore {
        async fn anchor_for(
            &self,
            _phase_id: Uuid,
            _date: NaiveDate,
        ) -> Result<Option<DailyAnchor>> {
            Ok(None)
        }

        async fn ensure_anchor(
            &self,
            phase_id: Uuid,
            date: NaiveDate,
            anchor_equity_micros: i64,
        ) -> Result<DailyAnchor> {
            Ok(DailyAnchor {
                phase_id,
                date,
                anchor_equity_micros,
            })
        }
    }

    #[async_trait]
    impl PayoutRepository for StubStore {
        async fn payouts_for_phase(&self, _phase_id: Uuid) -> Result<Vec<PayoutRequest>> {
            Ok(Vec::new())
        }
    }

    fn units(u: i64) -> i64 {
        u * MICROS_SCALE
    }

    fn snapshot(timezone: &str, phase_type: PhaseType) -> PhaseSnapshot {
        PhaseSnapshot {
            account: AccountConfig {
                account_id: Uuid::from_u128(10),
                account_size_micros: units(100_000),
                currency: "USD".to_string(),
                timezone: timezone.to_string(),
                is_active: true,
            },
            config: PhaseConfig {
                phase_number: 1,
                phase_type,
                profit_target_percent: 10.0,
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
            },
            record: PhaseRecord {
                phase_id: Uuid::from_u128(20),
                account_id: Uuid::from_u128(10),
                status: PhaseStatus::Active,
                started_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                ended_at: None,
            },
        }
    }

    fn evaluator(store: Arc<StubStore>) -> PhaseEvaluator {
        PhaseEvaluator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(NoopInvalidator),
        )
    }

    #[tokio::test]
    async fn unknown_timezone_is_configuration_error() {
        let mut snap = snapshot("Mars/Olympus_Mons", PhaseType::Evaluation);
        snap.record.status = PhaseStatus::Active;
        let store = Arc::new(StubStore {
            snapshot: snap,
            trades: vec![],
        });
        let err = evaluator(store)
            .evaluate(Uuid::from_u128(20), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluatorError::Invalid(EngineError::Configuration { field: "timezone", .. })
        ));
    }

    #[tokio::test]
    async fn evaluation_phase_has_no_payout_section() {
        let store = Arc::new(StubStore {
            snapshot: snapshot("UTC", PhaseType::Evaluation),
            trades: vec![],
        });
        let eval = evaluator(store)
            .evaluate(Uuid::from_u128(20), Utc::now())
            .await
            .unwrap();
        assert!(eval.payout.is_none());
        assert_eq!(eval.status, PhaseStatus::Active);
        assert!(!eval.transition_applied);
    }

    #[tokio::test]
    async fn funded_phase_reports_payout_eligibility() {
        let store = Arc::new(StubStore {
            snapshot: snapshot("UTC", PhaseType::Funded),
            trades: vec![],
        });
        let eval = evaluator(store)
            .evaluate(
                Uuid::from_u128(20),
                Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        let payout = eval.payout.expect("funded phase must carry payout result");
        // Past min_days_before_first_payout but with zero profit.
        assert!(!payout.eligible);
        assert_eq!(payout.payouts_taken, 0);
    }

    #[tokio::test]
    async fn breach_on_active_phase_applies_transition() {
        let mut snap = snapshot("UTC", PhaseType::Evaluation);
        snap.record.status = PhaseStatus::Active;
        let store = Arc::new(StubStore {
            snapshot: snap,
            trades: vec![Trade {
                trade_id: Uuid::from_u128(1),
                phase_id: Uuid::from_u128(20),
                pnl_micros: units(-6_000),
                commission_micros: 0,
                entry_time: None,
                exit_time: Some(Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap()),
            }],
        });
        let eval = evaluator(store)
            .evaluate(
                Uuid::from_u128(20),
                Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        assert!(eval.transition_applied);
        assert_eq!(eval.status, PhaseStatus::Failed);
        assert!(eval.drawdown.is_breached);
    }
}
