use chrono::TimeZone;
use chrono::Utc;
use uuid::Uuid;

use fdk_schemas::{BreachType, PhaseStatus};
use fdk_testkit::fixtures::*;
use fdk_testkit::{evaluator, MemoryStore, RecordingInvalidator};

/// 100k account, 5% daily limit, a single -6000 day: daily drawdown breach,
/// phase fails, account deactivates, breach audit + cache signal emitted.
#[tokio::test]
async fn single_losing_day_breaches_daily_limit() {
    let account_id = Uuid::from_u128(1);
    let phase_id = Uuid::from_u128(2);

    let store = MemoryStore::new();
    store.insert_account(account(account_id));
    store.insert_phase(active_phase(phase_id, account_id), evaluation_config());
    store.insert_trade(trade_on(phase_id, 4, 15, -6_000));

    let cache = RecordingInvalidator::new();
    let eval = evaluator(&store, cache.clone())
        .evaluate(phase_id, Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap())
        .await
        .unwrap();

    assert!(eval.drawdown.is_breached);
    assert_eq!(eval.drawdown.breach_type, Some(BreachType::DailyDrawdown));
    assert_eq!(eval.drawdown.daily_drawdown_used_micros, units(6_000));
    assert_eq!(eval.drawdown.daily_drawdown_limit_micros, units(5_000));

    assert!(eval.transition_applied);
    assert_eq!(eval.status, PhaseStatus::Failed);
    assert_eq!(store.phase_status(phase_id), Some(PhaseStatus::Failed));
    assert!(store.phase_ended_at(phase_id).is_some());
    assert_eq!(store.account_is_active(account_id), Some(false));

    let breaches = store.breaches();
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].breach_type, BreachType::DailyDrawdown);
    assert_eq!(cache.invalidated(), vec![account_id]);
}

/// When one day blows through both the daily and the max limit, the daily
/// breach wins the tie-break.
#[tokio::test]
async fn daily_takes_priority_when_both_limits_exceeded() {
    let account_id = Uuid::from_u128(1);
    let phase_id = Uuid::from_u128(2);

    let store = MemoryStore::new();
    store.insert_account(account(account_id));
    store.insert_phase(active_phase(phase_id, account_id), evaluation_config());
    // -15k in one day: daily used 15k > 5k, max used 15k > 10k.
    store.insert_trade(trade_on(phase_id, 4, 15, -15_000));

    let cache = RecordingInvalidator::new();
    let eval = evaluator(&store, cache)
        .evaluate(phase_id, Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap())
        .await
        .unwrap();

    assert!(eval.drawdown.max_drawdown_used_micros > eval.drawdown.max_drawdown_limit_micros);
    assert_eq!(eval.drawdown.breach_type, Some(BreachType::DailyDrawdown));
    assert_eq!(store.breaches()[0].breach_type, BreachType::DailyDrawdown);
}
