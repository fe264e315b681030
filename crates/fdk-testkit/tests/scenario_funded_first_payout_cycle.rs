use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use fdk_testkit::fixtures::*;
use fdk_testkit::{evaluator, MemoryStore, RecordingInvalidator};

/// Funded phase, first payout allowed 7 days in: at day 10 with positive
/// profit the trader is eligible for 80% of the 5k profit.
#[tokio::test]
async fn first_payout_eligible_after_min_days() {
    let account_id = Uuid::from_u128(1);
    let phase_id = Uuid::from_u128(2);

    let store = MemoryStore::new();
    store.insert_account(account(account_id));
    store.insert_phase(active_phase(phase_id, account_id), funded_config());
    store.insert_trade(trade_on(phase_id, 4, 15, 2_000));
    store.insert_trade(trade_on(phase_id, 6, 15, 3_000));

    let cache = RecordingInvalidator::new();
    let eval = evaluator(&store, cache)
        .evaluate(phase_id, Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap())
        .await
        .unwrap();

    let payout = eval.payout.expect("funded phase carries payout result");
    assert!(payout.eligible);
    assert_eq!(payout.effective_split_percent, 80.0);
    assert_eq!(payout.amount_micros, units(4_000));
    assert_eq!(payout.payouts_taken, 0);
    assert_eq!(payout.next_eligible_at, phase_start() + Duration::days(7));
}

/// After the first payout, the next one waits for the full 14-day cycle from
/// the previous request, not from phase start.
#[tokio::test]
async fn second_payout_waits_for_cycle() {
    let account_id = Uuid::from_u128(1);
    let phase_id = Uuid::from_u128(2);

    let store = MemoryStore::new();
    store.insert_account(account(account_id));
    store.insert_phase(active_phase(phase_id, account_id), funded_config());
    store.insert_trade(trade_on(phase_id, 4, 15, 5_000));
    store.insert_payout(payout_after(phase_id, 8, 4_000));

    let cache = RecordingInvalidator::new();
    let ev = evaluator(&store, cache);

    let eval = ev
        .evaluate(phase_id, Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap())
        .await
        .unwrap();
    let payout = eval.payout.unwrap();
    assert!(!payout.eligible);
    assert_eq!(payout.payouts_taken, 1);
    assert_eq!(payout.next_eligible_at, phase_start() + Duration::days(22));

    let eval = ev
        .evaluate(phase_id, Utc.with_ymd_and_hms(2024, 3, 23, 9, 0, 0).unwrap())
        .await
        .unwrap();
    assert!(eval.payout.unwrap().eligible);
}
