//! The recurring-charge sweep: schedule advancement, the per-instrument circuit breaker and per-item
//! isolation inside a batch.
use chrono::Utc;
use csg_common::Kobo;
use savings_engine::{
    db_types::{
        CircleStatus,
        ContributionStatus,
        Frequency,
        NewCircleMember,
        NewContribution,
        NewSavingCircle,
        NewStoredCard,
    },
    events::EventProducers,
    RecurringChargeApi,
    SavingsLedger,
};

mod support;

use support::{
    prepare_env::{prepare_test_env, random_db_path},
    providers::{ChargeScript, ScriptedCharger},
};

#[tokio::test]
async fn successful_charge_advances_the_schedule() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let card = db.insert_card(NewStoredCard::new("user-1", "tok_001", "u1@example.com").preferred()).await.unwrap();
    let plan = db
        .insert_contribution(
            NewContribution::new("user-1", "Rent", Kobo::from(10_000), Frequency::Monthly).with_card(card.id),
        )
        .await
        .unwrap();
    let before = plan.next_contribution_date;

    let charger = ScriptedCharger::always_succeed();
    let api = RecurringChargeApi::new(db.clone(), charger.clone(), EventProducers::default());
    let now = Utc::now();
    let summary = api.sweep_contributions(now).await;
    assert_eq!(summary.charged, 1);
    assert_eq!(summary.errors, 0);

    let plan = db.fetch_contribution(plan.id).await.unwrap().unwrap();
    assert_eq!(plan.balance, Kobo::from(10_000));
    assert!(plan.next_contribution_date > before, "next due date must be strictly later");
    assert_eq!(plan.last_contribution_date.map(|d| d.timestamp()), Some(now.timestamp()));
    assert_eq!(plan.status, ContributionStatus::Pending);
    // the charge is on the ledger, linked to the plan
    let row = db
        .fetch_transaction_by_reference(&"charge-0000".to_string().into())
        .await
        .unwrap()
        .expect("charge must write a history record");
    assert_eq!(row.contribution_id, Some(plan.id));

    // advanced past `now`, so the plan has dropped out of the due set
    let summary = api.sweep_contributions(now).await;
    assert_eq!(summary.attempted, 0);
}

#[tokio::test]
async fn three_declines_trip_the_circuit_breaker() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let card = db.insert_card(NewStoredCard::new("user-2", "tok_002", "u2@example.com")).await.unwrap();
    let plan = db
        .insert_contribution(
            NewContribution::new("user-2", "School fees", Kobo::from(100), Frequency::Monthly).with_card(card.id),
        )
        .await
        .unwrap();
    let before = plan.next_contribution_date;

    let charger = ScriptedCharger::with_script(vec![
        ChargeScript::Declined,
        ChargeScript::Declined,
        ChargeScript::Declined,
    ]);
    let api = RecurringChargeApi::new(db.clone(), charger.clone(), EventProducers::default());
    for _ in 0..3 {
        let summary = api.sweep_contributions(Utc::now()).await;
        assert_eq!(summary.declined, 1);
    }

    let card = db.fetch_card(card.id).await.unwrap().unwrap();
    assert_eq!(card.failures, 3);
    let plan = db.fetch_contribution(plan.id).await.unwrap().unwrap();
    assert_eq!(plan.balance, Kobo::from(0), "declined charges must not move the balance");
    assert_eq!(plan.next_contribution_date, before, "declined charges must not advance the schedule");
    assert!(plan.last_contribution_date.is_none());

    // the fourth run skips the instrument entirely
    let summary = api.sweep_contributions(Utc::now()).await;
    assert_eq!(summary.skipped_circuit_broken, 1);
    assert_eq!(charger.call_count(), 3, "a circuit-broken card must not be charged again");

    // manual reset re-arms it
    db.reset_card_failures(card.id).await.unwrap();
    let summary = api.sweep_contributions(Utc::now()).await;
    assert_eq!(summary.charged, 1);
}

#[tokio::test]
async fn one_bad_item_does_not_abort_the_batch() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let card = db.insert_card(NewStoredCard::new("user-3", "tok_003", "u3@example.com").preferred()).await.unwrap();

    let mut broken = NewContribution::new("user-3", "Broken plan", Kobo::from(500), Frequency::Daily);
    broken.frequency = "Fortnightly".to_string();
    let broken = db.insert_contribution(broken).await.unwrap();
    let healthy = db
        .insert_contribution(
            NewContribution::new("user-3", "Healthy plan", Kobo::from(700), Frequency::Daily).with_card(card.id),
        )
        .await
        .unwrap();

    let charger = ScriptedCharger::always_succeed();
    let api = RecurringChargeApi::new(db.clone(), charger, EventProducers::default());
    let summary = api.sweep_contributions(Utc::now()).await;
    assert_eq!(summary.errors, 1, "the unknown frequency is a hard error for its item");
    assert_eq!(summary.charged, 1, "its neighbour must still be processed");

    let broken = db.fetch_contribution(broken.id).await.unwrap().unwrap();
    assert_eq!(broken.balance, Kobo::from(0));
    assert!(broken.last_contribution_date.is_none(), "the bad item must not be mutated");
    let healthy = db.fetch_contribution(healthy.id).await.unwrap().unwrap();
    assert_eq!(healthy.balance, Kobo::from(700));
}

#[tokio::test]
async fn provider_blowup_counts_as_a_failed_charge() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let card = db.insert_card(NewStoredCard::new("user-4", "tok_004", "u4@example.com").preferred()).await.unwrap();
    db.insert_contribution(NewContribution::new("user-4", "Pension", Kobo::from(900), Frequency::Weekly))
        .await
        .unwrap();

    let charger = ScriptedCharger::with_script(vec![ChargeScript::Unreachable]);
    let api = RecurringChargeApi::new(db.clone(), charger, EventProducers::default());
    let summary = api.sweep_contributions(Utc::now()).await;
    assert_eq!(summary.declined, 1);
    assert_eq!(summary.errors, 0, "an unreachable provider is handled, not thrown");
    let card = db.fetch_card(card.id).await.unwrap().unwrap();
    assert_eq!(card.failures, 1);
}

#[tokio::test]
async fn circle_sweep_charges_members_and_completes_at_goal() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let card_a = db.insert_card(NewStoredCard::new("amara", "tok_a", "amara@example.com")).await.unwrap();
    let card_b = db.insert_card(NewStoredCard::new("bode", "tok_b", "bode@example.com")).await.unwrap();
    let circle = db
        .insert_circle(NewSavingCircle::new("December pot", "amara", Kobo::from(100), Kobo::from(200), Frequency::Weekly))
        .await
        .unwrap();
    let before = circle.next_contribution_date;
    db.add_circle_member(NewCircleMember::new(circle.id, "amara").with_card(card_a.id)).await.unwrap();
    db.add_circle_member(NewCircleMember::new(circle.id, "bode").with_card(card_b.id)).await.unwrap();

    let api = RecurringChargeApi::new(db.clone(), ScriptedCharger::always_succeed(), EventProducers::default());
    let summary = api.sweep_circles(Utc::now()).await;
    assert_eq!(summary.charged, 2);

    let circle = db.fetch_circle(circle.id).await.unwrap().unwrap();
    assert_eq!(circle.total_contributed, Kobo::from(200));
    assert!((circle.progress - 100.0).abs() < f64::EPSILON);
    assert_eq!(circle.status, CircleStatus::Completed);
    assert!(circle.next_contribution_date > before, "the circle schedule advances once per sweep");
}

#[tokio::test]
async fn circuit_broken_member_is_skipped_but_others_charge() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let card_a = db.insert_card(NewStoredCard::new("chidi", "tok_c", "chidi@example.com")).await.unwrap();
    let card_b = db.insert_card(NewStoredCard::new("dada", "tok_d", "dada@example.com")).await.unwrap();
    let circle = db
        .insert_circle(NewSavingCircle::new("Land fund", "chidi", Kobo::from(100), Kobo::from(100_000), Frequency::Daily))
        .await
        .unwrap();
    let skipped = db.add_circle_member(NewCircleMember::new(circle.id, "chidi").with_card(card_a.id)).await.unwrap();
    let charged = db.add_circle_member(NewCircleMember::new(circle.id, "dada").with_card(card_b.id)).await.unwrap();
    for _ in 0..3 {
        db.record_member_failure(skipped.id).await.unwrap();
    }

    let charger = ScriptedCharger::always_succeed();
    let api = RecurringChargeApi::new(db.clone(), charger.clone(), EventProducers::default());
    let summary = api.sweep_circles(Utc::now()).await;
    assert_eq!(summary.skipped_circuit_broken, 1);
    assert_eq!(summary.charged, 1);
    assert_eq!(charger.call_count(), 1);

    let skipped = db.fetch_member(skipped.id).await.unwrap().unwrap();
    assert_eq!(skipped.total_contributed, Kobo::from(0));
    let charged = db.fetch_member(charged.id).await.unwrap().unwrap();
    assert_eq!(charged.total_contributed, Kobo::from(100));
    assert_eq!(charged.failures, 0);
}
