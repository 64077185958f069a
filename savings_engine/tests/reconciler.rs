//! Inward-transfer reconciliation: the same notification must never credit a wallet twice, and nothing
//! that goes wrong may leave the balance half-updated.
use csg_common::Kobo;
use savings_engine::{
    db_types::{
        ContributionStatus,
        FailureKind,
        Frequency,
        InwardTransfer,
        NewContribution,
        NewWallet,
        TransferStatus,
        WalletStatus,
    },
    events::EventProducers,
    ReconcileOutcome,
    ReconcilerApi,
    SavingsLedger,
};

mod support;

use support::prepare_env::{prepare_test_env, random_db_path};

#[tokio::test]
async fn webhook_replay_is_idempotent() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet = db.insert_wallet(NewWallet::new("user-1", "ACC1".into(), "Vant MFB")).await.unwrap();
    db.set_wallet_status(wallet.id, WalletStatus::Active).await.unwrap();

    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let transfer = InwardTransfer::new("R1".to_string().into(), Kobo::from(5000), "ACC1".into())
        .with_originator("0123456789", "CHINWE OBI", "First Bank");

    let outcome = api.process_inward_transfer(transfer.clone()).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Credited { .. }));

    // same notification delivered again
    let outcome = api.process_inward_transfer(transfer).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::AlreadyProcessed));

    let wallet = db.fetch_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(5000), "balance must be credited exactly once");
    assert_eq!(wallet.total_inward, Kobo::from(5000));
    assert_eq!(wallet.tx_count, 1);

    let history = db.fetch_transactions_for_wallet(wallet.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reference.as_str(), "R1");
    assert_eq!(history[0].status, TransferStatus::Successful);
    assert!(wallet.last_transaction_at.is_some());
}

#[tokio::test]
async fn unsuccessful_status_is_dead_lettered_without_credit() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet = db.insert_wallet(NewWallet::new("user-2", "ACC2".into(), "Vant MFB")).await.unwrap();

    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let transfer =
        InwardTransfer::new("R2".to_string().into(), Kobo::from(7000), "ACC2".into()).with_status("reversed");
    let outcome = api.process_inward_transfer(transfer).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::NotSuccessful));

    let wallet = db.fetch_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(0));
    assert!(db.fetch_transactions_for_wallet(wallet.id).await.unwrap().is_empty());

    let dead = db.fetch_failed_transactions(10).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].kind, FailureKind::Deposit);
    assert_eq!(dead[0].reference.as_deref(), Some("R2"));
    assert!(dead[0].payload.0.get("amount").is_some(), "dead letter must carry the raw payload");
}

#[tokio::test]
async fn unknown_destination_account_is_skipped() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let api = ReconcilerApi::new(db.clone(), EventProducers::default());

    let transfer = InwardTransfer::new("R3".to_string().into(), Kobo::from(100), "NO-SUCH-ACCOUNT".into());
    let outcome = api.process_inward_transfer(transfer).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::WalletNotFound));
    assert!(db.fetch_failed_transactions(10).await.unwrap().is_empty());
    assert!(db.fetch_transaction_by_reference(&"R3".to_string().into()).await.unwrap().is_none());
}

#[tokio::test]
async fn credit_propagates_into_linked_contribution() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let plan = db
        .insert_contribution(
            NewContribution::new("user-4", "House fund", Kobo::from(10_000), Frequency::Monthly)
                .with_category("Housing"),
        )
        .await
        .unwrap();
    let wallet = db
        .insert_wallet(NewWallet::new("user-4", "ACC4".into(), "Vant MFB").with_contribution(plan.id))
        .await
        .unwrap();
    db.set_wallet_status(wallet.id, WalletStatus::Active).await.unwrap();

    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let transfer = InwardTransfer::new("R4".to_string().into(), Kobo::from(2_500), "ACC4".into());
    api.process_inward_transfer(transfer).await.unwrap();

    let plan = db.fetch_contribution(plan.id).await.unwrap().unwrap();
    assert_eq!(plan.balance, Kobo::from(2_500));
    assert_eq!(plan.status, ContributionStatus::Pending);
    let categories = &plan.category_balances.0;
    assert_eq!(categories.get("Housing"), Some(&Kobo::from(2_500)));
    let total: Kobo = categories.values().copied().sum();
    assert_eq!(total, plan.balance, "balance must equal the sum of category balances");
}
