//! Outward transfers: pre-flight checks write nothing, and the balance only moves when the rail has
//! accepted the transfer.
use csg_common::Kobo;
use savings_engine::{
    db_types::{NewWallet, TransferStatus, WalletStatus},
    LedgerError,
    SavingsLedger,
    WithdrawalApi,
    WithdrawalError,
    WithdrawalRequest,
};

mod support;

use support::{
    prepare_env::{prepare_test_env, random_db_path},
    providers::ScriptedRail,
};

async fn active_wallet(db: &savings_engine::SqliteDatabase, account: &str, balance: Kobo) -> i64 {
    let wallet = db.insert_wallet(NewWallet::new("user-w", account.into(), "Vant MFB")).await.unwrap();
    db.set_wallet_status(wallet.id, WalletStatus::Active).await.unwrap();
    if balance.is_positive() {
        use savings_engine::db_types::InwardTransfer;
        let seed = InwardTransfer::new(format!("seed-{account}").into(), balance, account.into());
        db.credit_wallet_for_transfer(&seed).await.unwrap();
    }
    wallet.id
}

fn request(account: &str, amount: Kobo, reference: &str) -> WithdrawalRequest {
    WithdrawalRequest {
        account_number: account.into(),
        amount,
        beneficiary_account: "0011223344".to_string(),
        beneficiary_bank_code: "058".to_string(),
        reference: reference.to_string().into(),
        narration: Some("rent".to_string()),
    }
}

#[tokio::test]
async fn insufficient_funds_is_rejected_before_the_rail_is_called() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet_id = active_wallet(&db, "W1", Kobo::from(1_000)).await;

    let rail = ScriptedRail::default();
    let api = WithdrawalApi::new(db.clone(), rail.clone());
    let err = api.transfer_to_bank(request("W1", Kobo::from(5_000), "wd-1")).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::Ledger(LedgerError::InsufficientFunds { .. })));

    assert_eq!(rail.transfer_call_count(), 0, "the rail must not see a doomed transfer");
    assert!(db.fetch_transactions_for_wallet(wallet_id).await.unwrap().iter().all(|t| t.reference.as_str() != "wd-1"));
    assert!(db.fetch_failed_transactions(10).await.unwrap().is_empty(), "a precondition failure is not dead-lettered");
}

#[tokio::test]
async fn non_positive_amounts_and_inactive_wallets_are_rejected() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    active_wallet(&db, "W2", Kobo::from(10_000)).await;
    let locked = db.insert_wallet(NewWallet::new("user-l", "W2L".into(), "Vant MFB")).await.unwrap();
    db.set_wallet_status(locked.id, WalletStatus::Locked).await.unwrap();

    let api = WithdrawalApi::new(db.clone(), ScriptedRail::default());
    let err = api.transfer_to_bank(request("W2", Kobo::from(0), "wd-zero")).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::Ledger(LedgerError::InvalidAmount(_))));

    let err = api.transfer_to_bank(request("W2L", Kobo::from(100), "wd-locked")).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::Ledger(LedgerError::WalletNotActive { .. })));

    let err = api.transfer_to_bank(request("NOPE", Kobo::from(100), "wd-ghost")).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::Ledger(LedgerError::WalletNotFound(_))));
}

#[tokio::test]
async fn settled_withdrawal_deducts_amount_plus_fee_exactly_once() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet_id = active_wallet(&db, "W3", Kobo::from(10_000)).await;

    let api = WithdrawalApi::new(db.clone(), ScriptedRail::accepting_with_fee(Kobo::from(50)));
    let row = api.transfer_to_bank(request("W3", Kobo::from(4_000), "wd-3")).await.unwrap();
    assert_eq!(row.status, TransferStatus::Successful);
    assert_eq!(row.fee, Kobo::from(50), "the rail fee is recorded on the ledger row");

    let wallet = db.fetch_wallet(wallet_id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(10_000 - 4_000 - 50));
    assert_eq!(wallet.total_outward, Kobo::from(4_050));
    assert_eq!(wallet.tx_count, 2);
}

#[tokio::test]
async fn rail_rejection_keeps_the_balance_and_dead_letters_the_attempt() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet_id = active_wallet(&db, "W4", Kobo::from(8_000)).await;

    let api = WithdrawalApi::new(db.clone(), ScriptedRail::rejecting());
    let err = api.transfer_to_bank(request("W4", Kobo::from(3_000), "wd-4")).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::RailRejected(_)));

    let wallet = db.fetch_wallet(wallet_id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(8_000), "no deduction without a confirmed rail acceptance");
    let row = db.fetch_transaction_by_reference(&"wd-4".to_string().into()).await.unwrap().unwrap();
    assert_eq!(row.status, TransferStatus::Failed, "the pending row stays auditable as failed");
    let dead = db.fetch_failed_transactions(10).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].reference.as_deref(), Some("wd-4"));
    assert_eq!(dead[0].wallet_id, Some(wallet_id));
}

#[tokio::test]
async fn rail_outage_behaves_like_a_rejection() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet_id = active_wallet(&db, "W5", Kobo::from(6_000)).await;

    let api = WithdrawalApi::new(db.clone(), ScriptedRail::unreachable());
    let err = api.transfer_to_bank(request("W5", Kobo::from(1_000), "wd-5")).await.unwrap_err();
    assert!(matches!(err, WithdrawalError::Rail(_)));

    let wallet = db.fetch_wallet(wallet_id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(6_000));
    let row = db.fetch_transaction_by_reference(&"wd-5".to_string().into()).await.unwrap().unwrap();
    assert_eq!(row.status, TransferStatus::Failed);
}

#[tokio::test]
async fn balance_is_conserved_over_a_mixed_flow() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let wallet_id = active_wallet(&db, "W6", Kobo::from(0)).await;

    use savings_engine::db_types::InwardTransfer;
    for (reference, amount) in [("in-1", 5_000), ("in-2", 2_500)] {
        let transfer = InwardTransfer::new(reference.to_string().into(), Kobo::from(amount), "W6".into());
        db.credit_wallet_for_transfer(&transfer).await.unwrap();
    }

    let api = WithdrawalApi::new(db.clone(), ScriptedRail::accepting_with_fee(Kobo::from(25)));
    api.transfer_to_bank(request("W6", Kobo::from(3_000), "out-1")).await.unwrap();
    // a rejected attempt in the middle must not move anything
    let rejecting = WithdrawalApi::new(db.clone(), ScriptedRail::rejecting());
    let _ = rejecting.transfer_to_bank(request("W6", Kobo::from(1_000), "out-2")).await.unwrap_err();
    api.transfer_to_bank(request("W6", Kobo::from(500), "out-3")).await.unwrap();

    let wallet = db.fetch_wallet(wallet_id).await.unwrap().unwrap();
    let expected = 5_000 + 2_500 - (3_000 + 25) - (500 + 25);
    assert_eq!(wallet.balance, Kobo::from(expected));
    assert_eq!(wallet.total_inward, Kobo::from(7_500));
    assert_eq!(wallet.total_outward, Kobo::from(3_550));
}
