use actix_web::{test, web, App};
use csg_common::Kobo;
use savings_engine::{
    db_types::{InwardTransfer, NewWallet, WalletStatus},
    SavingsLedger,
    SqliteDatabase,
    WalletApi,
    WithdrawalApi,
};

use crate::{
    endpoint_tests::{helpers::prepare_test_db, mocks::MockRail},
    routes::{WalletRoute, WithdrawRoute},
};

async fn seeded_wallet(db: &SqliteDatabase, account: &str, balance: i64) {
    let wallet = db.insert_wallet(NewWallet::new("user-w", account.into(), "Vant MFB")).await.unwrap();
    db.set_wallet_status(wallet.id, WalletStatus::Active).await.unwrap();
    if balance > 0 {
        let seed = InwardTransfer::new(format!("seed-{account}").into(), Kobo::from(balance), account.into());
        db.credit_wallet_for_transfer(&seed).await.unwrap();
    }
}

#[actix_web::test]
async fn overdrawn_withdrawal_is_a_400_with_no_side_effects() {
    let db = prepare_test_db().await;
    seeded_wallet(&db, "2001", 1_000).await;

    let api = WithdrawalApi::new(db.clone(), MockRail::accepting());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(WithdrawRoute::<SqliteDatabase, MockRail>::new()),
    )
    .await;

    let body = serde_json::json!({
        "account_number": "2001",
        "amount": 50_000,
        "beneficiary_account": "0011223344",
        "bank_code": "058",
    });
    let req = test::TestRequest::post().uri("/withdraw").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert!(db.fetch_failed_transactions(10).await.unwrap().is_empty());
}

#[actix_web::test]
async fn unknown_wallet_is_a_404() {
    let db = prepare_test_db().await;
    let api = WithdrawalApi::new(db.clone(), MockRail::accepting());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(WithdrawRoute::<SqliteDatabase, MockRail>::new()),
    )
    .await;

    let body = serde_json::json!({
        "account_number": "no-such-wallet",
        "amount": 100,
        "beneficiary_account": "0011223344",
        "bank_code": "058",
    });
    let req = test::TestRequest::post().uri("/withdraw").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn accepted_withdrawal_returns_the_settled_row() {
    let db = prepare_test_db().await;
    seeded_wallet(&db, "2002", 10_000).await;

    let api = WithdrawalApi::new(db.clone(), MockRail::accepting());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(WithdrawRoute::<SqliteDatabase, MockRail>::new()),
    )
    .await;

    let body = serde_json::json!({
        "account_number": "2002",
        "amount": 2_500,
        "beneficiary_account": "0011223344",
        "bank_code": "058",
        "reference": "wd-endpoint-1",
    });
    let req = test::TestRequest::post().uri("/withdraw").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let wallet = db.fetch_wallet_by_account(&"2002".into()).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(7_500));
}

#[actix_web::test]
async fn wallet_snapshot_round_trips() {
    let db = prepare_test_db().await;
    seeded_wallet(&db, "2003", 4_200).await;

    let api = WalletApi::new(db.clone());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(WalletRoute::<SqliteDatabase>::new()),
    )
    .await;

    let req = test::TestRequest::get().uri("/wallet/2003").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["account_number"], "2003");
    assert_eq!(body["balance"], 4_200);
    assert_eq!(body["status"], "Active");
}
