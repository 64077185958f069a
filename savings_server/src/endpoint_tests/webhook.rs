use actix_web::{test, web, App};
use csg_common::{Kobo, Secret};
use savings_engine::{
    db_types::{NewWallet, WalletStatus},
    events::EventProducers,
    ReconcilerApi,
    SavingsLedger,
    SqliteDatabase,
};

use crate::{
    data_objects::JsonResponse,
    endpoint_tests::helpers::prepare_test_db,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    vant_routes::VantWebhookRoute,
};

fn notification_body(reference: &str, amount: i64, account: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "reference": reference,
        "amount": amount,
        "account_number": account,
        "originator_account_number": "0123456789",
        "originator_account_name": "CHINWE OBI",
        "originator_bank": "First Bank",
        "status": status,
        "timestamp": "2024-06-01T09:15:00Z",
        "sessionId": "090405240601091500123456789012"
    })
}

#[actix_web::test]
async fn duplicate_webhook_delivery_credits_once() {
    let db = prepare_test_db().await;
    let wallet = db.insert_wallet(NewWallet::new("user-1", "9977001122".into(), "Vant MFB")).await.unwrap();
    db.set_wallet_status(wallet.id, WalletStatus::Active).await.unwrap();

    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(VantWebhookRoute::<SqliteDatabase>::new()),
    )
    .await;

    let body = notification_body("VNT-1", 5000, "9977001122", "successful");
    for _ in 0..2 {
        let req = test::TestRequest::post().uri("/webhook/inward_transfer").set_json(&body).to_request();
        let resp: JsonResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.success, "webhook must answer success for both the first and the duplicate delivery");
    }

    let wallet = db.fetch_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(5000));
    assert_eq!(db.fetch_transactions_for_wallet(wallet.id).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn failed_rail_status_answers_200_but_does_not_credit() {
    let db = prepare_test_db().await;
    let wallet = db.insert_wallet(NewWallet::new("user-2", "1122334455".into(), "Vant MFB")).await.unwrap();

    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(VantWebhookRoute::<SqliteDatabase>::new()),
    )
    .await;

    let body = notification_body("VNT-2", 800, "1122334455", "failed");
    let req = test::TestRequest::post().uri("/webhook/inward_transfer").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "the rail must never be told to retry");

    let wallet = db.fetch_wallet(wallet.id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, Kobo::from(0));
    assert_eq!(db.fetch_failed_transactions(10).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn webhook_rejects_bad_signatures() {
    let db = prepare_test_db().await;
    let api = ReconcilerApi::new(db.clone(), EventProducers::default());
    let secret = "webhook-secret";
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/vant")
                .wrap(HmacMiddlewareFactory::new("x-vant-signature", Secret::new(secret.to_string()), true))
                .service(VantWebhookRoute::<SqliteDatabase>::new()),
        ),
    )
    .await;

    let body = notification_body("VNT-3", 100, "5566778899", "successful");
    let raw = serde_json::to_vec(&body).unwrap();

    // no signature
    let req = test::TestRequest::post()
        .uri("/vant/webhook/inward_transfer")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(raw.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // wrong signature
    let req = test::TestRequest::post()
        .uri("/vant/webhook/inward_transfer")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("x-vant-signature", "bm90LXRoZS1zaWduYXR1cmU="))
        .set_payload(raw.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // correct signature passes through to the handler
    let signature = calculate_hmac(secret, &raw);
    let req = test::TestRequest::post()
        .uri("/vant/webhook/inward_transfer")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("x-vant-signature", signature))
        .set_payload(raw)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}
