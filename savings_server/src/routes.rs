//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls, rail calls)
//! must therefore be expressed as futures or asynchronous functions, so the worker can interleave other requests while
//! it waits.
use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use csg_common::Kobo;
use log::*;
use savings_engine::{
    db_types::AccountNumber,
    traits::BankRail,
    SavingsLedger,
    WalletApi,
    WithdrawalApi,
    WithdrawalRequest,
};

use crate::{
    data_objects::{JsonResponse, WithdrawalParams},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Wallets  ----------------------------------------------------
route!(wallet => Get "/wallet/{account}" impl SavingsLedger);
/// Snapshot of a reserved wallet, resolved by its rail-issued account number.
pub async fn wallet<B: SavingsLedger>(
    path: web::Path<String>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let account = AccountNumber::from(path.into_inner());
    trace!("💻️ GET wallet for account {account}");
    let wallet = api
        .wallet_by_account(&account)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No wallet for account {account}")))?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(wallet_history => Get "/wallet/{account}/transactions" impl SavingsLedger);
/// Full ledger history for a wallet, newest first.
pub async fn wallet_history<B: SavingsLedger>(
    path: web::Path<String>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let account = AccountNumber::from(path.into_inner());
    trace!("💻️ GET transaction history for account {account}");
    let history = api.history_for_account(&account).await?;
    Ok(HttpResponse::Ok().json(history))
}

//----------------------------------------------   Remediation  ------------------------------------------------
route!(failed_transactions => Get "/failed_transactions" impl SavingsLedger);
/// The dead-letter list, for manual inspection and retry.
pub async fn failed_transactions<B: SavingsLedger>(
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET failed transactions");
    let dead = api.failed_transactions(100).await?;
    Ok(HttpResponse::Ok().json(dead))
}

route!(reset_card_failures => Post "/cards/{card_id}/reset_failures" impl SavingsLedger);
/// Re-arms a payment instrument that tripped the scheduler's circuit breaker.
pub async fn reset_card_failures<B: SavingsLedger>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let card_id = path.into_inner();
    debug!("💻️ POST reset failure counter for card #{card_id}");
    api.reset_card_failures(card_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Failure counter for card #{card_id} reset."))))
}

route!(reset_member_failures => Post "/circles/members/{member_id}/reset_failures" impl SavingsLedger);
/// Re-admits a saving-circle member that the sweep has been skipping.
pub async fn reset_member_failures<B: SavingsLedger>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let member_id = path.into_inner();
    debug!("💻️ POST reset failure counter for circle member #{member_id}");
    api.reset_member_failures(member_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Failure counter for member #{member_id} reset."))))
}

//----------------------------------------------   Withdrawals  ------------------------------------------------
route!(withdraw => Post "/withdraw" impl SavingsLedger, BankRail);
/// Moves funds out of a reserved wallet to an external bank account.
///
/// Validation failures (bad amount, unknown wallet, insufficient funds) surface as 4xx with no side
/// effects; a rail failure after the pre-flight checks surfaces as 502 and leaves a failed ledger row plus
/// a dead letter for remediation.
pub async fn withdraw<B, R>(
    body: web::Json<WithdrawalParams>,
    api: web::Data<WithdrawalApi<B, R>>,
) -> Result<HttpResponse, ServerError>
where
    B: SavingsLedger,
    R: BankRail,
{
    let params = body.into_inner();
    debug!("💻️ POST withdraw {} kobo from {}", params.amount, params.account_number);
    let reference = params
        .reference
        .clone()
        .unwrap_or_else(|| format!("wd-{}-{}", params.account_number, Utc::now().timestamp_millis()));
    let request = WithdrawalRequest {
        account_number: params.account_number.into(),
        amount: Kobo::from(params.amount),
        beneficiary_account: params.beneficiary_account,
        beneficiary_bank_code: params.bank_code,
        reference: reference.into(),
        narration: params.narration,
    };
    let row = api.transfer_to_bank(request).await?;
    Ok(HttpResponse::Ok().json(row))
}
