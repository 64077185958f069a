use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt, TryFutureExt};
use log::{info, warn};
use savings_engine::{
    events::{EventHandlers, EventProducers},
    run_migrations,
    ReconcilerApi,
    SqliteDatabase,
    WalletApi,
    WithdrawalApi,
};
use vant_tools::{ChargeApi, TokenCache, VantApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::vant::{PaystackCharger, VantRail},
    middleware::HmacMiddlewareFactory,
    notify::notification_hooks,
    routes::{
        health,
        FailedTransactionsRoute,
        ResetCardFailuresRoute,
        ResetMemberFailuresRoute,
        WalletHistoryRoute,
        WalletRoute,
        WithdrawRoute,
    },
    vant_routes::VantWebhookRoute,
    worker::start_recurring_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    run_migrations(db.pool()).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let handlers = EventHandlers::new(32, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let vant_api = VantApi::new(config.vant_config.clone(), Arc::new(TokenCache::new()))
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let charge_api =
        ChargeApi::new(config.charge_config.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let charger = PaystackCharger::new(charge_api);
    let _worker = start_recurring_worker(
        db.clone(),
        charger,
        producers.clone(),
        config.sweep_interval,
        config.charge_timeout,
    );

    let rail = VantRail::new(vant_api);
    let srv = create_server_instance(config, db, rail, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    rail: VantRail,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let bind_host = config.host.clone();
    let bind_port = config.port;
    let srv = HttpServer::new(move || {
        let wallet_api = WalletApi::new(db.clone());
        let reconciler_api = ReconcilerApi::new(db.clone(), producers.clone());
        let withdrawal_api = WithdrawalApi::new(db.clone(), rail.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("csg::access_log"))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(reconciler_api))
            .app_data(web::Data::new(withdrawal_api));
        let api_scope = web::scope("/api")
            .service(WalletRoute::<SqliteDatabase>::new())
            .service(WalletHistoryRoute::<SqliteDatabase>::new())
            .service(FailedTransactionsRoute::<SqliteDatabase>::new())
            .service(ResetCardFailuresRoute::<SqliteDatabase>::new())
            .service(ResetMemberFailuresRoute::<SqliteDatabase>::new())
            .service(WithdrawRoute::<SqliteDatabase, VantRail>::new());
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook.whitelist.clone();
        let vant_scope = web::scope("/vant")
            .wrap(HmacMiddlewareFactory::new(
                &config.webhook.hmac_header,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .wrap_fn(move |req, srv| {
                // Collect peer IP from x-forwarded-for, or forwarded headers _if_ `use_nnn` has been set to
                // true in the configuration. Otherwise, use the peer address from the connection info.
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                let whitelisted = match (peer_ip, &whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("Rail webhook from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("No IP address found in rail webhook request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req).map_ok(|res| res.map_into_boxed_body()).boxed_local()
                } else {
                    ok(req
                        .error_response(ServerError::Rejected("Source address is not whitelisted.".to_string()))
                        .map_into_boxed_body())
                    .boxed_local()
                }
            })
            .service(VantWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(vant_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_host.as_str(), bind_port))?
    .run();
    Ok(srv)
}
