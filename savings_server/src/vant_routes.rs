//----------------------------------------------   Rail webhooks  ----------------------------------------------
use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, trace, warn};
use savings_engine::{ReconcileOutcome, ReconcilerApi, SavingsLedger};
use vant_tools::data_objects::InwardTransferNotification;

use crate::{data_objects::JsonResponse, integrations::vant::inward_transfer_from_notification, route};

route!(vant_webhook => Post "/webhook/inward_transfer" impl SavingsLedger);
/// Receives the rail's "funds arrived" notification and applies it to the ledger exactly once.
///
/// Webhook responses must always be in the 200 range, otherwise the rail will keep retrying a delivery
/// that can never succeed. Terminal failures are dead-lettered by the reconciler instead.
pub async fn vant_webhook<B: SavingsLedger>(
    req: HttpRequest,
    body: web::Json<InwardTransferNotification>,
    api: web::Data<ReconcilerApi<B>>,
) -> HttpResponse {
    trace!("🏦️ Received webhook request: {}", req.uri());
    let notification = body.into_inner();
    let reference = notification.reference.clone();
    let transfer = inward_transfer_from_notification(notification);
    let result = match api.process_inward_transfer(transfer).await {
        Ok(outcome @ ReconcileOutcome::Credited { .. }) => {
            info!("🏦️ Transfer {reference} processed successfully. {outcome}");
            JsonResponse::success(outcome)
        },
        Ok(outcome @ ReconcileOutcome::AlreadyProcessed) => {
            info!("🏦️ Transfer {reference} was a duplicate delivery. Nothing done.");
            JsonResponse::success(outcome)
        },
        Ok(outcome) => {
            warn!("🏦️ Transfer {reference} was not applied: {outcome}");
            JsonResponse::failure(outcome)
        },
        Err(e) => {
            warn!("🏦️ Unexpected error while handling transfer {reference}. {e}");
            JsonResponse::failure("Unexpected error handling transfer notification.")
        },
    };
    HttpResponse::Ok().json(result)
}
