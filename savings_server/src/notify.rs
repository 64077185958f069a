//! Fire-and-forget notifications, wired onto the engine's event hooks.
//!
//! Money movement never waits for a notification: the reconciler and scheduler publish events, and the
//! handlers below call the [`NotificationSender`] seam from their own tasks. The default sender writes to
//! the log; a mail/SMS provider slots in behind the same trait.
use std::{future::Future, pin::Pin};

use log::*;
use savings_engine::{events::EventHooks, traits::NotificationSender};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSender for LogNotifier {
    async fn send(&self, subject: &str, recipients: &[String], body: &str) {
        info!("📧️ [{}] {subject}: {body}", recipients.join(", "));
    }
}

/// The server's standard hook set: a note to the wallet owner on every credit and every scheduled charge.
pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_wallet_credited(|ev| {
        Box::pin(async move {
            let notifier = LogNotifier;
            let recipients = vec![ev.wallet.user_id.clone()];
            let body = format!(
                "Your wallet {} received {} (ref {}). New balance: {}.",
                ev.wallet.account_number, ev.transaction.amount, ev.transaction.reference, ev.wallet.balance
            );
            notifier.send("Deposit received", &recipients, &body).await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_contribution_charged(|ev| {
        Box::pin(async move {
            let notifier = LogNotifier;
            let recipients = vec![ev.user_id.clone()];
            let body = format!("Your scheduled contribution of {} was collected (ref {}).", ev.amount, ev.reference);
            notifier.send("Contribution collected", &recipients, &body).await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
