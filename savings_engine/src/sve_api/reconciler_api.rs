use std::fmt::{Debug, Display};

use log::*;

use crate::{
    db_types::{FailureKind, InwardTransfer, LedgerTransaction, NewFailedTransaction, Wallet},
    events::{EventProducers, WalletCreditedEvent},
    sve_api::failure_log::dead_letter,
    traits::{LedgerError, SavingsLedger},
};

/// `ReconcilerApi` applies asynchronous "funds arrived" notifications from the bank rail to the correct
/// wallet exactly once.
///
/// The caller is an async notifier that may not retry on error, so every terminal failure becomes a
/// durable [`FailedTransaction`](crate::db_types::FailedTransaction) record rather than an error response.
pub struct ReconcilerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B> ReconcilerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The wallet was credited and the ledger row written.
    Credited { wallet: Box<Wallet>, transaction: Box<LedgerTransaction> },
    /// A transaction with this reference already exists. Duplicate delivery is a success-no-op.
    AlreadyProcessed,
    /// No wallet is mapped to the destination account number. Logged; nothing written.
    WalletNotFound,
    /// The rail reported a non-successful status. Dead-lettered; no balance was touched.
    NotSuccessful,
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileOutcome::Credited { wallet, transaction } => {
                write!(f, "Credited {} to wallet #{}", transaction.amount, wallet.id)
            },
            ReconcileOutcome::AlreadyProcessed => write!(f, "Transfer was already processed"),
            ReconcileOutcome::WalletNotFound => write!(f, "No wallet for destination account"),
            ReconcileOutcome::NotSuccessful => write!(f, "Transfer did not succeed at the rail"),
        }
    }
}

impl<B> ReconcilerApi<B>
where B: SavingsLedger
{
    /// Applies one inward-transfer notification.
    ///
    /// Every terminal failure is converted into a dead letter before the error is surfaced, so the
    /// webhook receiver can keep answering 200 while operators still see what went wrong.
    pub async fn process_inward_transfer(&self, transfer: InwardTransfer) -> Result<ReconcileOutcome, LedgerError> {
        let reference = transfer.reference.clone();
        trace!("🏦️ Processing inward transfer {reference}");
        match self.apply(&transfer).await {
            Ok(outcome) => Ok(outcome),
            Err(LedgerError::TransactionAlreadyExists(_)) => {
                info!("🏦️ Transfer {reference} has already been processed. Nothing to do.");
                Ok(ReconcileOutcome::AlreadyProcessed)
            },
            Err(LedgerError::WalletNotFound(account)) => {
                warn!("🏦️ Transfer {reference} arrived for unknown account {account}. Skipping this event.");
                Ok(ReconcileOutcome::WalletNotFound)
            },
            Err(e) => {
                error!("🏦️ Could not process inward transfer {reference}. {e}");
                let payload = serde_json::to_value(&transfer).unwrap_or(serde_json::Value::Null);
                let entry = NewFailedTransaction::new(FailureKind::Deposit, e.to_string())
                    .with_reference(reference.as_str())
                    .with_payload(payload);
                dead_letter(&self.db, entry).await;
                Err(e)
            },
        }
    }

    async fn apply(&self, transfer: &InwardTransfer) -> Result<ReconcileOutcome, LedgerError> {
        if !transfer.is_successful() {
            info!(
                "🏦️ Transfer {} has status '{}'. No balance will be applied.",
                transfer.reference, transfer.status
            );
            let payload = serde_json::to_value(transfer).unwrap_or(serde_json::Value::Null);
            let entry =
                NewFailedTransaction::new(FailureKind::Deposit, format!("Rail status was '{}'", transfer.status))
                    .with_reference(transfer.reference.as_str())
                    .with_payload(payload);
            dead_letter(&self.db, entry).await;
            return Ok(ReconcileOutcome::NotSuccessful);
        }
        let (transaction, wallet) = self.db.credit_wallet_for_transfer(transfer).await?;
        debug!("🏦️ Transfer {} complete. Wallet #{} now holds {}", transfer.reference, wallet.id, wallet.balance);
        self.call_wallet_credited_hook(&wallet, &transaction).await;
        Ok(ReconcileOutcome::Credited { wallet: Box::new(wallet), transaction: Box::new(transaction) })
    }

    async fn call_wallet_credited_hook(&self, wallet: &Wallet, transaction: &LedgerTransaction) {
        for emitter in &self.producers.wallet_credited_producer {
            trace!("🏦️ Notifying wallet-credited hook subscribers");
            let event = WalletCreditedEvent::new(wallet.clone(), transaction.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
