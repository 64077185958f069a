//! The dead-letter sink.
//!
//! Everything that cannot be completed lands here with enough context to retry or investigate manually.
//! The sink is best-effort: a persistence failure inside it is caught and only logged, so it can never
//! throw upward and mask the error that brought the caller here in the first place.
use log::*;

use crate::{db_types::NewFailedTransaction, traits::SavingsLedger};

pub async fn dead_letter<B: SavingsLedger>(db: &B, entry: NewFailedTransaction) {
    let kind = entry.kind;
    let reference = entry.reference.clone().unwrap_or_else(|| "<none>".to_string());
    match db.insert_failed_transaction(entry).await {
        Ok(id) => {
            info!("📪️ {kind} failure for reference {reference} dead-lettered as #{id}");
        },
        Err(e) => {
            error!("📪️ Could not dead-letter the {kind} failure for reference {reference}: {e}");
        },
    }
}
