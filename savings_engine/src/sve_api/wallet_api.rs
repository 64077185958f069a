use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{AccountNumber, FailedTransaction, LedgerTransaction, Wallet},
    traits::{LedgerError, SavingsLedger},
};

/// Read-side queries over the ledger, plus the manual remediation actions (dead-letter inspection and
/// circuit-breaker resets).
pub struct WalletApi<B> {
    db: B,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B>
where B: SavingsLedger
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn wallet_by_account(&self, account: &AccountNumber) -> Result<Option<Wallet>, LedgerError> {
        self.db.fetch_wallet_by_account(account).await
    }

    pub async fn history_for_account(&self, account: &AccountNumber) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let wallet = self
            .db
            .fetch_wallet_by_account(account)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(account.clone()))?;
        self.db.fetch_transactions_for_wallet(wallet.id).await
    }

    pub async fn failed_transactions(&self, limit: i64) -> Result<Vec<FailedTransaction>, LedgerError> {
        self.db.fetch_failed_transactions(limit).await
    }

    /// Manually re-arms an instrument that tripped the scheduler's circuit breaker.
    pub async fn reset_card_failures(&self, card_id: i64) -> Result<(), LedgerError> {
        self.db.reset_card_failures(card_id).await?;
        info!("🧑️ Failure counter for card #{card_id} has been reset");
        Ok(())
    }

    /// Manually re-admits a circle member that the sweep has been skipping.
    pub async fn reset_member_failures(&self, member_id: i64) -> Result<(), LedgerError> {
        self.db.reset_member_failures(member_id).await?;
        info!("🧑️ Failure counter for circle member #{member_id} has been reset");
        Ok(())
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
