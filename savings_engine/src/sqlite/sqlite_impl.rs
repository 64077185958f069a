//! `SqliteDatabase` is a concrete implementation of a savings-gateway ledger store.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`SavingsLedger`] trait. Every
//! balance-touching operation composes the low-level table functions inside one `pool.begin()` transaction,
//! so a ledger row and its balance change are committed (or rolled back) together.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{cards, circles, contributions, failed_transactions, new_pool, transactions, wallets};
use crate::{
    db_types::{
        AccountNumber,
        CircleMember,
        Contribution,
        FailedTransaction,
        InwardTransfer,
        Kobo,
        LedgerTransaction,
        NewCircleMember,
        NewContribution,
        NewFailedTransaction,
        NewLedgerTransaction,
        NewSavingCircle,
        NewStoredCard,
        NewWallet,
        SavingCircle,
        StoredCard,
        TransferDirection,
        TransferStatus,
        TxReference,
        Wallet,
        WalletStatus,
    },
    traits::{ChargeReceipt, LedgerError, SavingsLedger},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SavingsLedger for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_wallet(&self, wallet: NewWallet) -> Result<Wallet, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::insert_wallet(wallet, &mut conn).await?;
        debug!("🗃️ Wallet #{} created for account {}", wallet.id, wallet.account_number);
        Ok(wallet)
    }

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallet(wallet_id, &mut conn).await
    }

    async fn fetch_wallet_by_account(&self, account: &AccountNumber) -> Result<Option<Wallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallet_by_account(account, &mut conn).await
    }

    async fn set_wallet_status(&self, wallet_id: i64, status: WalletStatus) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallets::set_status(wallet_id, status, &mut conn).await
    }

    /// The reference-uniqueness check and the balance update are a single transactional write. A duplicate
    /// delivery fails on the UNIQUE index before any balance is touched.
    async fn credit_wallet_for_transfer(
        &self,
        transfer: &InwardTransfer,
    ) -> Result<(LedgerTransaction, Wallet), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::fetch_wallet_by_account(&transfer.account_number, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(transfer.account_number.clone()))?;
        let mut row = NewLedgerTransaction::new(transfer.reference.clone(), TransferDirection::Inward, transfer.amount)
            .for_wallet(wallet.id)
            .with_status(TransferStatus::Successful);
        if let Some(contribution_id) = wallet.contribution_id {
            row = row.for_contribution(contribution_id);
        }
        let ledger_row = transactions::insert_inward(
            row,
            transfer.originator_account_number.clone(),
            transfer.originator_account_name.clone(),
            transfer.originator_bank.clone(),
            transfer.session_id.clone(),
            &mut tx,
        )
        .await?;
        let wallet = wallets::credit_for_inward(wallet.id, transfer.amount, transfer.timestamp, &mut tx).await?;
        if let Some(contribution_id) = wallet.contribution_id {
            contributions::credit_balance(contribution_id, transfer.amount, &mut tx).await?;
            trace!("🗃️ Transfer {} propagated into contribution #{contribution_id}", transfer.reference);
        }
        tx.commit().await?;
        debug!("🗃️ Transfer {} credited {} to wallet #{}", transfer.reference, transfer.amount, wallet.id);
        Ok((ledger_row, wallet))
    }

    async fn begin_withdrawal(&self, tx: NewLedgerTransaction) -> Result<LedgerTransaction, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::idempotent_insert(tx, &mut conn).await?;
        debug!("🗃️ Outward transfer {} recorded as pending", row.reference);
        Ok(row)
    }

    async fn settle_withdrawal(
        &self,
        reference: &TxReference,
        deducted: Kobo,
    ) -> Result<(LedgerTransaction, Wallet), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let row = transactions::settle(reference, deducted, &mut tx).await?;
        let wallet_id = row.wallet_id.ok_or_else(|| {
            LedgerError::TransactionStatusUpdateError(format!("Outward transfer {reference} has no wallet"))
        })?;
        let wallet = match wallets::debit_for_outward(wallet_id, deducted, Utc::now(), &mut tx).await? {
            Some(w) => w,
            None => {
                let wallet = wallets::fetch_wallet(wallet_id, &mut tx)
                    .await?
                    .ok_or(LedgerError::WalletIdNotFound(wallet_id))?;
                // roll back the status update; the transfer stays pending for manual remediation
                return Err(LedgerError::InsufficientFunds { available: wallet.balance, requested: deducted });
            },
        };
        tx.commit().await?;
        debug!("🗃️ Outward transfer {reference} settled. {deducted} deducted from wallet #{wallet_id}");
        Ok((row, wallet))
    }

    async fn fail_withdrawal(&self, reference: &TxReference) -> Result<LedgerTransaction, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::mark_failed(reference, &mut conn).await?;
        debug!("🗃️ Outward transfer {reference} marked as failed");
        Ok(row)
    }

    async fn fetch_transaction_by_reference(
        &self,
        reference: &TxReference,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_by_reference(reference, &mut conn).await
    }

    async fn fetch_transactions_for_wallet(&self, wallet_id: i64) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_for_wallet(wallet_id, &mut conn).await
    }

    async fn insert_contribution(&self, contribution: NewContribution) -> Result<Contribution, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let plan = contributions::insert(contribution, &mut conn).await?;
        debug!("🗃️ Contribution #{} ({}) created for {}", plan.id, plan.name, plan.user_id);
        Ok(plan)
    }

    async fn fetch_contribution(&self, contribution_id: i64) -> Result<Option<Contribution>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        contributions::fetch(contribution_id, &mut conn).await
    }

    async fn due_contributions(&self, now: DateTime<Utc>) -> Result<Vec<Contribution>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        contributions::due(now, &mut conn).await
    }

    async fn apply_contribution_charge(
        &self,
        contribution_id: i64,
        receipt: &ChargeReceipt,
        now: DateTime<Utc>,
        next_due: DateTime<Utc>,
    ) -> Result<Contribution, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let row = NewLedgerTransaction::new(receipt.reference.clone(), TransferDirection::Inward, receipt.amount)
            .for_contribution(contribution_id)
            .with_memo("Scheduled contribution charge")
            .with_status(TransferStatus::Successful);
        transactions::idempotent_insert(row, &mut tx).await?;
        let plan = contributions::apply_charge(contribution_id, receipt.amount, now, next_due, &mut tx).await?;
        tx.commit().await?;
        Ok(plan)
    }

    async fn fetch_circle(&self, circle_id: i64) -> Result<Option<SavingCircle>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::fetch(circle_id, &mut conn).await
    }

    async fn due_circles(&self, now: DateTime<Utc>) -> Result<Vec<SavingCircle>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::due(now, &mut conn).await
    }

    async fn members_of_circle(&self, circle_id: i64) -> Result<Vec<CircleMember>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::members_of(circle_id, &mut conn).await
    }

    async fn apply_circle_charge(
        &self,
        circle_id: i64,
        member_id: i64,
        receipt: &ChargeReceipt,
        _now: DateTime<Utc>,
    ) -> Result<SavingCircle, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let member = circles::fetch_member(member_id, &mut tx).await?.ok_or(LedgerError::MemberNotFound(member_id))?;
        let row = NewLedgerTransaction::new(receipt.reference.clone(), TransferDirection::Inward, receipt.amount)
            .for_circle(circle_id)
            .with_memo(format!("Circle deposit from {}", member.user_id))
            .with_status(TransferStatus::Successful);
        transactions::idempotent_insert(row, &mut tx).await?;
        let circle = circles::apply_member_charge(circle_id, member_id, receipt.amount, &mut tx).await?;
        tx.commit().await?;
        Ok(circle)
    }

    async fn advance_circle_schedule(&self, circle_id: i64, next_due: DateTime<Utc>) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::advance_schedule(circle_id, next_due, &mut conn).await
    }

    async fn record_member_failure(&self, member_id: i64) -> Result<i64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::record_member_failure(member_id, &mut conn).await
    }

    async fn reset_member_failures(&self, member_id: i64) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::reset_member_failures(member_id, &mut conn).await
    }

    async fn fetch_card(&self, card_id: i64) -> Result<Option<StoredCard>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        cards::fetch(card_id, &mut conn).await
    }

    async fn card_for_user(&self, user_id: &str) -> Result<Option<StoredCard>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        cards::for_user(user_id, &mut conn).await
    }

    async fn record_card_failure(&self, card_id: i64) -> Result<i64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        cards::record_failure(card_id, &mut conn).await
    }

    async fn reset_card_failures(&self, card_id: i64) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        cards::reset_failures(card_id, &mut conn).await
    }

    async fn insert_failed_transaction(&self, entry: NewFailedTransaction) -> Result<i64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let id = failed_transactions::insert(entry, &mut conn).await?;
        debug!("🗃️ Dead letter #{id} recorded");
        Ok(id)
    }

    async fn fetch_failed_transactions(&self, limit: i64) -> Result<Vec<FailedTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        failed_transactions::fetch(limit, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Provisioning helpers used by the server's admin surface and the test suites. These are not part of
    /// the [`SavingsLedger`] contract because the scheduler and reconciler never create plans themselves.
    pub async fn insert_circle(&self, circle: NewSavingCircle) -> Result<SavingCircle, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::insert_circle(circle, &mut conn).await
    }

    pub async fn add_circle_member(&self, member: NewCircleMember) -> Result<CircleMember, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::insert_member(member, &mut conn).await
    }

    pub async fn insert_card(&self, card: NewStoredCard) -> Result<StoredCard, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        cards::insert(card, &mut conn).await
    }

    pub async fn fetch_member(&self, member_id: i64) -> Result<Option<CircleMember>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        circles::fetch_member(member_id, &mut conn).await
    }
}
