use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{
        AccountNumber,
        CircleMember,
        Contribution,
        FailedTransaction,
        InwardTransfer,
        Kobo,
        LedgerTransaction,
        NewContribution,
        NewFailedTransaction,
        NewLedgerTransaction,
        NewWallet,
        SavingCircle,
        StoredCard,
        TxReference,
        Wallet,
        WalletStatus,
    },
    traits::ChargeReceipt,
};

/// This trait defines the highest level of behaviour for backends acting as the ledger store of the
/// savings gateway.
///
/// This behaviour includes:
/// * Resolving reserved wallets and applying inward credits exactly once per external reference.
/// * The two-phase outward-transfer flow (pending row first, settle or fail after the rail answers).
/// * Finding due contributions/circles and applying confirmed charges to them.
/// * The dead-letter log of transactions that could not be completed.
///
/// Mutating operations that touch a balance MUST pair the balance change with a ledger row inside a single
/// database transaction, so concurrent deliveries and sweeps cannot observe one without the other.
#[allow(async_fn_in_trait)]
pub trait SavingsLedger: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    //----------------------------------------- Wallets -----------------------------------------------

    async fn insert_wallet(&self, wallet: NewWallet) -> Result<Wallet, LedgerError>;

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError>;

    /// Resolves a reserved wallet by its rail-issued virtual account number.
    async fn fetch_wallet_by_account(&self, account: &AccountNumber) -> Result<Option<Wallet>, LedgerError>;

    async fn set_wallet_status(&self, wallet_id: i64, status: WalletStatus) -> Result<(), LedgerError>;

    /// Applies a successful inward transfer to the destination wallet, in a single atomic transaction:
    /// * a `Successful` inward ledger row is inserted, keyed by the transfer's reference;
    /// * the wallet balance, inward total, transaction counter and last-transaction timestamp are updated;
    /// * if the wallet is linked to a contribution, the amount is propagated into its balance and its
    ///   active category sub-balance.
    ///
    /// The reference's UNIQUE index makes the idempotency check and the write one unit: a duplicate
    /// delivery fails the insert and returns [`LedgerError::TransactionAlreadyExists`] with no side
    /// effects at all.
    async fn credit_wallet_for_transfer(
        &self,
        transfer: &InwardTransfer,
    ) -> Result<(LedgerTransaction, Wallet), LedgerError>;

    //----------------------------------------- Outward transfers -------------------------------------

    /// Records a `Pending` outward ledger row *before* the rail is called, so a crash mid-call is still
    /// auditable. No balance is touched here.
    async fn begin_withdrawal(&self, tx: NewLedgerTransaction) -> Result<LedgerTransaction, LedgerError>;

    /// Marks the pending withdrawal `Successful` and, in the same database transaction, deducts exactly
    /// `deducted` (amount plus rail fee) from the wallet and bumps the outward totals.
    ///
    /// The deduction is guarded by `balance >= deducted`; a concurrent spend that drained the wallet in
    /// the meantime surfaces as [`LedgerError::InsufficientFunds`] and leaves the row `Pending`.
    async fn settle_withdrawal(
        &self,
        reference: &TxReference,
        deducted: Kobo,
    ) -> Result<(LedgerTransaction, Wallet), LedgerError>;

    /// Marks the pending withdrawal `Failed`. The balance is never touched on this path.
    async fn fail_withdrawal(&self, reference: &TxReference) -> Result<LedgerTransaction, LedgerError>;

    async fn fetch_transaction_by_reference(
        &self,
        reference: &TxReference,
    ) -> Result<Option<LedgerTransaction>, LedgerError>;

    async fn fetch_transactions_for_wallet(&self, wallet_id: i64) -> Result<Vec<LedgerTransaction>, LedgerError>;

    //----------------------------------------- Contributions -----------------------------------------

    async fn insert_contribution(&self, contribution: NewContribution) -> Result<Contribution, LedgerError>;

    async fn fetch_contribution(&self, contribution_id: i64) -> Result<Option<Contribution>, LedgerError>;

    /// All contributions with `next_contribution_date <= now`, an open `start_date..=end_date` window and
    /// `Pending` status.
    async fn due_contributions(&self, now: DateTime<Utc>) -> Result<Vec<Contribution>, LedgerError>;

    /// Applies a confirmed charge to a contribution, in a single atomic transaction:
    /// * an inward ledger row for the charge reference;
    /// * balance and active-category sub-balance incremented together;
    /// * `last_contribution_date = now`, `next_contribution_date = next_due`;
    /// * the plan flips to `Completed` once `next_due` falls outside its window.
    async fn apply_contribution_charge(
        &self,
        contribution_id: i64,
        receipt: &ChargeReceipt,
        now: DateTime<Utc>,
        next_due: DateTime<Utc>,
    ) -> Result<Contribution, LedgerError>;

    //----------------------------------------- Saving circles ----------------------------------------

    async fn fetch_circle(&self, circle_id: i64) -> Result<Option<SavingCircle>, LedgerError>;

    /// All non-completed circles with `next_contribution_date <= now` and an open window.
    async fn due_circles(&self, now: DateTime<Utc>) -> Result<Vec<SavingCircle>, LedgerError>;

    async fn members_of_circle(&self, circle_id: i64) -> Result<Vec<CircleMember>, LedgerError>;

    /// Applies a confirmed member charge to a circle, in a single atomic transaction: ledger row, member
    /// total, circle total, recomputed progress, and the `Completed` transition at 100%. The member's
    /// failure counter resets on success.
    async fn apply_circle_charge(
        &self,
        circle_id: i64,
        member_id: i64,
        receipt: &ChargeReceipt,
        now: DateTime<Utc>,
    ) -> Result<SavingCircle, LedgerError>;

    /// Advances the circle's due date after a sweep has processed its members, whatever the per-member
    /// outcomes were.
    async fn advance_circle_schedule(&self, circle_id: i64, next_due: DateTime<Utc>) -> Result<(), LedgerError>;

    async fn record_member_failure(&self, member_id: i64) -> Result<i64, LedgerError>;

    async fn reset_member_failures(&self, member_id: i64) -> Result<(), LedgerError>;

    //----------------------------------------- Stored cards ------------------------------------------

    async fn fetch_card(&self, card_id: i64) -> Result<Option<StoredCard>, LedgerError>;

    /// The user's preferred card, falling back to the first card on file.
    async fn card_for_user(&self, user_id: &str) -> Result<Option<StoredCard>, LedgerError>;

    /// Increments the consecutive-failure counter and returns the new count. Dates are never advanced on
    /// this path.
    async fn record_card_failure(&self, card_id: i64) -> Result<i64, LedgerError>;

    /// Manual circuit-breaker reset.
    async fn reset_card_failures(&self, card_id: i64) -> Result<(), LedgerError>;

    //----------------------------------------- Dead letters ------------------------------------------

    /// Appends a dead-letter record. This is the only way a failed operation is persisted; the record is
    /// never mutated afterwards.
    async fn insert_failed_transaction(&self, entry: NewFailedTransaction) -> Result<i64, LedgerError>;

    async fn fetch_failed_transactions(&self, limit: i64) -> Result<Vec<FailedTransaction>, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert transaction, since it already exists with reference {0}")]
    TransactionAlreadyExists(TxReference),
    #[error("No wallet is mapped to account number {0}")]
    WalletNotFound(AccountNumber),
    #[error("The requested wallet id {0} does not exist")]
    WalletIdNotFound(i64),
    #[error("The requested contribution {0} does not exist")]
    ContributionNotFound(i64),
    #[error("The requested saving circle {0} does not exist")]
    CircleNotFound(i64),
    #[error("The requested circle member {0} does not exist")]
    MemberNotFound(i64),
    #[error("The requested card {0} does not exist")]
    CardNotFound(i64),
    #[error("The requested transaction does not exist for reference {0}")]
    TransactionNotFound(TxReference),
    #[error("Insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: Kobo, requested: Kobo },
    #[error("Wallet {wallet_id} is not active (status: {status})")]
    WalletNotActive { wallet_id: i64, status: WalletStatus },
    #[error("Unrecognised contribution frequency: {0}")]
    UnknownFrequency(String),
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Kobo),
    #[error("Illegal transaction status change. {0}")]
    TransactionStatusUpdateError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
