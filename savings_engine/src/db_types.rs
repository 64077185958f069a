use std::{collections::HashMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

pub use csg_common::Kobo;

/// Consecutive failures after which a payment instrument is skipped by the scheduler until manually reset.
pub const MAX_CONSECUTIVE_FAILURES: i64 = 3;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------    AccountNumber    ---------------------------------------------------------
/// A lightweight wrapper around the bank-rail virtual account number that identifies a reserved wallet.
#[derive(Clone, Debug, Type, PartialEq, Eq, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct AccountNumber(pub String);

impl Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for AccountNumber {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl AccountNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     TxReference     ---------------------------------------------------------
/// A provider-supplied reference identifying one external financial event. Uniqueness of the reference is
/// the idempotency boundary for the whole ledger.
#[derive(Clone, Debug, Type, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TxReference(pub String);

impl FromStr for TxReference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for TxReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TxReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl TxReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     WalletStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum WalletStatus {
    /// The reserved account has been requested from the rail but is not usable yet.
    Pending,
    /// The wallet can receive and send funds.
    Active,
    /// The wallet is locked (e.g. too many pin failures) and cannot send funds.
    Locked,
    /// The rail could not provision the reserved account.
    Failed,
}

impl Display for WalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletStatus::Pending => write!(f, "Pending"),
            WalletStatus::Active => write!(f, "Active"),
            WalletStatus::Locked => write!(f, "Locked"),
            WalletStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for WalletStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Active" => Ok(Self::Active),
            "Locked" => Ok(Self::Locked),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid wallet status: {s}"))),
        }
    }
}

//--------------------------------------        Wallet       ---------------------------------------------------------
/// A reserved wallet: a cash balance mapped 1:1 to a bank-rail virtual account number.
///
/// The balance changes only through a paired [`LedgerTransaction`] record; every credit and debit is
/// traceable to exactly one external reference.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub account_number: AccountNumber,
    pub bank_name: String,
    pub balance: Kobo,
    pub status: WalletStatus,
    pub total_inward: Kobo,
    pub total_outward: Kobo,
    pub tx_count: i64,
    /// Inward credits are propagated into this contribution's balance and history.
    pub contribution_id: Option<i64>,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub user_id: String,
    pub account_number: AccountNumber,
    pub bank_name: String,
    pub contribution_id: Option<i64>,
}

impl NewWallet {
    pub fn new<S: Into<String>>(user_id: S, account_number: AccountNumber, bank_name: S) -> Self {
        Self { user_id: user_id.into(), account_number, bank_name: bank_name.into(), contribution_id: None }
    }

    pub fn with_contribution(mut self, contribution_id: i64) -> Self {
        self.contribution_id = Some(contribution_id);
        self
    }
}

//--------------------------------------      Frequency      ---------------------------------------------------------
/// How often a contribution or saving circle collects its deposit.
///
/// The database stores the raw text; rows are parsed per item in the scheduler so that one bad record
/// cannot poison a whole sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "Daily"),
            Frequency::Weekly => write!(f, "Weekly"),
            Frequency::Monthly => write!(f, "Monthly"),
            Frequency::Yearly => write!(f, "Yearly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            s => Err(ConversionError(format!("Invalid contribution frequency: {s}"))),
        }
    }
}

//--------------------------------------  ContributionStatus ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ContributionStatus {
    Pending,
    Completed,
}

impl Display for ContributionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContributionStatus::Pending => write!(f, "Pending"),
            ContributionStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl FromStr for ContributionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            s => Err(ConversionError(format!("Invalid contribution status: {s}"))),
        }
    }
}

//--------------------------------------     Contribution    ---------------------------------------------------------
/// A recurring savings plan.
///
/// Invariant: `balance` always equals the sum of `category_balances`. Both are mutated together, only by a
/// successful charge or an inward-transfer propagation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contribution {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    /// The category that scheduled charges and propagated credits are booked against.
    pub category: String,
    /// Raw frequency text. Parse with [`Contribution::frequency`] before computing schedules.
    pub frequency: String,
    pub amount: Kobo,
    pub balance: Kobo,
    pub category_balances: Json<HashMap<String, Kobo>>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub next_contribution_date: DateTime<Utc>,
    pub last_contribution_date: Option<DateTime<Utc>>,
    pub status: ContributionStatus,
    pub card_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contribution {
    /// An unrecognised frequency is a hard error for this plan; the caller must not mutate anything.
    pub fn frequency(&self) -> Result<Frequency, ConversionError> {
        self.frequency.parse()
    }
}

//--------------------------------------     NewContribution ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewContribution {
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub frequency: String,
    pub amount: Kobo,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub card_id: Option<i64>,
}

impl NewContribution {
    pub fn new<S: Into<String>>(user_id: S, name: S, amount: Kobo, frequency: Frequency) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            name: name.into(),
            category: "General".to_string(),
            frequency: frequency.to_string(),
            amount,
            start_date: now,
            end_date: now + chrono::Duration::days(365),
            card_id: None,
        }
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_card(mut self, card_id: i64) -> Self {
        self.card_id = Some(card_id);
        self
    }
}

//--------------------------------------     CircleStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CircleStatus {
    Pending,
    Active,
    Completed,
}

impl Display for CircleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircleStatus::Pending => write!(f, "Pending"),
            CircleStatus::Active => write!(f, "Active"),
            CircleStatus::Completed => write!(f, "Completed"),
        }
    }
}

//--------------------------------------     SavingCircle    ---------------------------------------------------------
/// A group savings pool. `progress` is always recomputed as `total_contributed * 100 / goal_amount` and the
/// circle transitions to `Completed` once progress reaches 100.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SavingCircle {
    pub id: i64,
    pub name: String,
    pub user_id: String,
    pub deposit_amount: Kobo,
    /// Raw frequency text, parsed per sweep like [`Contribution::frequency`].
    pub frequency: String,
    pub goal_amount: Kobo,
    pub total_contributed: Kobo,
    pub progress: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub next_contribution_date: DateTime<Utc>,
    pub status: CircleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavingCircle {
    pub fn frequency(&self) -> Result<Frequency, ConversionError> {
        self.frequency.parse()
    }
}

//--------------------------------------   CircleMemberStatus -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CircleMemberStatus {
    Active,
    Inactive,
}

impl Display for CircleMemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircleMemberStatus::Active => write!(f, "Active"),
            CircleMemberStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

//--------------------------------------     CircleMember    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CircleMember {
    pub id: i64,
    pub circle_id: i64,
    pub user_id: String,
    pub total_contributed: Kobo,
    /// Consecutive charge failures. At [`MAX_CONSECUTIVE_FAILURES`] the member is skipped by every sweep
    /// until the counter is manually reset.
    pub failures: i64,
    pub status: CircleMemberStatus,
    pub card_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   NewSavingCircle   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewSavingCircle {
    pub name: String,
    pub user_id: String,
    pub deposit_amount: Kobo,
    pub frequency: String,
    pub goal_amount: Kobo,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewSavingCircle {
    pub fn new<S: Into<String>>(name: S, user_id: S, deposit_amount: Kobo, goal_amount: Kobo, frequency: Frequency) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            user_id: user_id.into(),
            deposit_amount,
            frequency: frequency.to_string(),
            goal_amount,
            start_date: now,
            end_date: now + chrono::Duration::days(365),
        }
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}

//--------------------------------------   NewCircleMember   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCircleMember {
    pub circle_id: i64,
    pub user_id: String,
    pub card_id: Option<i64>,
}

impl NewCircleMember {
    pub fn new<S: Into<String>>(circle_id: i64, user_id: S) -> Self {
        Self { circle_id, user_id: user_id.into(), card_id: None }
    }

    pub fn with_card(mut self, card_id: i64) -> Self {
        self.card_id = Some(card_id);
        self
    }
}

//--------------------------------------      StoredCard     ---------------------------------------------------------
/// A tokenised payment instrument held against a user for scheduled charges.
#[derive(Debug, Clone, FromRow)]
pub struct StoredCard {
    pub id: i64,
    pub user_id: String,
    /// Opaque charge-provider token. Never logged.
    pub token: String,
    pub payer_email: String,
    pub preferred: bool,
    /// Consecutive charge failures; the scheduler's soft circuit breaker.
    pub failures: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCard {
    pub fn is_circuit_broken(&self) -> bool {
        self.failures >= MAX_CONSECUTIVE_FAILURES
    }
}

//--------------------------------------     NewStoredCard   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewStoredCard {
    pub user_id: String,
    pub token: String,
    pub payer_email: String,
    pub preferred: bool,
}

impl NewStoredCard {
    pub fn new<S: Into<String>>(user_id: S, token: S, payer_email: S) -> Self {
        Self { user_id: user_id.into(), token: token.into(), payer_email: payer_email.into(), preferred: false }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }
}

//--------------------------------------   TransferDirection  --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransferDirection {
    Inward,
    Outward,
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::Inward => write!(f, "Inward"),
            TransferDirection::Outward => write!(f, "Outward"),
        }
    }
}

//--------------------------------------    TransferStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Successful,
    Failed,
}

impl Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStatus::Pending => write!(f, "Pending"),
            TransferStatus::Successful => write!(f, "Successful"),
            TransferStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------   LedgerTransaction  --------------------------------------------------------
/// An immutable audit record of one ledger movement, keyed by a provider-supplied reference.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub reference: TxReference,
    pub direction: TransferDirection,
    pub amount: Kobo,
    /// Rail fee charged on top of the amount for outward transfers.
    pub fee: Kobo,
    pub wallet_id: Option<i64>,
    pub contribution_id: Option<i64>,
    pub circle_id: Option<i64>,
    pub originator_account_number: Option<String>,
    pub originator_account_name: Option<String>,
    pub originator_bank: Option<String>,
    pub beneficiary_account_number: Option<String>,
    pub beneficiary_bank_code: Option<String>,
    pub session_id: Option<String>,
    pub memo: Option<String>,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  NewLedgerTransaction -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewLedgerTransaction {
    pub reference: TxReference,
    pub direction: TransferDirection,
    pub amount: Kobo,
    pub fee: Kobo,
    pub wallet_id: Option<i64>,
    pub contribution_id: Option<i64>,
    pub circle_id: Option<i64>,
    pub beneficiary_account_number: Option<String>,
    pub beneficiary_bank_code: Option<String>,
    pub memo: Option<String>,
    pub status: TransferStatus,
}

impl NewLedgerTransaction {
    pub fn new(reference: TxReference, direction: TransferDirection, amount: Kobo) -> Self {
        Self {
            reference,
            direction,
            amount,
            fee: Kobo::default(),
            wallet_id: None,
            contribution_id: None,
            circle_id: None,
            beneficiary_account_number: None,
            beneficiary_bank_code: None,
            memo: None,
            status: TransferStatus::Pending,
        }
    }

    pub fn for_wallet(mut self, wallet_id: i64) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    pub fn for_contribution(mut self, contribution_id: i64) -> Self {
        self.contribution_id = Some(contribution_id);
        self
    }

    pub fn for_circle(mut self, circle_id: i64) -> Self {
        self.circle_id = Some(circle_id);
        self
    }

    pub fn with_beneficiary<S: Into<String>>(mut self, account_number: S, bank_code: S) -> Self {
        self.beneficiary_account_number = Some(account_number.into());
        self.beneficiary_bank_code = Some(bank_code.into());
        self
    }

    pub fn with_memo<S: Into<String>>(mut self, memo: S) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_status(mut self, status: TransferStatus) -> Self {
        self.status = status;
        self
    }
}

//--------------------------------------    InwardTransfer   ---------------------------------------------------------
/// A "funds received" notification from the bank rail, already lifted out of the provider's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InwardTransfer {
    pub reference: TxReference,
    pub amount: Kobo,
    pub account_number: AccountNumber,
    pub originator_account_number: Option<String>,
    pub originator_account_name: Option<String>,
    pub originator_bank: Option<String>,
    /// Raw provider status. Anything other than `successful` (case-insensitive) is a failed event.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl InwardTransfer {
    pub fn new(reference: TxReference, amount: Kobo, account_number: AccountNumber) -> Self {
        Self {
            reference,
            amount,
            account_number,
            originator_account_number: None,
            originator_account_name: None,
            originator_bank: None,
            status: "successful".to_string(),
            timestamp: Utc::now(),
            session_id: None,
        }
    }

    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_originator<S: Into<String>>(mut self, account_number: S, account_name: S, bank: S) -> Self {
        self.originator_account_number = Some(account_number.into());
        self.originator_account_name = Some(account_name.into());
        self.originator_bank = Some(bank.into());
        self
    }

    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case("successful")
    }
}

//--------------------------------------     FailureKind     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FailureKind {
    Deposit,
    Withdrawal,
    Charge,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Deposit => write!(f, "Deposit"),
            FailureKind::Withdrawal => write!(f, "Withdrawal"),
            FailureKind::Charge => write!(f, "Charge"),
        }
    }
}

//--------------------------------------  FailedTransaction  ---------------------------------------------------------
/// A dead-letter record. Created, never mutated; read only for manual remediation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FailedTransaction {
    pub id: i64,
    pub kind: FailureKind,
    pub reference: Option<String>,
    pub reason: String,
    pub payload: Json<serde_json::Value>,
    pub wallet_id: Option<i64>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

//-------------------------------------- NewFailedTransaction --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewFailedTransaction {
    pub kind: FailureKind,
    pub reference: Option<String>,
    pub reason: String,
    pub payload: serde_json::Value,
    pub wallet_id: Option<i64>,
    pub user_id: Option<String>,
}

impl NewFailedTransaction {
    pub fn new<S: Into<String>>(kind: FailureKind, reason: S) -> Self {
        Self {
            kind,
            reference: None,
            reason: reason.into(),
            payload: serde_json::Value::Null,
            wallet_id: None,
            user_id: None,
        }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn for_wallet(mut self, wallet_id: i64) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    pub fn for_user<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
