use std::fmt::Debug;

use log::*;
use thiserror::Error;

use crate::{
    db_types::{
        AccountNumber,
        FailureKind,
        Kobo,
        LedgerTransaction,
        NewFailedTransaction,
        NewLedgerTransaction,
        TransferDirection,
        TxReference,
        WalletStatus,
    },
    sve_api::failure_log::dead_letter,
    traits::{BankRail, LedgerError, ProviderError, SavingsLedger, TransferInstruction},
};

/// A request to move funds out of a reserved wallet to an external bank account.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub account_number: AccountNumber,
    pub amount: Kobo,
    pub beneficiary_account: String,
    pub beneficiary_bank_code: String,
    pub reference: TxReference,
    pub narration: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum WithdrawalError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("The bank rail could not be used: {0}")]
    Rail(#[from] ProviderError),
    #[error("The rail rejected the transfer: {0}")]
    RailRejected(String),
    #[error("Beneficiary account could not be verified: {0}")]
    BeneficiaryNotVerified(String),
}

/// `WithdrawalApi` moves funds out of a reserved wallet with pre-flight balance and identity checks.
///
/// The balance deduction and the ledger status update are one logical unit: no code path deducts without
/// the rail having accepted the transfer first.
pub struct WithdrawalApi<B, R> {
    db: B,
    rail: R,
}

impl<B, R> Debug for WithdrawalApi<B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi")
    }
}

impl<B, R> WithdrawalApi<B, R>
where
    B: SavingsLedger,
    R: BankRail,
{
    pub fn new(db: B, rail: R) -> Self {
        Self { db, rail }
    }

    /// Executes one outward transfer.
    ///
    /// Preconditions (positive amount, active wallet, sufficient balance, verified beneficiary) are
    /// checked before anything is written: a request that fails them leaves no trace in the ledger or the
    /// dead-letter log. Once the preconditions hold, a `Pending` ledger row is written *before* the rail
    /// is called so a crash mid-call is auditable.
    pub async fn transfer_to_bank(&self, request: WithdrawalRequest) -> Result<LedgerTransaction, WithdrawalError> {
        let reference = request.reference.clone();
        debug!("🏧️ Withdrawal {reference} requested: {} to {}", request.amount, request.beneficiary_account);

        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(request.amount).into());
        }
        let wallet = self
            .db
            .fetch_wallet_by_account(&request.account_number)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(request.account_number.clone()))?;
        if wallet.status != WalletStatus::Active {
            return Err(LedgerError::WalletNotActive { wallet_id: wallet.id, status: wallet.status }.into());
        }
        if wallet.balance < request.amount {
            return Err(LedgerError::InsufficientFunds { available: wallet.balance, requested: request.amount }.into());
        }
        let resolved = self
            .rail
            .verify_account(&request.beneficiary_account, &request.beneficiary_bank_code)
            .await
            .map_err(|e| WithdrawalError::BeneficiaryNotVerified(e.to_string()))?;
        if resolved.account_number != request.beneficiary_account {
            return Err(WithdrawalError::BeneficiaryNotVerified(format!(
                "Rail resolved a different account number ({})",
                resolved.account_number
            )));
        }
        trace!("🏧️ Beneficiary for {reference} verified as {}", resolved.account_name);

        let pending = NewLedgerTransaction::new(reference.clone(), TransferDirection::Outward, request.amount)
            .for_wallet(wallet.id)
            .with_beneficiary(request.beneficiary_account.clone(), request.beneficiary_bank_code.clone())
            .with_memo(request.narration.clone().unwrap_or_else(|| "Withdrawal to bank".to_string()));
        self.db.begin_withdrawal(pending).await?;

        let instruction = TransferInstruction {
            reference: reference.clone(),
            amount: request.amount,
            account_number: request.beneficiary_account.clone(),
            bank_code: request.beneficiary_bank_code.clone(),
            narration: request.narration.clone(),
        };
        match self.rail.initiate_transfer(instruction).await {
            Ok(ack) if ack.accepted => {
                let deducted = request.amount + ack.fee;
                let (row, wallet) = self.db.settle_withdrawal(&reference, deducted).await?;
                info!("🏧️ Withdrawal {reference} settled. Wallet #{} now holds {}", wallet.id, wallet.balance);
                Ok(row)
            },
            Ok(ack) => {
                let message = ack.message.unwrap_or_else(|| "No reason given".to_string());
                warn!("🏧️ The rail rejected withdrawal {reference}: {message}");
                self.abandon(&request, wallet.id, &message).await?;
                Err(WithdrawalError::RailRejected(message))
            },
            Err(e) => {
                error!("🏧️ Rail call failed for withdrawal {reference}: {e}");
                self.abandon(&request, wallet.id, &e.to_string()).await?;
                Err(WithdrawalError::Rail(e))
            },
        }
    }

    /// Marks the pending row failed and dead-letters the attempt so it can be retried or refunded
    /// manually. The balance has not been touched on this path.
    async fn abandon(&self, request: &WithdrawalRequest, wallet_id: i64, reason: &str) -> Result<(), WithdrawalError> {
        self.db.fail_withdrawal(&request.reference).await?;
        let payload = serde_json::json!({
            "account_number": request.account_number,
            "amount": request.amount,
            "beneficiary_account": request.beneficiary_account,
            "beneficiary_bank_code": request.beneficiary_bank_code,
            "narration": request.narration,
        });
        let entry = NewFailedTransaction::new(FailureKind::Withdrawal, reason)
            .with_reference(request.reference.as_str())
            .with_payload(payload)
            .for_wallet(wallet_id);
        dead_letter(&self.db, entry).await;
        Ok(())
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
