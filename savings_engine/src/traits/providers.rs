use thiserror::Error;

use crate::traits::{ChargeOutcome, ChargeRequest, ResolvedAccount, TransferAck, TransferInstruction};

/// The payment/charge provider seam. One call, one attempt; retry policy belongs to the scheduler.
#[allow(async_fn_in_trait)]
pub trait CardCharger: Send + Sync {
    /// Attempts to collect `request.amount` from the stored instrument. A `Declined` outcome is a normal
    /// answer (counts against the instrument's failure counter); `Err` means the provider could not be
    /// asked at all.
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError>;
}

/// The bank-rail provider seam (account resolution and outward transfers).
#[allow(async_fn_in_trait)]
pub trait BankRail: Send + Sync {
    /// Resolves beneficiary account details before a transfer is attempted.
    async fn verify_account(&self, account_number: &str, bank_code: &str) -> Result<ResolvedAccount, ProviderError>;

    /// Hands an outward transfer to the rail. An un-accepted ack means the rail refused the transfer; the
    /// ledger must not deduct on that path.
    async fn initiate_transfer(&self, instruction: TransferInstruction) -> Result<TransferAck, ProviderError>;
}

/// Fire-and-forget notification seam. Implementations swallow their own errors; nothing in the money path
/// ever waits on a notification.
#[allow(async_fn_in_trait)]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, subject: &str, recipients: &[String], body: &str);
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("The provider could not be reached: {0}")]
    RequestFailed(String),
    #[error("The provider call timed out after {0} ms")]
    Timeout(u64),
    #[error("The provider returned an unusable response: {0}")]
    BadResponse(String),
    #[error("The provider rejected our credentials: {0}")]
    AuthFailed(String),
}
