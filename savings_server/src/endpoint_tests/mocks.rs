use csg_common::Kobo;
use savings_engine::traits::{BankRail, ProviderError, ResolvedAccount, TransferAck, TransferInstruction};

/// A rail that resolves every account and accepts (or rejects) every transfer.
#[derive(Clone)]
pub struct MockRail {
    pub accept: bool,
    pub fee: Kobo,
}

impl MockRail {
    pub fn accepting() -> Self {
        Self { accept: true, fee: Kobo::from(0) }
    }
}

impl BankRail for MockRail {
    async fn verify_account(&self, account_number: &str, bank_code: &str) -> Result<ResolvedAccount, ProviderError> {
        Ok(ResolvedAccount {
            account_number: account_number.to_string(),
            account_name: "NGOZI EZE".to_string(),
            bank_code: bank_code.to_string(),
        })
    }

    async fn initiate_transfer(&self, instruction: TransferInstruction) -> Result<TransferAck, ProviderError> {
        Ok(TransferAck {
            accepted: self.accept,
            reference: instruction.reference.as_str().to_string(),
            fee: self.fee,
            message: if self.accept { None } else { Some("rejected by mock rail".to_string()) },
        })
    }
}
