use crate::db_types::{Kobo, LedgerTransaction, TxReference, Wallet};

/// Fired after an inward transfer has been credited to a wallet (balance already updated).
#[derive(Debug, Clone)]
pub struct WalletCreditedEvent {
    pub wallet: Wallet,
    pub transaction: LedgerTransaction,
}

impl WalletCreditedEvent {
    pub fn new(wallet: Wallet, transaction: LedgerTransaction) -> Self {
        Self { wallet, transaction }
    }
}

/// Fired after a scheduled contribution or circle charge has been applied.
#[derive(Debug, Clone)]
pub struct ContributionChargedEvent {
    pub user_id: String,
    pub amount: Kobo,
    pub reference: TxReference,
}

impl ContributionChargedEvent {
    pub fn new<S: Into<String>>(user_id: S, amount: Kobo, reference: TxReference) -> Self {
        Self { user_id: user_id.into(), amount, reference }
    }
}
