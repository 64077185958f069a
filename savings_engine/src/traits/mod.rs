//! The behaviour contracts that back the savings engine.
//!
//! [`SavingsLedger`] is the storage seam: any backend that implements it can act as the ledger store for
//! the gateway. [`CardCharger`], [`BankRail`] and [`NotificationSender`] are the seams to the external
//! collaborators; concrete HTTP clients live outside the engine and are adapted onto these traits.
mod data_objects;
mod ledger;
mod providers;

pub use data_objects::{ChargeOutcome, ChargeReceipt, ChargeRequest, ChargeStatus, ResolvedAccount, TransferAck, TransferInstruction};
pub use ledger::{LedgerError, SavingsLedger};
pub use providers::{BankRail, CardCharger, NotificationSender, ProviderError};
