use serde::{Deserialize, Serialize};

use crate::db_types::{Kobo, TxReference};

//--------------------------------------     ChargeRequest   ---------------------------------------------------------
/// One attempt to collect money from a stored payment instrument.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub card_token: String,
    pub payer_email: String,
    pub amount: Kobo,
    pub metadata: serde_json::Value,
}

impl ChargeRequest {
    pub fn new<S: Into<String>>(card_token: S, payer_email: S, amount: Kobo) -> Self {
        Self {
            card_token: card_token.into(),
            payer_email: payer_email.into(),
            amount,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    Success,
    Declined,
}

/// The provider's answer to a charge attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub status: ChargeStatus,
    pub reference: String,
    pub message: Option<String>,
}

impl ChargeOutcome {
    pub fn is_successful(&self) -> bool {
        self.status == ChargeStatus::Success
    }
}

//--------------------------------------     ChargeReceipt   ---------------------------------------------------------
/// A confirmed, successful charge, ready to be applied to the ledger.
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub reference: TxReference,
    pub amount: Kobo,
}

impl ChargeReceipt {
    pub fn new(reference: TxReference, amount: Kobo) -> Self {
        Self { reference, amount }
    }
}

//--------------------------------------    ResolvedAccount  ---------------------------------------------------------
/// The rail's answer to an account-resolution query, used as a pre-flight check on withdrawals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

//-------------------------------------- TransferInstruction ---------------------------------------------------------
/// An outward transfer handed to the bank rail.
#[derive(Debug, Clone, Serialize)]
pub struct TransferInstruction {
    pub reference: TxReference,
    pub amount: Kobo,
    pub account_number: String,
    pub bank_code: String,
    pub narration: Option<String>,
}

//--------------------------------------      TransferAck    ---------------------------------------------------------
/// The rail's synchronous answer to [`TransferInstruction`]. Settlement confirmation arrives later via
/// webhook, but the ack decides whether the ledger may deduct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferAck {
    pub accepted: bool,
    pub reference: String,
    pub fee: Kobo,
    pub message: Option<String>,
}
