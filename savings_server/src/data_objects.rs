use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of `POST /api/withdraw`. Amount is in kobo. A client may pin its own reference to make the request
/// idempotent; otherwise the server mints one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalParams {
    pub account_number: String,
    pub amount: i64,
    pub beneficiary_account: String,
    pub bank_code: String,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}
