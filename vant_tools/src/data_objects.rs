use chrono::{DateTime, Utc};
use csg_common::Kobo;
use serde::{Deserialize, Serialize};

//--------------------------------------      AuthToken      ---------------------------------------------------------
/// A bearer token with its expiry, held in a [`TokenCache`](crate::TokenCache). Never a bare string in
/// module state.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    /// Lifetime in seconds, per the rail's login endpoint.
    pub expires_in: i64,
}

//-------------------------------------- InwardTransferNotification --------------------------------------------------
/// The webhook payload the rail posts when funds arrive in a reserved account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InwardTransferNotification {
    pub reference: String,
    pub amount: Kobo,
    pub account_number: String,
    #[serde(default)]
    pub originator_account_number: Option<String>,
    #[serde(default)]
    pub originator_account_name: Option<String>,
    #[serde(default)]
    pub originator_bank: Option<String>,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

//--------------------------------------    AccountDetails   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetails {
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

//--------------------------------------   TransferPayload   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct TransferPayload {
    pub reference: String,
    pub amount: Kobo,
    pub account_number: String,
    pub bank_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferResponse {
    pub status: String,
    pub reference: String,
    #[serde(default)]
    pub fee: Kobo,
    #[serde(default)]
    pub message: Option<String>,
}

impl TransferResponse {
    pub fn is_accepted(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "successful" | "accepted" | "pending")
    }
}

//--------------------------------------    ChargePayload    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct ChargePayload {
    pub authorization_code: String,
    pub email: String,
    /// Amount in kobo, as the provider expects.
    pub amount: i64,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeResponse {
    pub status: bool,
    pub data: ChargeData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeData {
    pub status: String,
    pub reference: String,
    #[serde(default)]
    pub gateway_response: Option<String>,
}

impl ChargeData {
    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inward_notification_accepts_the_rail_wire_shape() {
        let json = r#"{
            "reference": "VNT-20240601-00042",
            "amount": 500000,
            "account_number": "9977001122",
            "originator_account_number": "0123456789",
            "originator_account_name": "CHINWE OBI",
            "originator_bank": "First Bank",
            "status": "successful",
            "timestamp": "2024-06-01T09:15:00Z",
            "sessionId": "090405240601091500123456789012"
        }"#;
        let notice: InwardTransferNotification = serde_json::from_str(json).unwrap();
        assert_eq!(notice.reference, "VNT-20240601-00042");
        assert_eq!(notice.amount, Kobo::from(500000));
        assert_eq!(notice.session_id.as_deref(), Some("090405240601091500123456789012"));
    }

    #[test]
    fn optional_originator_fields_may_be_absent() {
        let json = r#"{
            "reference": "VNT-1",
            "amount": 100,
            "account_number": "9977001122",
            "status": "failed",
            "timestamp": "2024-06-01T09:15:00Z"
        }"#;
        let notice: InwardTransferNotification = serde_json::from_str(json).unwrap();
        assert!(notice.originator_account_name.is_none());
        assert!(notice.session_id.is_none());
    }
}
