use std::sync::Arc;

use csg_common::Kobo;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::{
    config::ChargeConfig,
    data_objects::{ChargeData, ChargePayload, ChargeResponse},
    error::ChargeApiError,
};

/// Client for the Paystack-like charge provider: collects a stored-card charge against a previously
/// tokenised authorization.
#[derive(Clone)]
pub struct ChargeApi {
    config: ChargeConfig,
    client: Arc<Client>,
}

impl ChargeApi {
    pub fn new(config: ChargeConfig) -> Result<Self, ChargeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| ChargeApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChargeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// One charge attempt against a stored authorization. The provider answers with its own status and a
    /// reference that becomes the ledger's idempotency key for this movement.
    pub async fn charge(
        &self,
        card_token: &str,
        payer_email: &str,
        amount: Kobo,
        metadata: serde_json::Value,
    ) -> Result<ChargeData, ChargeApiError> {
        let payload = ChargePayload {
            authorization_code: card_token.to_string(),
            email: payer_email.to_string(),
            amount: amount.value(),
            metadata,
        };
        debug!("💳️ Charging {amount} against a stored authorization");
        let response = self
            .client
            .post(self.url("/transaction/charge_authorization"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChargeApiError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ChargeApiError::RequestError(e.to_string()))?;
            return Err(ChargeApiError::QueryError { status, message });
        }
        let body = response.json::<ChargeResponse>().await.map_err(|e| ChargeApiError::JsonError(e.to_string()))?;
        if !body.status {
            warn!("💳️ Charge provider flagged the request as unsuccessful");
        }
        trace!("💳️ Charge answered: {} ({})", body.data.status, body.data.reference);
        Ok(body.data)
    }
}
