//! Adapters between the provider HTTP clients in `vant_tools` and the engine's provider seams.
//!
//! The engine only knows the [`BankRail`] and [`CardCharger`] traits; these newtypes translate wire shapes
//! and error taxonomies in both directions.
use savings_engine::{
    db_types::InwardTransfer,
    traits::{
        BankRail,
        CardCharger,
        ChargeOutcome,
        ChargeRequest,
        ChargeStatus,
        ProviderError,
        ResolvedAccount,
        TransferAck,
        TransferInstruction,
    },
};
use vant_tools::{data_objects::{InwardTransferNotification, TransferPayload}, ChargeApi, ChargeApiError, VantApi, VantApiError};

/// Lifts a rail webhook delivery into the engine's notification type.
pub fn inward_transfer_from_notification(notification: InwardTransferNotification) -> InwardTransfer {
    InwardTransfer {
        reference: notification.reference.into(),
        amount: notification.amount,
        account_number: notification.account_number.into(),
        originator_account_number: notification.originator_account_number,
        originator_account_name: notification.originator_account_name,
        originator_bank: notification.originator_bank,
        status: notification.status,
        timestamp: notification.timestamp,
        session_id: notification.session_id,
    }
}

//--------------------------------------       VantRail      ---------------------------------------------------------
#[derive(Clone)]
pub struct VantRail {
    api: VantApi,
}

impl VantRail {
    pub fn new(api: VantApi) -> Self {
        Self { api }
    }
}

impl BankRail for VantRail {
    async fn verify_account(&self, account_number: &str, bank_code: &str) -> Result<ResolvedAccount, ProviderError> {
        let details = self.api.verify_account(account_number, bank_code).await.map_err(provider_error)?;
        Ok(ResolvedAccount {
            account_number: details.account_number,
            account_name: details.account_name,
            bank_code: details.bank_code,
        })
    }

    async fn initiate_transfer(&self, instruction: TransferInstruction) -> Result<TransferAck, ProviderError> {
        let payload = TransferPayload {
            reference: instruction.reference.as_str().to_string(),
            amount: instruction.amount,
            account_number: instruction.account_number,
            bank_code: instruction.bank_code,
            narration: instruction.narration,
        };
        let response = self.api.initiate_transfer(payload).await.map_err(provider_error)?;
        Ok(TransferAck {
            accepted: response.is_accepted(),
            reference: response.reference,
            fee: response.fee,
            message: response.message,
        })
    }
}

fn provider_error(e: VantApiError) -> ProviderError {
    match e {
        VantApiError::AuthFailed(m) => ProviderError::AuthFailed(m),
        VantApiError::RequestError(m) | VantApiError::Initialization(m) => ProviderError::RequestFailed(m),
        VantApiError::JsonError(m) => ProviderError::BadResponse(m),
        VantApiError::QueryError { status, message } => {
            ProviderError::BadResponse(format!("status {status}: {message}"))
        },
    }
}

//--------------------------------------    PaystackCharger  ---------------------------------------------------------
#[derive(Clone)]
pub struct PaystackCharger {
    api: ChargeApi,
}

impl PaystackCharger {
    pub fn new(api: ChargeApi) -> Self {
        Self { api }
    }
}

impl CardCharger for PaystackCharger {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        let data = self
            .api
            .charge(&request.card_token, &request.payer_email, request.amount, request.metadata)
            .await
            .map_err(charge_error)?;
        let status = if data.is_successful() { ChargeStatus::Success } else { ChargeStatus::Declined };
        Ok(ChargeOutcome { status, reference: data.reference, message: data.gateway_response })
    }
}

fn charge_error(e: ChargeApiError) -> ProviderError {
    match e {
        ChargeApiError::RequestError(m) | ChargeApiError::Initialization(m) => ProviderError::RequestFailed(m),
        ChargeApiError::JsonError(m) => ProviderError::BadResponse(m),
        ChargeApiError::QueryError { status, message } => {
            ProviderError::BadResponse(format!("status {status}: {message}"))
        },
    }
}
