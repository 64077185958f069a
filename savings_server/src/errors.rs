use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use savings_engine::{LedgerError, WithdrawalError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request was rejected. {0}")]
    Rejected(String),
    #[error("The bank rail could not complete the request. {0}")]
    RailUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::RailUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::WalletNotFound(_) |
            LedgerError::WalletIdNotFound(_) |
            LedgerError::ContributionNotFound(_) |
            LedgerError::CircleNotFound(_) |
            LedgerError::MemberNotFound(_) |
            LedgerError::CardNotFound(_) |
            LedgerError::TransactionNotFound(_) => Self::NoRecordFound(e.to_string()),
            LedgerError::InsufficientFunds { .. } |
            LedgerError::InvalidAmount(_) |
            LedgerError::WalletNotActive { .. } => Self::Rejected(e.to_string()),
            _ => Self::BackendError(e.to_string()),
        }
    }
}

impl From<WithdrawalError> for ServerError {
    fn from(e: WithdrawalError) -> Self {
        match e {
            WithdrawalError::Ledger(inner) => Self::from(inner),
            WithdrawalError::BeneficiaryNotVerified(m) => Self::Rejected(m),
            WithdrawalError::RailRejected(m) => Self::RailUnavailable(m),
            WithdrawalError::Rail(p) => Self::RailUnavailable(p.to_string()),
        }
    }
}
