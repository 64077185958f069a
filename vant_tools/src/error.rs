use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VantApiError {
    #[error("Could not initialize the Vant API client: {0}")]
    Initialization(String),
    #[error("Authentication with the rail failed: {0}")]
    AuthFailed(String),
    #[error("Error sending request to the rail: {0}")]
    RequestError(String),
    #[error("Could not parse the rail's response: {0}")]
    JsonError(String),
    #[error("The rail returned an error. Status: {status}, Message: {message}")]
    QueryError { status: u16, message: String },
}

#[derive(Debug, Clone, Error)]
pub enum ChargeApiError {
    #[error("Could not initialize the charge API client: {0}")]
    Initialization(String),
    #[error("Error sending request to the charge provider: {0}")]
    RequestError(String),
    #[error("Could not parse the charge provider's response: {0}")]
    JsonError(String),
    #[error("The charge provider returned an error. Status: {status}, Message: {message}")]
    QueryError { status: u16, message: String },
}
