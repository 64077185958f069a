pub mod failure_log;
pub mod reconciler_api;
pub mod scheduler_api;
pub mod wallet_api;
pub mod withdrawal_api;
