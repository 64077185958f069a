//! Cooperative Savings Engine
//!
//! The savings engine is the core library behind the cooperative savings gateway. It owns every rule that
//! moves money: the wallet ledger, recurring contribution and saving-circle charges, reconciliation of
//! asynchronous bank-rail notifications, and the dead-letter log for anything that cannot be completed.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never
//!    need to access the database directly. Instead, use the public API provided by the engine. The
//!    exception is the data types used in the database. These are defined in the `db_types` module and are
//!    public.
//! 2. The engine public API ([`mod@sve_api`]): the webhook reconciler, the outward-transfer flow, the
//!    recurring-charge scheduler and read-only wallet queries. Backends implement the traits in the
//!    [`mod@traits`] module in order to act as a ledger store; external payment and bank-rail providers
//!    implement the provider traits.
//! 3. A set of events that can be subscribed to. These are emitted after money lands in a wallet or a
//!    scheduled charge succeeds, so that notification senders can react without being in the money path.
pub mod db_types;
pub mod events;
pub mod helpers;
mod sve_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{db_url, new_pool, run_migrations, SqliteDatabase};
pub use sve_api::{
    reconciler_api::{ReconcileOutcome, ReconcilerApi},
    scheduler_api::{RecurringChargeApi, SweepSummary},
    wallet_api::WalletApi,
    withdrawal_api::{WithdrawalApi, WithdrawalError, WithdrawalRequest},
};
pub use traits::{LedgerError, SavingsLedger};
