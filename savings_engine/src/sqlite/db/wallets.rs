use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{AccountNumber, Kobo, NewWallet, Wallet, WalletStatus},
    traits::LedgerError,
};

pub async fn insert_wallet(wallet: NewWallet, conn: &mut SqliteConnection) -> Result<Wallet, LedgerError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO wallets (user_id, account_number, bank_name, contribution_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(wallet.user_id)
    .bind(wallet.account_number)
    .bind(wallet.bank_name)
    .bind(wallet.contribution_id)
    .fetch_one(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_wallet(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, LedgerError> {
    let wallet =
        sqlx::query_as(r#"SELECT * FROM wallets WHERE id = ?"#).bind(wallet_id).fetch_optional(conn).await?;
    Ok(wallet)
}

pub async fn fetch_wallet_by_account(
    account: &AccountNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, LedgerError> {
    let wallet = sqlx::query_as(r#"SELECT * FROM wallets WHERE account_number = ?"#)
        .bind(account.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}

pub async fn set_status(
    wallet_id: i64,
    status: WalletStatus,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE wallets SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(status)
        .bind(wallet_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::WalletIdNotFound(wallet_id));
    }
    Ok(())
}

/// Credits an inward transfer onto the wallet row. Caller wraps this in the same database transaction as
/// the ledger-row insert.
pub async fn credit_for_inward(
    wallet_id: i64,
    amount: Kobo,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Wallet, LedgerError> {
    let wallet = sqlx::query_as(
        r#"
            UPDATE wallets SET
                balance = balance + $1,
                total_inward = total_inward + $1,
                tx_count = tx_count + 1,
                last_transaction_at = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(at)
    .bind(wallet_id)
    .fetch_optional(conn)
    .await?
    .ok_or(LedgerError::WalletIdNotFound(wallet_id))?;
    trace!("🗃️ Credited {amount} to wallet #{wallet_id}");
    Ok(wallet)
}

/// Deducts a settled outward transfer. The `balance >= deducted` guard serialises concurrent spends on the
/// same wallet; `None` means the funds are no longer there.
pub async fn debit_for_outward(
    wallet_id: i64,
    deducted: Kobo,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, LedgerError> {
    let wallet = sqlx::query_as(
        r#"
            UPDATE wallets SET
                balance = balance - $1,
                total_outward = total_outward + $1,
                tx_count = tx_count + 1,
                last_transaction_at = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND balance >= $1
            RETURNING *;
        "#,
    )
    .bind(deducted)
    .bind(at)
    .bind(wallet_id)
    .fetch_optional(conn)
    .await?;
    Ok(wallet)
}
