use sqlx::SqliteConnection;

use crate::{
    db_types::{Kobo, LedgerTransaction, NewLedgerTransaction, TxReference},
    traits::LedgerError,
};

/// Inserts a ledger row. The UNIQUE index on `reference` turns a duplicate delivery into
/// [`LedgerError::TransactionAlreadyExists`], which callers treat as "already processed".
pub async fn idempotent_insert(
    tx: NewLedgerTransaction,
    conn: &mut SqliteConnection,
) -> Result<LedgerTransaction, LedgerError> {
    let reference = tx.reference.clone();
    let row = sqlx::query_as(
        r#"
            INSERT INTO transactions (reference, direction, amount, fee, wallet_id, contribution_id, circle_id,
                                      beneficiary_account_number, beneficiary_bank_code, memo, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(tx.reference)
    .bind(tx.direction)
    .bind(tx.amount)
    .bind(tx.fee)
    .bind(tx.wallet_id)
    .bind(tx.contribution_id)
    .bind(tx.circle_id)
    .bind(tx.beneficiary_account_number)
    .bind(tx.beneficiary_bank_code)
    .bind(tx.memo)
    .bind(tx.status)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => LedgerError::TransactionAlreadyExists(reference),
        _ => LedgerError::from(e),
    })?;
    Ok(row)
}

/// Inserts the ledger row for a successful inward transfer, carrying the originator details across.
pub async fn insert_inward(
    tx: NewLedgerTransaction,
    originator_account_number: Option<String>,
    originator_account_name: Option<String>,
    originator_bank: Option<String>,
    session_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<LedgerTransaction, LedgerError> {
    let reference = tx.reference.clone();
    let row = sqlx::query_as(
        r#"
            INSERT INTO transactions (reference, direction, amount, fee, wallet_id, contribution_id, circle_id,
                                      originator_account_number, originator_account_name, originator_bank,
                                      session_id, memo, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(tx.reference)
    .bind(tx.direction)
    .bind(tx.amount)
    .bind(tx.fee)
    .bind(tx.wallet_id)
    .bind(tx.contribution_id)
    .bind(tx.circle_id)
    .bind(originator_account_number)
    .bind(originator_account_name)
    .bind(originator_bank)
    .bind(session_id)
    .bind(tx.memo)
    .bind(tx.status)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => LedgerError::TransactionAlreadyExists(reference),
        _ => LedgerError::from(e),
    })?;
    Ok(row)
}

/// Settles a pending outward row: terminal `Successful` status plus the rail fee (`deducted - amount`).
/// The `status = 'Pending'` guard makes the transition at-most-once; a row that was already settled or
/// failed is refused.
pub async fn settle(
    reference: &TxReference,
    deducted: Kobo,
    conn: &mut SqliteConnection,
) -> Result<LedgerTransaction, LedgerError> {
    let row = sqlx::query_as(
        r#"
            UPDATE transactions SET status = 'Successful', fee = $1 - amount, updated_at = CURRENT_TIMESTAMP
            WHERE reference = $2 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(deducted)
    .bind(reference.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| {
        LedgerError::TransactionStatusUpdateError(format!("Transfer {reference} does not exist or is not pending"))
    })?;
    Ok(row)
}

/// Marks a pending outward row as terminally `Failed`. Same at-most-once guard as [`settle`].
pub async fn mark_failed(reference: &TxReference, conn: &mut SqliteConnection) -> Result<LedgerTransaction, LedgerError> {
    let row = sqlx::query_as(
        r#"
            UPDATE transactions SET status = 'Failed', updated_at = CURRENT_TIMESTAMP
            WHERE reference = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(reference.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| {
        LedgerError::TransactionStatusUpdateError(format!("Transfer {reference} does not exist or is not pending"))
    })?;
    Ok(row)
}

pub async fn fetch_by_reference(
    reference: &TxReference,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerTransaction>, LedgerError> {
    let row = sqlx::query_as(r#"SELECT * FROM transactions WHERE reference = ?"#)
        .bind(reference.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn fetch_for_wallet(
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerTransaction>, LedgerError> {
    let rows = sqlx::query_as(r#"SELECT * FROM transactions WHERE wallet_id = ? ORDER BY created_at DESC, id DESC"#)
        .bind(wallet_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
