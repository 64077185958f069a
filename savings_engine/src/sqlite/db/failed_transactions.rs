use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{FailedTransaction, NewFailedTransaction},
    traits::LedgerError,
};

/// Appends a dead letter. There is deliberately no update function in this module.
pub async fn insert(entry: NewFailedTransaction, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let row: (i64,) = sqlx::query_as(
        r#"
            INSERT INTO failed_transactions (kind, reference, reason, payload, wallet_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id;
        "#,
    )
    .bind(entry.kind)
    .bind(entry.reference)
    .bind(entry.reason)
    .bind(Json(entry.payload))
    .bind(entry.wallet_id)
    .bind(entry.user_id)
    .fetch_one(conn)
    .await?;
    Ok(row.0)
}

pub async fn fetch(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<FailedTransaction>, LedgerError> {
    let rows = sqlx::query_as(r#"SELECT * FROM failed_transactions ORDER BY created_at DESC, id DESC LIMIT ?"#)
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
