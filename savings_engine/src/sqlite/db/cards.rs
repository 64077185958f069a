use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewStoredCard, StoredCard},
    traits::LedgerError,
};

pub async fn insert(card: NewStoredCard, conn: &mut SqliteConnection) -> Result<StoredCard, LedgerError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO stored_cards (user_id, token, payer_email, preferred)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(card.user_id)
    .bind(card.token)
    .bind(card.payer_email)
    .bind(card.preferred)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch(card_id: i64, conn: &mut SqliteConnection) -> Result<Option<StoredCard>, LedgerError> {
    let row = sqlx::query_as(r#"SELECT * FROM stored_cards WHERE id = ?"#).bind(card_id).fetch_optional(conn).await?;
    Ok(row)
}

/// The user's preferred card, or the first card on file when none is marked preferred.
pub async fn for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<StoredCard>, LedgerError> {
    let row = sqlx::query_as(
        r#"SELECT * FROM stored_cards WHERE user_id = ? ORDER BY preferred DESC, id ASC LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn record_failure(card_id: i64, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let row: (i64,) = sqlx::query_as(
        r#"
            UPDATE stored_cards SET failures = failures + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING failures;
        "#,
    )
    .bind(card_id)
    .fetch_optional(conn)
    .await?
    .ok_or(LedgerError::CardNotFound(card_id))?;
    debug!("🗃️ Card #{card_id} has {} consecutive failures", row.0);
    Ok(row.0)
}

pub async fn reset_failures(card_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE stored_cards SET failures = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(card_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::CardNotFound(card_id));
    }
    Ok(())
}
