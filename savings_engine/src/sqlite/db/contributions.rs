use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Contribution, ContributionStatus, Kobo, NewContribution},
    traits::LedgerError,
};

pub async fn insert(plan: NewContribution, conn: &mut SqliteConnection) -> Result<Contribution, LedgerError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO contributions (user_id, name, category, frequency, amount, start_date, end_date,
                                       next_contribution_date, card_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $6, $8)
            RETURNING *;
        "#,
    )
    .bind(plan.user_id)
    .bind(plan.name)
    .bind(plan.category)
    .bind(plan.frequency)
    .bind(plan.amount)
    .bind(plan.start_date)
    .bind(plan.end_date)
    .bind(plan.card_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch(contribution_id: i64, conn: &mut SqliteConnection) -> Result<Option<Contribution>, LedgerError> {
    let row = sqlx::query_as(r#"SELECT * FROM contributions WHERE id = ?"#)
        .bind(contribution_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Plans that are due for collection: next date reached, window open, still `Pending`.
pub async fn due(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Contribution>, LedgerError> {
    let rows = sqlx::query_as(
        r#"
            SELECT * FROM contributions
            WHERE status = 'Pending'
              AND next_contribution_date <= $1
              AND start_date <= $1
              AND end_date >= $1
            ORDER BY next_contribution_date ASC
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Applies a confirmed charge: balance and the active category sub-balance move together, and the schedule
/// advances. Dates are only ever touched here and the caller only gets here after the charge succeeded.
pub async fn apply_charge(
    contribution_id: i64,
    amount: Kobo,
    now: DateTime<Utc>,
    next_due: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Contribution, LedgerError> {
    let plan = fetch(contribution_id, &mut *conn).await?.ok_or(LedgerError::ContributionNotFound(contribution_id))?;
    let mut balances = plan.category_balances.0;
    let entry = balances.entry(plan.category.clone()).or_insert_with(Kobo::default);
    *entry = *entry + amount;
    // the plan is finished once its schedule leaves the collection window
    let status =
        if next_due > plan.end_date { ContributionStatus::Completed } else { ContributionStatus::Pending };
    let row = sqlx::query_as(
        r#"
            UPDATE contributions SET
                balance = balance + $1,
                category_balances = $2,
                last_contribution_date = $3,
                next_contribution_date = $4,
                status = $5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $6
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(Json(balances))
    .bind(now)
    .bind(next_due)
    .bind(status)
    .bind(contribution_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Contribution #{contribution_id} charged {amount}, next due {next_due}");
    Ok(row)
}

/// Propagates an inward wallet credit into the linked plan without touching its schedule.
pub async fn credit_balance(
    contribution_id: i64,
    amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<Contribution, LedgerError> {
    let plan = fetch(contribution_id, &mut *conn).await?.ok_or(LedgerError::ContributionNotFound(contribution_id))?;
    let mut balances = plan.category_balances.0;
    let entry = balances.entry(plan.category.clone()).or_insert_with(Kobo::default);
    *entry = *entry + amount;
    let row = sqlx::query_as(
        r#"
            UPDATE contributions SET
                balance = balance + $1,
                category_balances = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(Json(balances))
    .bind(contribution_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}
