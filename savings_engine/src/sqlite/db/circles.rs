use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{CircleMember, CircleStatus, Kobo, NewCircleMember, NewSavingCircle, SavingCircle},
    traits::LedgerError,
};

pub async fn insert_circle(circle: NewSavingCircle, conn: &mut SqliteConnection) -> Result<SavingCircle, LedgerError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO saving_circles (name, user_id, deposit_amount, frequency, goal_amount, start_date, end_date,
                                        next_contribution_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $6, 'Active')
            RETURNING *;
        "#,
    )
    .bind(circle.name)
    .bind(circle.user_id)
    .bind(circle.deposit_amount)
    .bind(circle.frequency)
    .bind(circle.goal_amount)
    .bind(circle.start_date)
    .bind(circle.end_date)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_member(member: NewCircleMember, conn: &mut SqliteConnection) -> Result<CircleMember, LedgerError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO circle_members (circle_id, user_id, card_id)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(member.circle_id)
    .bind(member.user_id)
    .bind(member.card_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch(circle_id: i64, conn: &mut SqliteConnection) -> Result<Option<SavingCircle>, LedgerError> {
    let row =
        sqlx::query_as(r#"SELECT * FROM saving_circles WHERE id = ?"#).bind(circle_id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn due(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<SavingCircle>, LedgerError> {
    let rows = sqlx::query_as(
        r#"
            SELECT * FROM saving_circles
            WHERE status = 'Active'
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

pub async fn members_of(circle_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CircleMember>, LedgerError> {
    let rows = sqlx::query_as(r#"SELECT * FROM circle_members WHERE circle_id = ? ORDER BY id ASC"#)
        .bind(circle_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_member(member_id: i64, conn: &mut SqliteConnection) -> Result<Option<CircleMember>, LedgerError> {
    let row =
        sqlx::query_as(r#"SELECT * FROM circle_members WHERE id = ?"#).bind(member_id).fetch_optional(conn).await?;
    Ok(row)
}

/// Books a successful member deposit: member total up, consecutive failures cleared, circle total and
/// progress recomputed, and the circle completed once progress reaches 100%.
pub async fn apply_member_charge(
    circle_id: i64,
    member_id: i64,
    amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<SavingCircle, LedgerError> {
    let result = sqlx::query(
        r#"
            UPDATE circle_members SET
                total_contributed = total_contributed + $1,
                failures = 0,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
        "#,
    )
    .bind(amount)
    .bind(member_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::MemberNotFound(member_id));
    }
    let circle = fetch(circle_id, &mut *conn).await?.ok_or(LedgerError::CircleNotFound(circle_id))?;
    let total = circle.total_contributed + amount;
    let progress = if circle.goal_amount.value() > 0 {
        total.value() as f64 * 100.0 / circle.goal_amount.value() as f64
    } else {
        0.0
    };
    let status = if progress >= 100.0 { CircleStatus::Completed } else { circle.status };
    if status == CircleStatus::Completed && circle.status != CircleStatus::Completed {
        debug!("🗃️ Saving circle #{circle_id} has reached its goal");
    }
    let row = sqlx::query_as(
        r#"
            UPDATE saving_circles SET
                total_contributed = $1,
                progress = $2,
                status = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(total)
    .bind(progress)
    .bind(status)
    .bind(circle_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Member #{member_id} deposited {amount} into circle #{circle_id} ({progress:.1}%)");
    Ok(row)
}

pub async fn advance_schedule(
    circle_id: i64,
    next_due: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query(
        "UPDATE saving_circles SET next_contribution_date = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(next_due)
    .bind(circle_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::CircleNotFound(circle_id));
    }
    Ok(())
}

pub async fn record_member_failure(member_id: i64, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let row: (i64,) = sqlx::query_as(
        r#"
            UPDATE circle_members SET failures = failures + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING failures;
        "#,
    )
    .bind(member_id)
    .fetch_optional(conn)
    .await?
    .ok_or(LedgerError::MemberNotFound(member_id))?;
    Ok(row.0)
}

pub async fn reset_member_failures(member_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result =
        sqlx::query("UPDATE circle_members SET failures = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(member_id)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::MemberNotFound(member_id));
    }
    Ok(())
}
