use sqlx::{PgConnection, PgExecutor};

use crate::db::models::ledger::{LedgerCredit, PointTransaction};

const TRANSACTION_COLUMNS: &str =
    "id, client_id, amount, balance_after, transaction_type, reference, description, created_at";

/// The only path that changes a balance: appends the entry and moves the
/// materialized balance on the same connection. Replaying a reference returns
/// the original entry and leaves the balance alone.
pub async fn append_entry(
    conn: &mut PgConnection,
    credit: &LedgerCredit,
) -> Result<PointTransaction, sqlx::Error> {
    let existing = sqlx::query_as::<_, PointTransaction>(&format!(
        "SELECT {} FROM point_transactions WHERE reference = $1",
        TRANSACTION_COLUMNS
    ))
    .bind(&credit.reference)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(entry) = existing {
        tracing::info!(reference = %credit.reference, "ledger entry already recorded");
        return Ok(entry);
    }

    let balance_after = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO point_balances (client_id, balance)
        VALUES ($1, $2)
        ON CONFLICT (client_id)
        DO UPDATE SET balance = point_balances.balance + EXCLUDED.balance, updated_at = NOW()
        RETURNING balance
        "#,
    )
    .bind(credit.client_id)
    .bind(credit.amount)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query_as::<_, PointTransaction>(&format!(
        r#"
        INSERT INTO point_transactions (client_id, amount, balance_after, transaction_type, reference, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    ))
    .bind(credit.client_id)
    .bind(credit.amount)
    .bind(balance_after)
    .bind(credit.transaction_type)
    .bind(&credit.reference)
    .bind(&credit.description)
    .fetch_one(&mut *conn)
    .await
}

pub async fn balance<'e, E>(executor: E, client_id: i32) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM point_balances WHERE client_id = $1")
        .bind(client_id)
        .fetch_optional(executor)
        .await?;
    Ok(balance.unwrap_or(0))
}

/// Newest first.
pub async fn transactions<'e, E>(executor: E, client_id: i32) -> Result<Vec<PointTransaction>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PointTransaction>(&format!(
        "SELECT {} FROM point_transactions WHERE client_id = $1 ORDER BY created_at DESC, id DESC",
        TRANSACTION_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(executor)
    .await
}
