use sqlx::PgExecutor;

use crate::db::models::submission::{SubmissionSnapshot, SubmissionStatus, SubmissionType};

/// Reads the slice of a submission the workflow needs. `for_update` locks the row
/// until the surrounding transaction ends.
pub async fn fetch_submission<'e, E>(
    executor: E,
    submission_type: SubmissionType,
    submission_id: i32,
    for_update: bool,
) -> Result<Option<SubmissionSnapshot>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT id, client_id, status, company_name AS business_name,
               total_points, total_count, completed_count, cancellation_requested
        FROM {}
        WHERE id = $1
        {}
        "#,
        submission_type.table_name(),
        if for_update { "FOR UPDATE" } else { "" }
    );

    sqlx::query_as::<_, SubmissionSnapshot>(&sql)
        .bind(submission_id)
        .fetch_optional(executor)
        .await
}

pub async fn set_cancellation_requested<'e, E>(
    executor: E,
    submission_type: SubmissionType,
    submission_id: i32,
    requested: bool,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "UPDATE {} SET cancellation_requested = $1, updated_at = NOW() WHERE id = $2",
        submission_type.table_name()
    );

    let result = sqlx::query(&sql)
        .bind(requested)
        .bind(submission_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Writes the post-decision status and clears the cancellation flag.
pub async fn close_cancellation<'e, E>(
    executor: E,
    submission_type: SubmissionType,
    submission_id: i32,
    status: SubmissionStatus,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        UPDATE {}
        SET status = $1, cancellation_requested = FALSE, updated_at = NOW()
        WHERE id = $2
        "#,
        submission_type.table_name()
    );

    let result = sqlx::query(&sql)
        .bind(status)
        .bind(submission_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
