use sqlx::{PgExecutor, Postgres, QueryBuilder};

use crate::db::models::cancellation::{
    CancellationFilter, CancellationRequest, DecisionRecord, NewCancellation,
};
use crate::db::models::submission::SubmissionType;

const CANCELLATION_COLUMNS: &str = r#"
    id, client_id, submission_type, submission_id, business_name,
    total_points, total_count, completed_count, progress_rate, fee_rate_bps,
    calculated_refund, final_refund, status, prior_status,
    reason, admin_response, decided_by, created_at, decided_at
"#;

pub async fn pending_exists<'e, E>(
    executor: E,
    submission_type: SubmissionType,
    submission_id: i32,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM cancellation_requests
            WHERE submission_type = $1 AND submission_id = $2 AND status = 'pending'
        )
        "#,
    )
    .bind(submission_type)
    .bind(submission_id)
    .fetch_one(executor)
    .await
}

pub async fn insert_request<'e, E>(
    executor: E,
    new: &NewCancellation,
) -> Result<CancellationRequest, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO cancellation_requests (
            client_id, submission_type, submission_id, business_name,
            total_points, total_count, completed_count, progress_rate, fee_rate_bps,
            calculated_refund, prior_status, reason
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {}
        "#,
        CANCELLATION_COLUMNS
    );

    sqlx::query_as::<_, CancellationRequest>(&sql)
        .bind(new.client_id)
        .bind(new.submission_type)
        .bind(new.submission_id)
        .bind(&new.business_name)
        .bind(new.total_points)
        .bind(new.total_count)
        .bind(new.completed_count)
        .bind(new.progress_rate)
        .bind(new.fee_rate_bps)
        .bind(new.calculated_refund)
        .bind(new.prior_status)
        .bind(&new.reason)
        .fetch_one(executor)
        .await
}

pub async fn fetch_request<'e, E>(
    executor: E,
    request_id: i32,
    for_update: bool,
) -> Result<Option<CancellationRequest>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM cancellation_requests WHERE id = $1 {}",
        CANCELLATION_COLUMNS,
        if for_update { "FOR UPDATE" } else { "" }
    );

    sqlx::query_as::<_, CancellationRequest>(&sql)
        .bind(request_id)
        .fetch_optional(executor)
        .await
}

pub async fn list_requests<'e, E>(
    executor: E,
    filter: CancellationFilter,
) -> Result<Vec<CancellationRequest>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM cancellation_requests WHERE TRUE",
        CANCELLATION_COLUMNS
    ));
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(client_id) = filter.client_id {
        query.push(" AND client_id = ").push_bind(client_id);
    }
    query.push(" ORDER BY created_at DESC, id DESC");

    query
        .build_query_as::<CancellationRequest>()
        .fetch_all(executor)
        .await
}

/// Records a decision on a still-pending request. `None` means the request
/// was no longer pending.
pub async fn apply_decision<'e, E>(
    executor: E,
    request_id: i32,
    record: &DecisionRecord,
) -> Result<Option<CancellationRequest>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        r#"
        UPDATE cancellation_requests
        SET status = $1, final_refund = $2, admin_response = $3,
            decided_by = $4, decided_at = NOW()
        WHERE id = $5 AND status = 'pending'
        RETURNING {}
        "#,
        CANCELLATION_COLUMNS
    );

    sqlx::query_as::<_, CancellationRequest>(&sql)
        .bind(record.status)
        .bind(record.final_refund)
        .bind(&record.admin_response)
        .bind(record.decided_by)
        .bind(request_id)
        .fetch_optional(executor)
        .await
}
