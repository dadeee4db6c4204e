use sqlx::{PgExecutor, PgPool};

use crate::db::models::notification::{NewNotification, Notification};

/// Inserts a notification and its targets in one transaction.
pub async fn insert_notification(pool: &PgPool, notification: &NewNotification) -> Result<i32, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let notification_id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO notifications (
            title, body, type, action_type, action_data, dismissible, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&notification.title)
    .bind(&notification.body)
    .bind(&notification.type_field)
    .bind(&notification.action_type)
    .bind(&notification.action_data)
    .bind(notification.dismissible)
    .bind(notification.expires_at)
    .fetch_one(&mut *tx)
    .await?;

    for target in &notification.targets {
        sqlx::query(
            "INSERT INTO notification_targets (notification_id, scope, target_id) VALUES ($1, $2, $3)",
        )
        .bind(notification_id)
        .bind(target.scope.as_str())
        .bind(target.target_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(notification_id)
}

/// Unexpired notifications addressed to the user directly or, for admins, to the admin group.
pub async fn notifications_for_user<'e, E>(executor: E, user_id: i32) -> Result<Vec<Notification>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT n.id, n.title, n.body, n.type, n.action_type, n.action_data,
               n.dismissible, n.created_at, n.expires_at
        FROM notifications n
        WHERE (n.expires_at IS NULL OR n.expires_at > NOW())
          AND EXISTS (
            SELECT 1 FROM notification_targets t
            WHERE t.notification_id = n.id
              AND (
                (t.scope = 'user' AND t.target_id = $1)
                OR (t.scope = 'admins' AND EXISTS (
                    SELECT 1 FROM users u WHERE u.id = $1 AND u.role = 'admin'
                ))
              )
          )
        ORDER BY n.created_at DESC, n.id DESC
        LIMIT 100
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
