use sqlx::PgExecutor;

use crate::db::models::user::User;

pub async fn find_user<'e, E>(executor: E, user_id: i32) -> Result<Option<User>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, role, account_locked, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_user_by_username<'e, E>(executor: E, username: &str) -> Result<Option<User>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, role, account_locked, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(executor)
    .await
}
