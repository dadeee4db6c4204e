// src/api/notification.rs
use axum::{extract::State, http::StatusCode, routing::get, Extension, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::notification::Notification;
use crate::middleware::auth::UserPermissions;
use crate::utils::api_response::ApiResponse;

pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/notifications", get(get_notifications))
}

/// Notifications addressed to the caller, or to admins when the caller is one.
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Unexpired notifications, newest first", body = [Notification])
    ),
    tag = "Notifications",
    security(("bearerAuth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
) -> Result<ApiResponse<Vec<Notification>>, ApiResponse<()>> {
    let notifications = state.store.notifications_for_user(user.user_id).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notifications retrieved",
        notifications,
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_notifications),
    components(schemas(Notification)),
    tags((name = "Notifications", description = "Workflow notifications"))
)]
pub struct NotificationDoc;
