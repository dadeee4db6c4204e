use axum::{extract::State, http::StatusCode, routing::get, Extension, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::ledger::{PointTransaction, PointTransactionType, PointsSummary};
use crate::middleware::auth::UserPermissions;
use crate::utils::api_response::ApiResponse;

pub fn points_routes() -> Router<AppState> {
    Router::new().route("/points", get(get_points))
}

/// Caller's balance and ledger history, newest first.
#[utoipa::path(
    get,
    path = "/points",
    responses(
        (status = 200, description = "Balance and transactions", body = PointsSummary)
    ),
    tag = "Points",
    security(("bearerAuth" = []))
)]
pub async fn get_points(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
) -> Result<ApiResponse<PointsSummary>, ApiResponse<()>> {
    let summary = state.store.points_summary(user.user_id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Points balance", summary))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_points),
    components(schemas(PointsSummary, PointTransaction, PointTransactionType)),
    tags((name = "Points", description = "Point balance and ledger"))
)]
pub struct PointsDoc;
