// src/api/cancellation.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::db::models::cancellation::{
    CancellationFilter, CancellationRequest, CancellationStatus, CancellationView,
    DecideCancellationRequest, Decision, ListCancellationsQuery, NewCancellationRequest,
};
use crate::db::models::submission::{SubmissionStatus, SubmissionType};
use crate::middleware::auth::UserPermissions;
use crate::services::refund::RefundBreakdown;
use crate::utils::api_response::ApiResponse;

pub fn cancellation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/submissions/{submission_type}/{submission_id}/refund-preview",
            get(preview_refund),
        )
        .route(
            "/cancellations",
            get(list_cancellations).post(create_cancellation),
        )
        .route(
            "/cancellations/{request_id}",
            get(get_cancellation).patch(decide_cancellation),
        )
}

/// Path segments arrive as text so an unknown category is a 400 in our envelope.
fn parse_submission_type(raw: &str) -> Result<SubmissionType, ApiResponse<()>> {
    raw.parse::<SubmissionType>().map_err(|e| {
        ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            Some(json!({ "code": "validation", "field": "submission_type", "message": e.to_string() })),
        )
    })
}

/// Refund the caller would receive if they cancelled now.
#[utoipa::path(
    get,
    path = "/submissions/{submission_type}/{submission_id}/refund-preview",
    params(
        ("submission_type" = String, Path, description = "reward, receipt_review, kakaomap_review, blog_distribution or experience"),
        ("submission_id" = i32, Path, description = "Submission id")
    ),
    responses(
        (status = 200, description = "Refund breakdown", body = RefundBreakdown),
        (status = 400, description = "Unknown submission type"),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Submission cannot be cancelled")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn preview_refund(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    Path((submission_type, submission_id)): Path<(String, i32)>,
) -> Result<ApiResponse<RefundBreakdown>, ApiResponse<()>> {
    let submission_type = parse_submission_type(&submission_type)?;
    let breakdown = state
        .cancellations
        .preview(user.user_id, submission_type, submission_id)
        .await?;
    Ok(ApiResponse::success(StatusCode::OK, "Refund preview", breakdown))
}

#[utoipa::path(
    post,
    path = "/cancellations",
    request_body = NewCancellationRequest,
    responses(
        (status = 201, description = "Cancellation request created", body = CancellationRequest),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Not cancellable or already requested")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn create_cancellation(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    Json(payload): Json<NewCancellationRequest>,
) -> Result<ApiResponse<CancellationRequest>, ApiResponse<()>> {
    let request = state
        .cancellations
        .create(
            user.user_id,
            payload.submission_type,
            payload.submission_id,
            payload.reason,
        )
        .await?;
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Cancellation request submitted",
        request,
    ))
}

/// Admins see every request; clients see their own.
#[utoipa::path(
    get,
    path = "/cancellations",
    params(ListCancellationsQuery),
    responses(
        (status = 200, description = "Cancellation requests, newest first", body = [CancellationView])
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn list_cancellations(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    Query(query): Query<ListCancellationsQuery>,
) -> Result<ApiResponse<Vec<CancellationView>>, ApiResponse<()>> {
    let filter = CancellationFilter {
        status: query.status,
        client_id: user.client_scope(),
    };
    let requests = state.cancellations.list(filter).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        format!("{} cancellation request(s)", requests.len()),
        requests,
    ))
}

#[utoipa::path(
    get,
    path = "/cancellations/{request_id}",
    params(("request_id" = i32, Path, description = "Cancellation request id")),
    responses(
        (status = 200, description = "Cancellation request", body = CancellationView),
        (status = 404, description = "Not found")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn get_cancellation(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    Path(request_id): Path<i32>,
) -> Result<ApiResponse<CancellationView>, ApiResponse<()>> {
    let view = state
        .cancellations
        .get(request_id, user.client_scope())
        .await?;
    Ok(ApiResponse::success(StatusCode::OK, "Cancellation request", view))
}

/// Approve (with the final refund) or reject a pending request. Admin only.
#[utoipa::path(
    patch,
    path = "/cancellations/{request_id}",
    params(("request_id" = i32, Path, description = "Cancellation request id")),
    request_body = DecideCancellationRequest,
    responses(
        (status = 200, description = "Decision recorded", body = CancellationRequest),
        (status = 400, description = "Invalid final refund or note"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided"),
        (status = 502, description = "Points ledger or submission update failed, nothing changed")
    ),
    tag = "Cancellations",
    security(("bearerAuth" = []))
)]
pub async fn decide_cancellation(
    State(state): State<AppState>,
    Extension(user): Extension<UserPermissions>,
    Path(request_id): Path<i32>,
    Json(payload): Json<DecideCancellationRequest>,
) -> Result<ApiResponse<CancellationRequest>, ApiResponse<()>> {
    user.require_admin()?;
    let request = state
        .cancellations
        .decide(user.user_id, request_id, payload)
        .await?;
    let message = match request.status {
        CancellationStatus::Approved => "Cancellation approved",
        _ => "Cancellation rejected",
    };
    Ok(ApiResponse::success(StatusCode::OK, message, request))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        preview_refund,
        create_cancellation,
        list_cancellations,
        get_cancellation,
        decide_cancellation
    ),
    components(schemas(
        CancellationRequest,
        CancellationView,
        CancellationStatus,
        NewCancellationRequest,
        DecideCancellationRequest,
        Decision,
        RefundBreakdown,
        SubmissionType,
        SubmissionStatus
    )),
    tags((name = "Cancellations", description = "Mid-campaign cancellation and refund workflow"))
)]
pub struct CancellationDoc;
