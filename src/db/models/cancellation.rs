// src/db/models/cancellation.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::submission::{SubmissionStatus, SubmissionType};
use crate::services::refund::RefundBreakdown;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cancellation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    Pending,
    Approved,
    Rejected,
}

impl CancellationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationStatus::Pending => "pending",
            CancellationStatus::Approved => "approved",
            CancellationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CancellationStatus::Pending)
    }
}

/// A client's request to cancel one submission, plus the admin's decision.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow, ToSchema)]
pub struct CancellationRequest {
    pub id: i32,
    pub client_id: i32,
    pub submission_type: SubmissionType,
    pub submission_id: i32,
    pub business_name: String,
    pub total_points: i64,
    pub total_count: i32,
    pub completed_count: i32,
    pub progress_rate: f64,
    /// Fee rate in effect at creation, in basis points.
    pub fee_rate_bps: i32,
    /// Suggestion computed at creation. Never rewritten.
    pub calculated_refund: i64,
    /// Authoritative amount, present only once approved.
    pub final_refund: Option<i64>,
    pub status: CancellationStatus,
    /// Submission status when the request was filed; restored on rejection.
    pub prior_status: SubmissionStatus,
    pub reason: Option<String>,
    pub admin_response: Option<String>,
    pub decided_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub decided_at: Option<NaiveDateTime>,
}

/// Row about to be inserted, built from a submission snapshot.
#[derive(Debug, Clone)]
pub struct NewCancellation {
    pub client_id: i32,
    pub submission_type: SubmissionType,
    pub submission_id: i32,
    pub business_name: String,
    pub total_points: i64,
    pub total_count: i32,
    pub completed_count: i32,
    pub progress_rate: f64,
    pub fee_rate_bps: i32,
    pub calculated_refund: i64,
    pub prior_status: SubmissionStatus,
    pub reason: Option<String>,
}

/// Outcome written onto a pending request.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub status: CancellationStatus,
    pub final_refund: Option<i64>,
    pub admin_response: Option<String>,
    pub decided_by: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for CancellationStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => CancellationStatus::Approved,
            Decision::Rejected => CancellationStatus::Rejected,
        }
    }
}

/// Payload for `POST /cancellations`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewCancellationRequest {
    pub submission_type: SubmissionType,
    pub submission_id: i32,
    pub reason: Option<String>,
}

/// Payload for `PATCH /cancellations/{request_id}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecideCancellationRequest {
    pub decision: Decision,
    pub final_refund: Option<i64>,
    pub admin_response: Option<String>,
}

/// Query string for `GET /cancellations`
#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCancellationsQuery {
    pub status: Option<CancellationStatus>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CancellationFilter {
    pub status: Option<CancellationStatus>,
    pub client_id: Option<i32>,
}

/// A request together with the breakdown recomputed from its stored inputs,
/// including the fee rate recorded at creation.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct CancellationView {
    #[serde(flatten)]
    pub request: CancellationRequest,
    pub breakdown: RefundBreakdown,
}
