// src/db/models/submission.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Product categories a client can order. Each maps to its own submission table.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "submission_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    /// Place-traffic reward campaigns
    Reward,
    ReceiptReview,
    KakaomapReview,
    BlogDistribution,
    /// Influencer/blogger experience campaigns
    Experience,
}

impl SubmissionType {
    pub const ALL: [SubmissionType; 5] = [
        SubmissionType::Reward,
        SubmissionType::ReceiptReview,
        SubmissionType::KakaomapReview,
        SubmissionType::BlogDistribution,
        SubmissionType::Experience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionType::Reward => "reward",
            SubmissionType::ReceiptReview => "receipt_review",
            SubmissionType::KakaomapReview => "kakaomap_review",
            SubmissionType::BlogDistribution => "blog_distribution",
            SubmissionType::Experience => "experience",
        }
    }

    /// Backing table. Only ever interpolated from this closed set.
    pub fn table_name(&self) -> &'static str {
        match self {
            SubmissionType::Reward => "reward_submissions",
            SubmissionType::ReceiptReview => "receipt_review_submissions",
            SubmissionType::KakaomapReview => "kakaomap_review_submissions",
            SubmissionType::BlogDistribution => "blog_distribution_submissions",
            SubmissionType::Experience => "experience_submissions",
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown submission type '{0}'")]
pub struct UnknownSubmissionType(pub String);

impl FromStr for SubmissionType {
    type Err = UnknownSubmissionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSubmissionType(s.to_string()))
    }
}

/// Operational status of a submission row.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
}

impl SubmissionStatus {
    /// Completed, cancelled and rejected orders have nothing left to refund.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Pending | SubmissionStatus::Approved | SubmissionStatus::InProgress
        )
    }
}

/// The slice of a submission row the cancellation workflow reads.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct SubmissionSnapshot {
    pub id: i32,
    pub client_id: i32,
    pub status: SubmissionStatus,
    pub business_name: String,
    pub total_points: i64,
    pub total_count: i32,
    pub completed_count: i32,
    pub cancellation_requested: bool,
}
