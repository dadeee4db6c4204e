//! Suggested-refund calculation for cancelled submissions.
//!
//! All money arithmetic is integer. Progress is only expressed as a float
//! for display; the points attributed to delivered work are derived from
//! the raw counts so a 33.33% display value never rounds into the amount.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::submission::SubmissionType;

const BPS_PER_UNIT: i128 = 10_000;

/// Service fee rate in basis points (1000 = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FeeRate(u32);

impl FeeRate {
    pub const MAX_BPS: u32 = 10_000;

    pub fn from_bps(bps: u32) -> Option<Self> {
        (bps <= Self::MAX_BPS).then_some(Self(bps))
    }

    /// Reads a rate back from an `INTEGER` column.
    pub fn from_stored(bps: i32) -> Option<Self> {
        u32::try_from(bps).ok().and_then(Self::from_bps)
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// Column value; always fits since `MAX_BPS` does.
    pub fn stored(&self) -> i32 {
        self.0 as i32
    }

    pub fn percent(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Fee rate per product category. Every category must carry a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub reward: FeeRate,
    pub receipt_review: FeeRate,
    pub kakaomap_review: FeeRate,
    pub blog_distribution: FeeRate,
    pub experience: FeeRate,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            reward: FeeRate(1_000),
            receipt_review: FeeRate(1_000),
            kakaomap_review: FeeRate(1_000),
            blog_distribution: FeeRate(1_000),
            experience: FeeRate(1_500),
        }
    }
}

impl FeeSchedule {
    pub fn rate_for(&self, submission_type: SubmissionType) -> FeeRate {
        match submission_type {
            SubmissionType::Reward => self.reward,
            SubmissionType::ReceiptReview => self.receipt_review,
            SubmissionType::KakaomapReview => self.kakaomap_review,
            SubmissionType::BlogDistribution => self.blog_distribution,
            SubmissionType::Experience => self.experience,
        }
    }

    pub fn set(&mut self, submission_type: SubmissionType, rate: FeeRate) {
        let slot = match submission_type {
            SubmissionType::Reward => &mut self.reward,
            SubmissionType::ReceiptReview => &mut self.receipt_review,
            SubmissionType::KakaomapReview => &mut self.kakaomap_review,
            SubmissionType::BlogDistribution => &mut self.blog_distribution,
            SubmissionType::Experience => &mut self.experience,
        };
        *slot = rate;
    }

    pub fn breakdown(
        &self,
        submission_type: SubmissionType,
        total_points: i64,
        total_count: i32,
        completed_count: i32,
    ) -> RefundBreakdown {
        calculate_refund(
            total_points,
            total_count,
            completed_count,
            self.rate_for(submission_type),
        )
    }
}

/// Every intermediate value of the refund derivation, for display and audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RefundBreakdown {
    pub total_points: i64,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub progress_rate: f64,
    pub completed_points: i64,
    pub remaining_points: i64,
    pub fee_rate_bps: u32,
    pub fee: i64,
    pub calculated_refund: i64,
}

/// Computes the suggested refund.
///
/// Delivered units are clamped to `total_count`; a submission with no planned
/// units counts as 0% delivered. Negative inputs are treated as zero.
pub fn calculate_refund(
    total_points: i64,
    total_count: i32,
    completed_count: i32,
    fee_rate: FeeRate,
) -> RefundBreakdown {
    let total_points = total_points.max(0);
    let total_count = i64::from(total_count.max(0));
    let delivered = i64::from(completed_count.max(0)).min(total_count);

    let (progress_rate, completed_points) = if total_count > 0 {
        let rate = (delivered as f64 / total_count as f64 * 10_000.0).round() / 100.0;
        let points = i128::from(total_points) * i128::from(delivered) / i128::from(total_count);
        (rate, points as i64)
    } else {
        (0.0, 0)
    };

    let remaining_points = total_points - completed_points;
    let fee = (i128::from(remaining_points) * i128::from(fee_rate.bps()) / BPS_PER_UNIT) as i64;
    let calculated_refund = (remaining_points - fee).clamp(0, total_points);

    RefundBreakdown {
        total_points,
        progress_rate,
        completed_points,
        remaining_points,
        fee_rate_bps: fee_rate.bps(),
        fee,
        calculated_refund,
    }
}
