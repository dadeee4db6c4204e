//! Storage seam for the cancellation workflow.

use async_trait::async_trait;

use crate::db::models::cancellation::{
    CancellationFilter, CancellationRequest, DecisionRecord, NewCancellation,
};
use crate::db::models::ledger::{PointTransaction, PointsSummary};
use crate::db::models::notification::{NewNotification, Notification};
use crate::db::models::submission::{SubmissionSnapshot, SubmissionType};
use crate::db::models::user::User;
use crate::services::error::ServiceResult;

/// Inspects a locked submission and either refuses or describes the request to insert.
pub type CreatePlan<'a> =
    &'a (dyn Fn(&SubmissionSnapshot) -> ServiceResult<NewCancellation> + Send + Sync);

/// Inspects a locked request and either refuses or describes the decision to record.
pub type DecidePlan<'a> =
    &'a (dyn Fn(&CancellationRequest) -> ServiceResult<DecisionRecord> + Send + Sync);

/// Result of a committed decision.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub request: CancellationRequest,
    /// Ledger entry for an approval. `None` on rejection.
    pub credit: Option<PointTransaction>,
}

/// Persistence used by the services.
///
/// `create_cancellation` and `decide_cancellation` are each one atomic unit:
/// the plan runs against a locked row, and every write it implies (request
/// row, submission flag/status, ledger entry and balance) commits together or
/// not at all.
///
/// # Implementations
///
/// - `PgStore`: PostgreSQL, one transaction per operation
/// - `MemoryStore`: in-process, used by tests
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> ServiceResult<()>;

    async fn find_submission(
        &self,
        submission_type: SubmissionType,
        submission_id: i32,
    ) -> ServiceResult<Option<SubmissionSnapshot>>;

    /// Fails with `NotFound` when the submission is missing and with
    /// `InvalidState::AlreadyRequested` when a pending request already exists.
    async fn create_cancellation(
        &self,
        submission_type: SubmissionType,
        submission_id: i32,
        plan: CreatePlan<'_>,
    ) -> ServiceResult<CancellationRequest>;

    async fn find_cancellation(
        &self,
        request_id: i32,
    ) -> ServiceResult<Option<CancellationRequest>>;

    /// Newest first.
    async fn list_cancellations(
        &self,
        filter: CancellationFilter,
    ) -> ServiceResult<Vec<CancellationRequest>>;

    /// Any failure after the plan succeeds rolls the whole decision back.
    async fn decide_cancellation(
        &self,
        request_id: i32,
        plan: DecidePlan<'_>,
    ) -> ServiceResult<DecisionOutcome>;

    async fn points_summary(&self, client_id: i32) -> ServiceResult<PointsSummary>;

    async fn insert_notification(&self, notification: &NewNotification) -> ServiceResult<i32>;

    async fn notifications_for_user(&self, user_id: i32) -> ServiceResult<Vec<Notification>>;

    async fn find_user(&self, user_id: i32) -> ServiceResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> ServiceResult<Option<User>>;
}
