//! PostgreSQL `Store`. Each mutating operation is one transaction; returning
//! early drops the transaction, which rolls it back.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::cancellation::{
    CancellationFilter, CancellationRequest, CancellationStatus,
};
use crate::db::models::ledger::{LedgerCredit, PointsSummary};
use crate::db::models::notification::{NewNotification, Notification};
use crate::db::models::submission::{SubmissionSnapshot, SubmissionStatus, SubmissionType};
use crate::db::models::user::User;
use crate::db::queries::{cancellation, ledger, notification, submission, user};
use crate::db::store::{CreatePlan, DecidePlan, DecisionOutcome, Store};
use crate::services::error::{InvalidState, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_submission(
        &self,
        submission_type: SubmissionType,
        submission_id: i32,
    ) -> ServiceResult<Option<SubmissionSnapshot>> {
        Ok(submission::fetch_submission(&self.pool, submission_type, submission_id, false).await?)
    }

    async fn create_cancellation(
        &self,
        submission_type: SubmissionType,
        submission_id: i32,
        plan: CreatePlan<'_>,
    ) -> ServiceResult<CancellationRequest> {
        let mut tx = self.pool.begin().await?;

        let snapshot = submission::fetch_submission(&mut *tx, submission_type, submission_id, true)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("{} submission {}", submission_type, submission_id))
            })?;

        let new = plan(&snapshot)?;

        if cancellation::pending_exists(&mut *tx, submission_type, submission_id).await? {
            return Err(InvalidState::AlreadyRequested.into());
        }

        let request = cancellation::insert_request(&mut *tx, &new)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::from(InvalidState::AlreadyRequested)
                } else {
                    ServiceError::from(e)
                }
            })?;

        submission::set_cancellation_requested(&mut *tx, submission_type, submission_id, true)
            .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn find_cancellation(
        &self,
        request_id: i32,
    ) -> ServiceResult<Option<CancellationRequest>> {
        Ok(cancellation::fetch_request(&self.pool, request_id, false).await?)
    }

    async fn list_cancellations(
        &self,
        filter: CancellationFilter,
    ) -> ServiceResult<Vec<CancellationRequest>> {
        Ok(cancellation::list_requests(&self.pool, filter).await?)
    }

    async fn decide_cancellation(
        &self,
        request_id: i32,
        plan: DecidePlan<'_>,
    ) -> ServiceResult<DecisionOutcome> {
        let mut tx = self.pool.begin().await?;

        let current = cancellation::fetch_request(&mut *tx, request_id, true)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cancellation request {}", request_id)))?;

        let record = plan(&current)?;

        let Some(request) = cancellation::apply_decision(&mut *tx, request_id, &record).await?
        else {
            // decided by another writer since the lock was taken; report what it became
            let status = cancellation::fetch_request(&mut *tx, request_id, false)
                .await?
                .map(|r| r.status)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("cancellation request {}", request_id))
                })?;
            return Err(InvalidState::AlreadyDecided(status).into());
        };

        let approved = request.status == CancellationStatus::Approved;
        let credit = match request.final_refund.filter(|_| approved) {
            Some(amount) => {
                let credit = LedgerCredit::cancellation_refund(
                    request.client_id,
                    request.id,
                    amount,
                    &request.business_name,
                );
                let entry = ledger::append_entry(&mut *tx, &credit)
                    .await
                    .map_err(|e| ServiceError::DependencyFailure(format!("points ledger: {}", e)))?;
                Some(entry)
            }
            None => None,
        };

        let next_status = if approved {
            SubmissionStatus::Cancelled
        } else {
            request.prior_status
        };
        let updated = submission::close_cancellation(
            &mut *tx,
            request.submission_type,
            request.submission_id,
            next_status,
        )
        .await
        .map_err(|e| ServiceError::DependencyFailure(format!("submission update: {}", e)))?;

        if updated == 0 {
            return Err(ServiceError::DependencyFailure(format!(
                "{} submission {} no longer exists",
                request.submission_type, request.submission_id
            )));
        }

        tx.commit().await?;
        Ok(DecisionOutcome { request, credit })
    }

    async fn points_summary(&self, client_id: i32) -> ServiceResult<PointsSummary> {
        let balance = ledger::balance(&self.pool, client_id).await?;
        let transactions = ledger::transactions(&self.pool, client_id).await?;
        Ok(PointsSummary {
            client_id,
            balance,
            transactions,
        })
    }

    async fn insert_notification(&self, notification: &NewNotification) -> ServiceResult<i32> {
        Ok(notification::insert_notification(&self.pool, notification).await?)
    }

    async fn notifications_for_user(&self, user_id: i32) -> ServiceResult<Vec<Notification>> {
        Ok(notification::notifications_for_user(&self.pool, user_id).await?)
    }

    async fn find_user(&self, user_id: i32) -> ServiceResult<Option<User>> {
        Ok(user::find_user(&self.pool, user_id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        Ok(user::find_user_by_username(&self.pool, username).await?)
    }
}
