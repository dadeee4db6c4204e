//! In-process `Store` for tests.
//!
//! Every operation runs under one lock. Decisions are applied to a copy of
//! the state and swapped in only when every step succeeded, which gives the
//! same all-or-nothing behavior as a Postgres transaction.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::db::models::cancellation::{
    CancellationFilter, CancellationRequest, CancellationStatus, NewCancellation,
};
use crate::db::models::ledger::{LedgerCredit, PointTransaction, PointsSummary};
use crate::db::models::notification::{NewNotification, Notification, NotificationScope};
use crate::db::models::submission::{SubmissionSnapshot, SubmissionStatus, SubmissionType};
use crate::db::models::user::User;
use crate::db::store::{CreatePlan, DecidePlan, DecisionOutcome, Store};
use crate::services::error::{InvalidState, ServiceError, ServiceResult};

#[derive(Default, Clone)]
struct State {
    submissions: BTreeMap<(SubmissionType, i32), SubmissionSnapshot>,
    requests: BTreeMap<i32, CancellationRequest>,
    balances: BTreeMap<i32, i64>,
    transactions: Vec<PointTransaction>,
    notifications: Vec<(NewNotification, Notification)>,
    users: BTreeMap<i32, User>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Mirrors the Postgres ledger append: idempotent per reference.
    fn append_credit(&mut self, credit: &LedgerCredit) -> PointTransaction {
        if let Some(existing) = self.transactions.iter().find(|t| t.reference == credit.reference) {
            return existing.clone();
        }
        let balance = self.balances.entry(credit.client_id).or_insert(0);
        *balance += credit.amount;
        let balance_after = *balance;
        let entry = PointTransaction {
            id: self.next_id(),
            client_id: credit.client_id,
            amount: credit.amount,
            balance_after,
            transaction_type: credit.transaction_type,
            reference: credit.reference.clone(),
            description: credit.description.clone(),
            created_at: Utc::now().naive_utc(),
        };
        self.transactions.push(entry.clone());
        entry
    }

    fn insert_request(&mut self, new: NewCancellation) -> CancellationRequest {
        let request = CancellationRequest {
            id: self.next_id(),
            client_id: new.client_id,
            submission_type: new.submission_type,
            submission_id: new.submission_id,
            business_name: new.business_name,
            total_points: new.total_points,
            total_count: new.total_count,
            completed_count: new.completed_count,
            progress_rate: new.progress_rate,
            fee_rate_bps: new.fee_rate_bps,
            calculated_refund: new.calculated_refund,
            final_refund: None,
            status: CancellationStatus::Pending,
            prior_status: new.prior_status,
            reason: new.reason,
            admin_response: None,
            decided_by: None,
            created_at: Utc::now().naive_utc(),
            decided_at: None,
        };
        self.requests.insert(request.id, request.clone());
        request
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_on_credit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next ledger credits fail, as an unreachable ledger would.
    pub fn set_fail_on_credit(&self, fail: bool) {
        self.fail_on_credit.store(fail, Ordering::SeqCst);
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_submission(
        &self,
        submission_type: SubmissionType,
        client_id: i32,
        business_name: &str,
        status: SubmissionStatus,
        total_points: i64,
        total_count: i32,
        completed_count: i32,
    ) -> i32 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.submissions.insert(
            (submission_type, id),
            SubmissionSnapshot {
                id,
                client_id,
                status,
                business_name: business_name.to_string(),
                total_points,
                total_count,
                completed_count,
                cancellation_requested: false,
            },
        );
        id
    }

    /// Drops a submission row, as a concurrent purge would.
    pub async fn remove_submission(&self, submission_type: SubmissionType, submission_id: i32) {
        self.state.lock().await.submissions.remove(&(submission_type, submission_id));
    }

    /// `password_hash` must already be a bcrypt hash.
    pub async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        account_locked: bool,
    ) -> i32 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                role: role.to_string(),
                account_locked,
                created_at: Some(Utc::now().naive_utc()),
            },
        );
        id
    }

    pub async fn notification_count(&self) -> usize {
        self.state.lock().await.notifications.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> ServiceResult<()> {
        Ok(())
    }

    async fn find_submission(
        &self,
        submission_type: SubmissionType,
        submission_id: i32,
    ) -> ServiceResult<Option<SubmissionSnapshot>> {
        let state = self.state.lock().await;
        Ok(state.submissions.get(&(submission_type, submission_id)).cloned())
    }

    async fn create_cancellation(
        &self,
        submission_type: SubmissionType,
        submission_id: i32,
        plan: CreatePlan<'_>,
    ) -> ServiceResult<CancellationRequest> {
        let mut state = self.state.lock().await;
        let key = (submission_type, submission_id);
        let snapshot = state.submissions.get(&key).cloned().ok_or_else(|| {
            ServiceError::NotFound(format!("{} submission {}", submission_type, submission_id))
        })?;

        let new = plan(&snapshot)?;

        let already_pending = state.requests.values().any(|r| {
            r.submission_type == submission_type
                && r.submission_id == submission_id
                && r.status == CancellationStatus::Pending
        });
        if already_pending {
            return Err(InvalidState::AlreadyRequested.into());
        }

        let request = state.insert_request(new);
        if let Some(submission) = state.submissions.get_mut(&key) {
            submission.cancellation_requested = true;
        }
        Ok(request)
    }

    async fn find_cancellation(
        &self,
        request_id: i32,
    ) -> ServiceResult<Option<CancellationRequest>> {
        Ok(self.state.lock().await.requests.get(&request_id).cloned())
    }

    async fn list_cancellations(
        &self,
        filter: CancellationFilter,
    ) -> ServiceResult<Vec<CancellationRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .rev()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.client_id.map_or(true, |c| r.client_id == c))
            .cloned()
            .collect())
    }

    async fn decide_cancellation(
        &self,
        request_id: i32,
        plan: DecidePlan<'_>,
    ) -> ServiceResult<DecisionOutcome> {
        let mut guard = self.state.lock().await;
        let current = guard
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("cancellation request {}", request_id)))?;

        let record = plan(&current)?;

        let mut next = guard.clone();
        let mut request = current;
        request.status = record.status;
        request.final_refund = record.final_refund;
        request.admin_response = record.admin_response;
        request.decided_by = Some(record.decided_by);
        request.decided_at = Some(Utc::now().naive_utc());
        next.requests.insert(request.id, request.clone());

        let credit = match (request.status, request.final_refund) {
            (CancellationStatus::Approved, Some(amount)) => {
                if self.fail_on_credit.load(Ordering::SeqCst) {
                    return Err(ServiceError::DependencyFailure(
                        "points ledger unavailable".to_string(),
                    ));
                }
                Some(next.append_credit(&LedgerCredit::cancellation_refund(
                    request.client_id,
                    request.id,
                    amount,
                    &request.business_name,
                )))
            }
            _ => None,
        };

        let submission = next
            .submissions
            .get_mut(&(request.submission_type, request.submission_id))
            .ok_or_else(|| {
                ServiceError::DependencyFailure(format!(
                    "{} submission {} disappeared",
                    request.submission_type, request.submission_id
                ))
            })?;
        submission.cancellation_requested = false;
        submission.status = if request.status == CancellationStatus::Approved {
            SubmissionStatus::Cancelled
        } else {
            request.prior_status
        };

        *guard = next;
        Ok(DecisionOutcome { request, credit })
    }

    async fn points_summary(&self, client_id: i32) -> ServiceResult<PointsSummary> {
        let state = self.state.lock().await;
        Ok(PointsSummary {
            client_id,
            balance: state.balances.get(&client_id).copied().unwrap_or(0),
            transactions: state
                .transactions
                .iter()
                .rev()
                .filter(|t| t.client_id == client_id)
                .cloned()
                .collect(),
        })
    }

    async fn insert_notification(&self, notification: &NewNotification) -> ServiceResult<i32> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let stored = Notification {
            id,
            title: notification.title.clone(),
            body: notification.body.clone(),
            type_field: notification.type_field.clone(),
            action_type: notification.action_type.clone(),
            action_data: notification.action_data.clone(),
            dismissible: notification.dismissible,
            created_at: Utc::now().naive_utc(),
            expires_at: notification.expires_at,
        };
        state.notifications.push((notification.clone(), stored));
        Ok(id)
    }

    async fn notifications_for_user(&self, user_id: i32) -> ServiceResult<Vec<Notification>> {
        let state = self.state.lock().await;
        let is_admin = state.users.get(&user_id).is_some_and(|u| u.role == "admin");
        let now = Utc::now().naive_utc();
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|(_, stored)| stored.expires_at.map_or(true, |at| at > now))
            .filter(|(new, _)| {
                new.targets.iter().any(|t| match t.scope {
                    NotificationScope::User => t.target_id == Some(user_id),
                    NotificationScope::Admins => is_admin,
                })
            })
            .map(|(_, stored)| stored.clone())
            .collect())
    }

    async fn find_user(&self, user_id: i32) -> ServiceResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }
}
