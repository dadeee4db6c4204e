//! Cancellation request workflow: `pending → approved | rejected`.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::db::models::cancellation::{
    CancellationFilter, CancellationRequest, CancellationStatus, CancellationView,
    DecideCancellationRequest, Decision, DecisionRecord, NewCancellation,
};
use crate::db::models::submission::{SubmissionSnapshot, SubmissionType};
use crate::db::store::{DecisionOutcome, Store};
use crate::services::error::{InvalidState, ServiceError, ServiceResult};
use crate::services::refund::{calculate_refund, FeeRate, FeeSchedule, RefundBreakdown};
use crate::utils::notification;

const MAX_NOTE_LEN: usize = 1000;

#[derive(Clone)]
pub struct CancellationService {
    store: Arc<dyn Store>,
    fees: FeeSchedule,
}

impl CancellationService {
    pub fn new(store: Arc<dyn Store>, fees: FeeSchedule) -> Self {
        Self { store, fees }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// What the client would be offered if they cancelled now. Mutates nothing.
    #[instrument(skip(self))]
    pub async fn preview(
        &self,
        client_id: i32,
        submission_type: SubmissionType,
        submission_id: i32,
    ) -> ServiceResult<RefundBreakdown> {
        validate_submission_id(submission_id)?;
        let snapshot = self
            .store
            .find_submission(submission_type, submission_id)
            .await?
            .filter(|s| s.client_id == client_id)
            .ok_or_else(|| submission_not_found(submission_type, submission_id))?;

        ensure_cancellable(&snapshot)?;
        Ok(self.fees.breakdown(
            submission_type,
            snapshot.total_points,
            snapshot.total_count,
            snapshot.completed_count,
        ))
    }

    #[instrument(skip(self, reason))]
    pub async fn create(
        &self,
        client_id: i32,
        submission_type: SubmissionType,
        submission_id: i32,
        reason: Option<String>,
    ) -> ServiceResult<CancellationRequest> {
        validate_submission_id(submission_id)?;
        let reason = normalize_note("reason", reason)?;
        let fees = self.fees;

        let plan = move |snapshot: &SubmissionSnapshot| -> ServiceResult<NewCancellation> {
            if snapshot.client_id != client_id {
                return Err(submission_not_found(submission_type, submission_id));
            }
            ensure_cancellable(snapshot)?;

            let fee_rate = fees.rate_for(submission_type);
            let breakdown = calculate_refund(
                snapshot.total_points,
                snapshot.total_count,
                snapshot.completed_count,
                fee_rate,
            );
            // the calculator's clamped figures, so the row satisfies its own checks
            Ok(NewCancellation {
                client_id,
                submission_type,
                submission_id,
                business_name: snapshot.business_name.clone(),
                total_points: breakdown.total_points,
                total_count: snapshot.total_count.max(0),
                completed_count: snapshot.completed_count.max(0),
                progress_rate: breakdown.progress_rate,
                fee_rate_bps: fee_rate.stored(),
                calculated_refund: breakdown.calculated_refund,
                prior_status: snapshot.status,
                reason: reason.clone(),
            })
        };

        let request = self
            .store
            .create_cancellation(submission_type, submission_id, &plan)
            .await
            .inspect_err(|e| warn!(error = %e, "cancellation request refused"))?;

        info!(
            request_id = request.id,
            calculated_refund = request.calculated_refund,
            "cancellation requested"
        );

        if let Err(e) =
            notification::notify_cancellation_requested(self.store.as_ref(), &request).await
        {
            warn!(request_id = request.id, error = %e, "failed to notify admins");
        }

        Ok(request)
    }

    #[instrument(skip(self, payload), fields(decision = ?payload.decision))]
    pub async fn decide(
        &self,
        admin_id: i32,
        request_id: i32,
        payload: DecideCancellationRequest,
    ) -> ServiceResult<CancellationRequest> {
        let admin_response = normalize_note("admin_response", payload.admin_response)?;
        let decision = payload.decision;
        let final_refund = match decision {
            Decision::Approved => {
                let amount = payload.final_refund.ok_or_else(|| {
                    ServiceError::validation("final_refund", "required when approving")
                })?;
                if amount < 0 {
                    return Err(ServiceError::validation("final_refund", "must not be negative"));
                }
                Some(amount)
            }
            Decision::Rejected => None,
        };

        let plan = move |request: &CancellationRequest| -> ServiceResult<DecisionRecord> {
            if request.status.is_terminal() {
                return Err(InvalidState::AlreadyDecided(request.status).into());
            }
            if let Some(amount) = final_refund {
                if amount > request.total_points {
                    return Err(ServiceError::validation(
                        "final_refund",
                        format!("must be between 0 and {}", request.total_points),
                    ));
                }
            }
            Ok(DecisionRecord {
                status: CancellationStatus::from(decision),
                final_refund,
                admin_response: admin_response.clone(),
                decided_by: admin_id,
            })
        };

        let DecisionOutcome { request, credit } = self
            .store
            .decide_cancellation(request_id, &plan)
            .await
            .inspect_err(|e| warn!(error = %e, "cancellation decision refused"))?;

        info!(
            request_id = request.id,
            status = ?request.status,
            final_refund = ?request.final_refund,
            ledger_entry = ?credit.as_ref().map(|c| c.id),
            "cancellation decided"
        );

        if let Err(e) =
            notification::notify_cancellation_decided(self.store.as_ref(), &request).await
        {
            warn!(request_id = request.id, error = %e, "failed to notify client");
        }

        Ok(request)
    }

    pub async fn list(&self, filter: CancellationFilter) -> ServiceResult<Vec<CancellationView>> {
        let requests = self.store.list_cancellations(filter).await?;
        Ok(requests.into_iter().map(|r| self.view(r)).collect())
    }

    /// `viewer` restricts the lookup to one client's requests.
    pub async fn get(
        &self,
        request_id: i32,
        viewer: Option<i32>,
    ) -> ServiceResult<CancellationView> {
        let request = self
            .store
            .find_cancellation(request_id)
            .await?
            .filter(|r| viewer.map_or(true, |client_id| r.client_id == client_id))
            .ok_or_else(|| ServiceError::NotFound(format!("cancellation request {}", request_id)))?;
        Ok(self.view(request))
    }

    /// Rebuilds the breakdown with the rate recorded on the request, so it
    /// reproduces `calculated_refund` whatever the current schedule says.
    fn view(&self, request: CancellationRequest) -> CancellationView {
        let fee_rate = FeeRate::from_stored(request.fee_rate_bps).unwrap_or_else(|| {
            warn!(
                request_id = request.id,
                fee_rate_bps = request.fee_rate_bps,
                "stored fee rate out of range, using current schedule"
            );
            self.fees.rate_for(request.submission_type)
        });
        let breakdown = calculate_refund(
            request.total_points,
            request.total_count,
            request.completed_count,
            fee_rate,
        );
        CancellationView { request, breakdown }
    }
}

fn ensure_cancellable(snapshot: &SubmissionSnapshot) -> ServiceResult<()> {
    if !snapshot.status.is_cancellable() {
        return Err(InvalidState::SubmissionNotCancellable(snapshot.status).into());
    }
    if snapshot.cancellation_requested {
        return Err(InvalidState::AlreadyRequested.into());
    }
    Ok(())
}

fn validate_submission_id(submission_id: i32) -> ServiceResult<()> {
    if submission_id <= 0 {
        return Err(ServiceError::validation("submission_id", "must be a positive id"));
    }
    Ok(())
}

fn submission_not_found(submission_type: SubmissionType, submission_id: i32) -> ServiceError {
    ServiceError::NotFound(format!("{} submission {}", submission_type, submission_id))
}

/// Trims free text; blank becomes `None`.
fn normalize_note(field: &'static str, note: Option<String>) -> ServiceResult<Option<String>> {
    let Some(note) = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ServiceError::validation(
            field,
            format!("must be at most {} characters", MAX_NOTE_LEN),
        ));
    }
    Ok(Some(note))
}
