use chrono::Utc;
use serde_json::{json, Value};

use crate::db::models::cancellation::{CancellationRequest, CancellationStatus};
use crate::db::models::notification::{NewNotification, NotificationScope, NotificationTargetInput};
use crate::db::store::Store;
use crate::services::error::{ServiceError, ServiceResult};

/// Notification builder for creating system notifications
pub struct NotificationBuilder {
    title: String,
    body: Option<String>,
    notification_type: String,
    targets: Vec<NotificationTargetInput>,
    action_type: Option<String>,
    action_data: Option<Value>,
    dismissible: bool,
    expires_in_days: Option<i64>,
}

impl NotificationBuilder {
    /// Create a new notification builder with required fields
    pub fn new(title: impl Into<String>, notification_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            notification_type: notification_type.into(),
            targets: Vec::new(),
            action_type: None,
            action_data: None,
            dismissible: true,
            expires_in_days: Some(14), // Default to 14 days
        }
    }

    /// Set notification body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a target user to the notification
    pub fn target_user(mut self, user_id: i32) -> Self {
        self.targets.push(NotificationTargetInput {
            scope: NotificationScope::User,
            target_id: Some(user_id),
        });
        self
    }

    /// Address every administrator
    pub fn target_admins(mut self) -> Self {
        self.targets.push(NotificationTargetInput {
            scope: NotificationScope::Admins,
            target_id: None,
        });
        self
    }

    /// Set the action type and data for when notification is clicked
    pub fn action(mut self, action_type: impl Into<String>, action_data: Value) -> Self {
        self.action_type = Some(action_type.into());
        self.action_data = Some(action_data);
        self
    }

    pub fn dismissible(mut self, dismissible: bool) -> Self {
        self.dismissible = dismissible;
        self
    }

    /// Set expiration time in days (None means no expiration)
    pub fn expires_in_days(mut self, days: Option<i64>) -> Self {
        self.expires_in_days = days;
        self
    }

    pub fn build(self) -> ServiceResult<NewNotification> {
        if self.targets.is_empty() {
            return Err(ServiceError::validation(
                "targets",
                "At least one target is required",
            ));
        }

        let expires_at = self
            .expires_in_days
            .map(|days| (Utc::now() + chrono::Duration::days(days)).naive_utc());

        Ok(NewNotification {
            title: self.title,
            body: self.body,
            type_field: self.notification_type,
            action_type: self.action_type,
            action_data: self.action_data,
            dismissible: self.dismissible,
            expires_at,
            targets: self.targets,
        })
    }

    /// Build and send the notification
    pub async fn send(self, store: &dyn Store) -> ServiceResult<i32> {
        let notification = self.build()?;
        store.insert_notification(&notification).await
    }
}

/// Common notification types for system usage
pub mod notification_types {
    pub const CANCELLATION_REQUESTED: &str = "cancellation_requested";
    pub const CANCELLATION_APPROVED: &str = "cancellation_approved";
    pub const CANCELLATION_REJECTED: &str = "cancellation_rejected";
}

pub async fn notify_cancellation_requested(
    store: &dyn Store,
    request: &CancellationRequest,
) -> ServiceResult<i32> {
    NotificationBuilder::new(
        format!("Cancellation Request: {}", request.business_name),
        notification_types::CANCELLATION_REQUESTED,
    )
    .body(format!(
        "{} submission #{} is {:.2}% complete. Suggested refund: {} points.",
        request.submission_type, request.submission_id, request.progress_rate, request.calculated_refund
    ))
    .target_admins()
    .action(
        "review_cancellation",
        json!({
            "request_id": request.id,
            "submission_type": request.submission_type,
            "submission_id": request.submission_id,
        }),
    )
    .dismissible(false)
    .expires_in_days(None)
    .send(store)
    .await
}

pub async fn notify_cancellation_decided(
    store: &dyn Store,
    request: &CancellationRequest,
) -> ServiceResult<i32> {
    let (title, notification_type, body) = match (request.status, request.final_refund) {
        (CancellationStatus::Approved, Some(refund)) => (
            format!("Cancellation Approved: {}", request.business_name),
            notification_types::CANCELLATION_APPROVED,
            format!("{} points have been refunded to your balance.", refund),
        ),
        _ => (
            format!("Cancellation Rejected: {}", request.business_name),
            notification_types::CANCELLATION_REJECTED,
            "Your submission continues as before.".to_string(),
        ),
    };

    let body = match request.admin_response.as_deref() {
        Some(note) => format!("{} Note from the administrator: {}", body, note),
        None => body,
    };

    NotificationBuilder::new(title, notification_type)
        .body(body)
        .target_user(request.client_id)
        .action(
            "view_cancellation",
            json!({ "request_id": request.id }),
        )
        .send(store)
        .await
}
