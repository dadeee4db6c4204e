// src/db/models/notification.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Clone, Debug, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub type_field: String, // Use type_field instead of r#type
    pub action_type: Option<String>,
    pub action_data: Option<Value>,
    pub dismissible: bool,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub enum NotificationScope {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admins")]
    Admins,
}

impl NotificationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationScope::User => "user",
            NotificationScope::Admins => "admins",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct NotificationTargetInput {
    pub scope: NotificationScope,
    /// Ignored for the `admins` scope
    pub target_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct NewNotification {
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub type_field: String,
    pub action_type: Option<String>,
    pub action_data: Option<Value>,
    pub dismissible: bool,
    pub expires_at: Option<NaiveDateTime>,
    pub targets: Vec<NotificationTargetInput>,
}
