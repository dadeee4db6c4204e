// src/db/models/ledger.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "point_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PointTransactionType {
    Charge,
    Deduction,
    CancellationRefund,
}

/// One append-only entry in a client's point ledger.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct PointTransaction {
    pub id: i32,
    pub client_id: i32,
    pub amount: i64,
    pub balance_after: i64,
    pub transaction_type: PointTransactionType,
    /// Idempotency key, e.g. `cancellation:42`
    pub reference: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Input to the single ledger-append operation.
#[derive(Debug, Clone)]
pub struct LedgerCredit {
    pub client_id: i32,
    pub amount: i64,
    pub transaction_type: PointTransactionType,
    pub reference: String,
    pub description: Option<String>,
}

impl LedgerCredit {
    pub fn cancellation_refund(client_id: i32, request_id: i32, amount: i64, business_name: &str) -> Self {
        Self {
            client_id,
            amount,
            transaction_type: PointTransactionType::CancellationRefund,
            reference: cancellation_reference(request_id),
            description: Some(format!("Cancellation refund for '{}'", business_name)),
        }
    }
}

pub fn cancellation_reference(request_id: i32) -> String {
    format!("cancellation:{}", request_id)
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct PointsSummary {
    pub client_id: i32,
    pub balance: i64,
    pub transactions: Vec<PointTransaction>,
}
