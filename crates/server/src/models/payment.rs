//! M-Pesa payment attempt models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use solarshop_core::{OrderId, PaymentAttemptStatus, PaymentId, UserId};

/// One STK push sent to a customer's phone.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentAttempt {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub phone: String,
    pub amount: Decimal,
    pub merchant_request_id: Option<String>,
    pub checkout_request_id: Option<String>,
    pub status: PaymentAttemptStatus,
    pub result_code: Option<i32>,
    pub result_desc: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkPushRequest {
    pub order_id: OrderId,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StkPushAccepted {
    pub payment_id: PaymentId,
    pub checkout_request_id: String,
    pub customer_message: String,
}

/// Outcome of an STK push as reported by callback or status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    pub receipt: Option<String>,
}

impl PaymentResult {
    #[must_use]
    pub const fn status(&self) -> PaymentAttemptStatus {
        PaymentAttemptStatus::from_result_code(self.result_code)
    }
}
