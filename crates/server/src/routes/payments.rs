//! M-Pesa STK push endpoints.
//!
//! The callback is public and always acknowledged so Safaricom stops
//! retrying; anything it cannot match is logged instead.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};

use solarshop_core::{Money, OrderId, PaymentAttemptStatus, PhoneNumber};

use crate::db::payments::NewAttempt;
use crate::db::{OrderRepository, PaymentRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::payment::{PaymentAttempt, StkPushAccepted, StkPushRequest};
use crate::services::mpesa::types::{CallbackAck, CallbackEnvelope};
use crate::services::mpesa::{self, QueryOutcome};
use crate::state::AppState;

/// Pending attempts younger than this are not queried; the callback
/// usually lands first.
const QUERY_AFTER_SECS: i64 = 15;

/// POST /api/payments/mpesa/stk-push
pub async fn stk_push(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<StkPushRequest>,
) -> Result<(StatusCode, Json<StkPushAccepted>)> {
    let client = state.mpesa()?;

    let order = OrderRepository::new(state.pool())
        .get_for_user(user.id, req.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if !order.accepts_payment() {
        return Err(AppError::Conflict(format!(
            "Order {} cannot be paid (status {}, payment {})",
            order.order_number, order.status, order.payment_status
        )));
    }

    let phone = PhoneNumber::parse_kenyan(&req.phone)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let response = client
        .stk_push(&phone, &Money::kes(order.total), &order.order_number)
        .await?;

    let attempt = PaymentRepository::new(state.pool())
        .create(&NewAttempt {
            order_id: order.id,
            user_id: user.id,
            phone: phone.as_str(),
            amount: order.total,
            merchant_request_id: &response.merchant_request_id,
            checkout_request_id: &response.checkout_request_id,
        })
        .await
        .inspect_err(|e| report_unrecorded_attempt(e, order.id, &response.checkout_request_id))?;

    add_breadcrumb("payment", "STK push sent", None);

    Ok((
        StatusCode::ACCEPTED,
        Json(StkPushAccepted {
            payment_id: attempt.id,
            checkout_request_id: response.checkout_request_id,
            customer_message: response.customer_message,
        }),
    ))
}

/// POST /api/payments/mpesa/callback
pub async fn callback(State(state): State<AppState>, body: Bytes) -> Json<CallbackAck> {
    let envelope: CallbackEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable M-Pesa callback");
            return Json(CallbackAck::accepted());
        }
    };

    let callback = envelope.body.stk_callback;
    tracing::info!(
        checkout_request_id = %callback.checkout_request_id,
        merchant_request_id = %callback.merchant_request_id,
        result_code = callback.result_code,
        "M-Pesa callback received"
    );

    let result = callback.into_result();
    match mpesa::apply_result(state.pool(), &result).await {
        Ok(Some(attempt)) => {
            tracing::info!(payment_id = %attempt.id, status = %attempt.status, "Callback applied");
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Failed to apply M-Pesa callback");
            sentry::capture_error(&e);
        }
    }

    Json(CallbackAck::accepted())
}

/// GET /api/payments/mpesa/status/{checkout_request_id}
///
/// Falls back to querying Safaricom when the callback is late.
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(checkout_request_id): Path<String>,
) -> Result<Json<PaymentAttempt>> {
    let attempt = PaymentRepository::new(state.pool())
        .get_for_user(user.id, &checkout_request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if !should_query(&attempt) {
        return Ok(Json(attempt));
    }

    let Ok(client) = state.mpesa() else {
        return Ok(Json(attempt));
    };

    match client.query(&checkout_request_id).await {
        Ok(QueryOutcome::Done(result)) => {
            let settled = mpesa::apply_result(state.pool(), &result).await?;
            Ok(Json(settled.unwrap_or(attempt)))
        }
        Ok(QueryOutcome::Pending) => Ok(Json(attempt)),
        Err(e) => {
            tracing::warn!(error = %e, "M-Pesa status query failed");
            Ok(Json(attempt))
        }
    }
}

/// The push is already on the customer's phone but its callback can't be
/// matched without the row, so it has to be reconciled by hand.
fn report_unrecorded_attempt(err: &RepositoryError, order_id: OrderId, checkout_request_id: &str) {
    tracing::error!(
        error = %err,
        order_id = %order_id,
        checkout_request_id,
        "STK push sent but the payment attempt was not recorded"
    );
    sentry::with_scope(
        |scope| {
            scope.set_tag("checkout_request_id", checkout_request_id);
            scope.set_tag("order_id", order_id);
        },
        || sentry::capture_error(err),
    );
}

fn should_query(attempt: &PaymentAttempt) -> bool {
    attempt.status == PaymentAttemptStatus::Pending
        && Utc::now() - attempt.created_at >= Duration::seconds(QUERY_AFTER_SECS)
}
