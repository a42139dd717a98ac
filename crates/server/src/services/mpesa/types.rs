//! Daraja API wire types.
//!
//! Safaricom uses `PascalCase` field names with a few irregular spellings
//! (`CallBackURL`, `stkCallback`), so most fields are renamed explicitly.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::models::payment::PaymentResult;

/// `GET /oauth/v1/generate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Seconds, sent as a string.
    #[serde(default)]
    pub expires_in: Option<String>,
}

/// `POST /mpesa/stkpush/v1/processrequest` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: &'static str,
    pub amount: u64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// Successful STK push acknowledgement. The customer has not paid yet.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode", deserialize_with = "code_as_string")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

/// `POST /mpesa/stkpushquery/v1/query` body.
#[derive(Debug, Clone, Serialize)]
pub struct StkQueryPayload {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
}

/// Status query response. `ResultCode` arrives as a string here.
#[derive(Debug, Clone, Deserialize)]
pub struct StkQueryResponse {
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode", deserialize_with = "code_as_string")]
    pub result_code: String,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
}

impl StkQueryResponse {
    /// Convert to a payment result. Unparseable codes count as failures.
    #[must_use]
    pub fn into_result(self) -> PaymentResult {
        let result_code = self.result_code.trim().parse::<i64>().unwrap_or(-1);
        PaymentResult {
            checkout_request_id: self.checkout_request_id,
            result_code,
            result_desc: self.result_desc,
            receipt: None,
        }
    }
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "errorCode", default)]
    pub error_code: String,
    #[serde(rename = "errorMessage", default)]
    pub error_message: String,
}

impl ApiErrorBody {
    /// Daraja answers status queries for in-flight pushes with this code.
    #[must_use]
    pub fn is_still_processing(&self) -> bool {
        self.error_code == "500.001.1001"
    }
}

// =============================================================================
// Callback
// =============================================================================

/// Body Safaricom posts to the callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata", default)]
    pub metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<JsonValue>,
}

impl StkCallback {
    /// Look up a metadata item by name.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&JsonValue> {
        self.metadata
            .as_ref()?
            .items
            .iter()
            .find(|i| i.name == name)?
            .value
            .as_ref()
    }

    #[must_use]
    pub fn into_result(self) -> PaymentResult {
        let receipt = self.item("MpesaReceiptNumber").map(|v| match v {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        });
        PaymentResult {
            checkout_request_id: self.checkout_request_id,
            result_code: self.result_code,
            result_desc: self.result_desc,
            receipt,
        }
    }
}

/// Response the callback endpoint always sends back.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: &'static str,
}

impl CallbackAck {
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted",
        }
    }
}

/// Accept `"0"` or `0`; Daraja is inconsistent between endpoints.
fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
