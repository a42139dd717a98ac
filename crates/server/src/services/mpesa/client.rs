//! Daraja HTTP client.
//!
//! OAuth tokens are cached with `moka` for 55 minutes; Safaricom issues
//! them for an hour.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;

use solarshop_core::{Money, PhoneNumber};

use super::MpesaError;
use super::types::{
    ApiErrorBody, StkPushPayload, StkPushResponse, StkQueryPayload, StkQueryResponse,
    TokenResponse,
};
use crate::config::MpesaConfig;
use crate::models::payment::PaymentResult;

const TOKEN_TTL: Duration = Duration::from_secs(55 * 60);
const TOKEN_KEY: &str = "access_token";
const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Outcome of a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The customer hasn't answered the prompt yet.
    Pending,
    /// Final result, same shape as a callback.
    Done(PaymentResult),
}

/// Client for Safaricom's Lipa na M-Pesa Online API.
#[derive(Clone)]
pub struct MpesaClient {
    inner: Arc<MpesaClientInner>,
}

struct MpesaClientInner {
    client: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: SecretString,
    shortcode: String,
    passkey: SecretString,
    callback_url: String,
    tokens: Cache<&'static str, String>,
}

impl MpesaClient {
    /// Create a new Daraja client.
    #[must_use]
    pub fn new(config: &MpesaConfig) -> Self {
        let tokens = Cache::builder()
            .max_capacity(1)
            .time_to_live(TOKEN_TTL)
            .build();

        Self {
            inner: Arc::new(MpesaClientInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()
                    .unwrap_or_default(),
                base_url: config.environment.base_url().to_string(),
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                shortcode: config.shortcode.clone(),
                passkey: config.passkey.clone(),
                callback_url: config.callback_url.clone(),
                tokens,
            }),
        }
    }

    /// Send an STK push prompting the customer to pay `amount`.
    ///
    /// # Errors
    ///
    /// Returns `MpesaError::InvalidAmount` if the amount is zero or negative.
    /// Returns `MpesaError::Api` if Safaricom rejects the request.
    /// Returns `MpesaError::Http` on transport failures.
    #[instrument(skip(self, phone), fields(phone = %phone.masked()))]
    pub async fn stk_push(
        &self,
        phone: &PhoneNumber,
        amount: &Money,
        account_reference: &str,
    ) -> Result<StkPushResponse, MpesaError> {
        let amount = amount
            .round_up_whole()
            .filter(|a| *a > 0)
            .ok_or(MpesaError::InvalidAmount)?;

        let timestamp = timestamp(Utc::now());
        let payload = StkPushPayload {
            business_short_code: self.inner.shortcode.clone(),
            password: self.password(&timestamp),
            timestamp,
            transaction_type: TRANSACTION_TYPE,
            amount,
            party_a: phone.as_str().to_string(),
            party_b: self.inner.shortcode.clone(),
            phone_number: phone.as_str().to_string(),
            callback_url: self.inner.callback_url.clone(),
            account_reference: account_reference.to_string(),
            transaction_desc: format!("Payment for {account_reference}"),
        };

        let response: StkPushResponse = self
            .post("/mpesa/stkpush/v1/processrequest", &payload)
            .await?;

        if response.response_code != "0" {
            return Err(MpesaError::Api {
                code: response.response_code,
                message: response.response_description,
            });
        }

        tracing::info!(
            checkout_request_id = %response.checkout_request_id,
            amount,
            "STK push accepted"
        );
        Ok(response)
    }

    /// Ask Safaricom for the result of an earlier push.
    ///
    /// # Errors
    ///
    /// Returns `MpesaError::Api` for errors other than "still processing".
    /// Returns `MpesaError::Http` on transport failures.
    #[instrument(skip(self))]
    pub async fn query(&self, checkout_request_id: &str) -> Result<QueryOutcome, MpesaError> {
        let timestamp = timestamp(Utc::now());
        let payload = StkQueryPayload {
            business_short_code: self.inner.shortcode.clone(),
            password: self.password(&timestamp),
            timestamp,
            checkout_request_id: checkout_request_id.to_string(),
        };

        match self
            .post::<_, StkQueryResponse>("/mpesa/stkpushquery/v1/query", &payload)
            .await
        {
            Ok(response) => Ok(QueryOutcome::Done(response.into_result())),
            Err(MpesaError::Api { code, .. }) if code == "500.001.1001" => {
                Ok(QueryOutcome::Pending)
            }
            Err(e) => Err(e),
        }
    }

    /// `base64(shortcode + passkey + timestamp)`.
    fn password(&self, timestamp: &str) -> String {
        stk_password(
            &self.inner.shortcode,
            self.inner.passkey.expose_secret(),
            timestamp,
        )
    }

    /// Fetch an OAuth token, reusing a cached one when possible.
    async fn access_token(&self) -> Result<String, MpesaError> {
        if let Some(token) = self.inner.tokens.get(TOKEN_KEY).await {
            return Ok(token);
        }

        let response = self
            .inner
            .client
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.inner.base_url
            ))
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(300).collect::<String>(),
                "M-Pesa OAuth request failed"
            );
            return Err(MpesaError::Auth(format!("HTTP {status}")));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        tracing::debug!(expires_in = ?token.expires_in, "Fetched M-Pesa access token");
        self.inner
            .tokens
            .insert(TOKEN_KEY, token.access_token.clone())
            .await;
        Ok(token.access_token)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, MpesaError>
    where
        B: serde::Serialize + Sync,
        R: DeserializeOwned,
    {
        let token = self.access_token().await?;

        let response = self
            .inner
            .client
            .post(format!("{}{path}", self.inner.base_url))
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.inner.tokens.invalidate(TOKEN_KEY).await;
        }

        if !status.is_success() {
            let error = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or(ApiErrorBody {
                error_code: status.as_u16().to_string(),
                error_message: text.chars().take(200).collect(),
            });
            if !error.is_still_processing() {
                tracing::error!(
                    status = %status,
                    code = %error.error_code,
                    message = %error.error_message,
                    path,
                    "M-Pesa API returned non-success status"
                );
            }
            return Err(MpesaError::Api {
                code: error.error_code,
                message: error.error_message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(300).collect::<String>(),
                "Failed to parse M-Pesa response"
            );
            MpesaError::Parse(e)
        })
    }
}

/// STK password: base64 of shortcode, passkey and timestamp concatenated.
#[must_use]
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// `yyyyMMddHHmmss` in Nairobi time (UTC+3, no DST).
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    (now + chrono::Duration::hours(3))
        .format("%Y%m%d%H%M%S")
        .to_string()
}
