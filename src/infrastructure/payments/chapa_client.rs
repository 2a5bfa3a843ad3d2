use anyhow::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::error;

use crate::application::usecases::payments::{
    CheckoutSession, CheckoutSessionRequest, PaymentGateway, TransactionVerification,
    WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://api.chapa.co/v1";

/// Minimal Chapa client built on reqwest.
pub struct ChapaClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    amount: String,
    currency: &'a str,
    email: &'a str,
    first_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    tx_ref: &'a str,
    return_url: &'a str,
    #[serde(rename = "meta")]
    metadata: &'a std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    data: Option<InitializeData>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    checkout_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: Option<String>,
    amount: Option<f64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChapaErrorEnvelope {
    status: Option<String>,
    message: Option<serde_json::Value>,
}

/// Webhook payload as Chapa posts it; `tx_ref` is the only field trusted, and
/// only after the transaction is re-verified against the API.
#[derive(Debug, Deserialize)]
struct ChapaWebhookPayload {
    tx_ref: Option<String>,
    #[serde(default)]
    status: String,
}

impl ChapaClient {
    pub fn new(secret_key: String, webhook_secret: String, base_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (chapa_status, chapa_message) =
            match serde_json::from_str::<ChapaErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.status, envelope.message),
                Err(_) => (None, None),
            };

        error!(
            status = %status,
            chapa_status = ?chapa_status,
            chapa_message = ?chapa_message,
            response_body = %body,
            context = %context,
            "chapa api request failed"
        );

        anyhow::bail!("Chapa API request failed: {} (status {})", context, status);
    }

    /// Chapa amounts are decimal major units; order totals are minor units.
    fn format_amount(amount_minor: i64) -> String {
        format!("{}.{:02}", amount_minor / 100, (amount_minor % 100).abs())
    }
}

#[async_trait]
impl PaymentGateway for ChapaClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        // https://developer.chapa.co/docs/accept-payments
        let body = InitializeRequest {
            amount: Self::format_amount(request.amount_minor),
            currency: &request.currency,
            email: &request.email,
            first_name: &request.first_name,
            last_name: request.last_name.as_deref(),
            tx_ref: &request.transaction_ref,
            return_url: &request.success_url,
            metadata: &request.metadata,
        };

        let resp = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "initialize transaction").await?;

        let parsed: InitializeResponse = resp.json().await?;
        let checkout_url = parsed
            .data
            .and_then(|data| data.checkout_url)
            .ok_or_else(|| anyhow::anyhow!("Chapa checkout URL is missing"))?;

        Ok(CheckoutSession { checkout_url })
    }

    async fn verify_transaction(
        &self,
        transaction_ref: &str,
    ) -> Result<TransactionVerification> {
        // https://developer.chapa.co/docs/verify-payments
        let resp = self
            .http
            .get(format!(
                "{}/transaction/verify/{}",
                self.base_url, transaction_ref
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "verify transaction").await?;

        let parsed: VerifyResponse = resp.json().await?;
        let envelope_ok = parsed.status.as_deref() == Some("success");
        let data = parsed.data.unwrap_or(VerifyData {
            status: None,
            amount: None,
            currency: None,
        });
        let verified = envelope_ok && data.status.as_deref() == Some("success");
        let amount_minor = data
            .amount
            .map(|amount| (amount * 100.0).round() as i64)
            .unwrap_or_default();

        Ok(TransactionVerification {
            verified,
            amount_minor,
            currency: data.currency.unwrap_or_default(),
        })
    }

    /// Verifies the `Chapa-Signature` header: HMAC-SHA256 of the raw payload
    /// under the webhook secret, hex encoded.
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature.trim())?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid webhook signature");
        }

        let parsed: ChapaWebhookPayload = serde_json::from_slice(payload)?;
        let transaction_ref = parsed
            .tx_ref
            .ok_or_else(|| anyhow::anyhow!("webhook payload is missing tx_ref"))?;

        Ok(WebhookEvent {
            transaction_ref,
            status: parsed.status,
        })
    }
}
