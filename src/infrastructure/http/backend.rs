use super::{Envelope, build_client, join, parse_base};
use crate::domain::asset::AssetKind;
use crate::domain::order::{OrderInitializationRequest, OrderInitializationResult};
use crate::domain::payment::{VerificationResponse, VerifiedPayment};
use crate::domain::ports::{OrderApi, RecordApi, VerificationApi};
use crate::domain::records::PersistedRecord;
use crate::error::{CheckoutError, InitFailure, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Client for the Eventify REST backend.
///
/// Implements the order, verification and record ports over one shared
/// connection pool. When a token is configured it is sent as a bearer
/// credential on every call.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base: parse_base(base_url)?,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = join(&self.base, path)?;
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn write_record(&self, method: Method, path: &str, body: Value) -> Result<PersistedRecord> {
        let response = self
            .request(method, path)?
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckoutError::DomainError {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let envelope: Option<Envelope<Value>> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = envelope
                .map(|env| env.message_or(status))
                .unwrap_or_else(|| status.to_string());
            return Err(CheckoutError::DomainError {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body = envelope.and_then(|env| env.data).unwrap_or(Value::Null);
        let id = match body.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Ok(PersistedRecord { id, body })
    }
}

#[async_trait]
impl OrderApi for BackendClient {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn initialize_order(
        &self,
        request: OrderInitializationRequest,
    ) -> Result<OrderInitializationResult> {
        let unavailable = |msg: String| CheckoutError::PaymentInitError(InitFailure::Unavailable(msg));

        let response = self
            .request(Method::POST, "orders/initialize")?
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(unavailable(status.to_string()));
        }

        let envelope: Envelope<OrderInitializationResult> = response
            .json()
            .await
            .map_err(|e| unavailable(format!("unreadable response: {e}")))?;

        match envelope.data {
            Some(init) if status.is_success() && envelope.is_success() => {
                debug!(reference = %init.reference, amount = init.amount_minor_units, "order initialized");
                Ok(init)
            }
            _ => {
                let message = envelope.message_or(status);
                warn!(%status, %message, "order initialization rejected");
                Err(CheckoutError::PaymentInitError(InitFailure::classify(&message)))
            }
        }
    }
}

#[async_trait]
impl VerificationApi for BackendClient {
    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<VerificationResponse> {
        let response = self
            .request(Method::GET, &format!("payments/verify/{reference}"))?
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(VerificationResponse::NotFound);
        }
        if !status.is_success() {
            // Auth, throttling and server trouble say nothing about the payment.
            let message = response
                .json::<Envelope<Value>>()
                .await
                .map(|envelope| envelope.message_or(status))
                .unwrap_or_else(|_| status.to_string());
            warn!(%status, %message, "verification request not answered");
            return Err(CheckoutError::DomainError {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: Envelope<VerifiedPayment> = response.json().await?;
        match envelope.status.to_ascii_lowercase().as_str() {
            "success" => match envelope.data {
                Some(payment) => Ok(VerificationResponse::Paid(payment)),
                None => Err(CheckoutError::DomainError {
                    status: Some(status.as_u16()),
                    message: "verification succeeded without payment details".to_string(),
                }),
            },
            "pending" | "processing" | "ongoing" => Ok(VerificationResponse::Pending),
            _ => Ok(VerificationResponse::Failed(envelope.message)),
        }
    }
}

#[async_trait]
impl RecordApi for BackendClient {
    #[instrument(skip(self, body))]
    async fn create(&self, kind: AssetKind, body: Value) -> Result<PersistedRecord> {
        self.write_record(Method::POST, kind.create_path(), body).await
    }

    #[instrument(skip(self, body))]
    async fn update(&self, kind: AssetKind, id: &str, body: Value) -> Result<PersistedRecord> {
        let path = kind.update_path(id).ok_or_else(|| {
            CheckoutError::ValidationError(format!("{kind} records cannot be updated"))
        })?;
        self.write_record(Method::PUT, &path, body).await
    }
}
