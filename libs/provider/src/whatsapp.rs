use std::time::Duration;

use async_trait::async_trait;
use chatwire_core::{Transport, TransportError};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::WhatsAppConfig;

const USER_AGENT: &str = "chatwire-whatsapp/0.1";
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// HTTP binding for the WhatsApp Cloud API `messages` and media endpoints.
pub struct WhatsAppTransport {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

#[derive(Deserialize)]
struct MediaInfo {
    url: Option<String>,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| {
                TransportError::permanent("whatsapp_client", "failed to create HTTP client")
                    .with_cause(err)
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WhatsAppConfig {
        &self.config
    }

    /// Platform message id from a send response.
    pub fn get_mid(&self, body: Option<&Value>) -> Option<String> {
        chatwire_translator::get_mid(body)
    }

    /// Marks an inbound message as read. Without a configured token this does nothing.
    pub async fn set_status_read(&self, message_id: &str) -> Result<(), TransportError> {
        let Some(token) = self.config.token.as_deref() else {
            tracing::debug!(message_id, "no whatsapp token configured; skipping read receipt");
            return Ok(());
        };
        let payload = json!({
            "message_id": message_id,
            "messaging_product": "whatsapp",
            "status": "read",
        });
        if let Some(scenario) = self.config.mock_scenario() {
            return mock_response(scenario, &payload).map(|_| ());
        }
        let url = self.config.graph_url(&format!("{}/messages", self.phone_id()?));
        self.post_json(&url, token, &payload).await.map(|_| ())
    }

    /// Downloads an inbound media object: resolves its URL, then fetches the bytes.
    ///
    /// `Ok(None)` when either request answers with a non-success status.
    pub async fn fetch_media(&self, media_id: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let token = self.token()?;
        if let Some(scenario) = self.config.mock_scenario() {
            return Ok((scenario == "success").then(|| format!("mock-media:{media_id}").into_bytes()));
        }

        let info_url = self.config.graph_url(media_id);
        let response = self.request(Method::GET, &info_url, token).send().await.map_err(net)?;
        if !response.status().is_success() {
            tracing::warn!(media_id, status = response.status().as_u16(), "media lookup failed");
            return Ok(None);
        }
        let info: MediaInfo = response.json().await.map_err(|err| {
            TransportError::permanent("whatsapp_media", "invalid media info response")
                .with_cause(err)
        })?;
        let Some(media_url) = info.url else {
            return Ok(None);
        };

        let media = self.request(Method::GET, &media_url, token).send().await.map_err(net)?;
        if !media.status().is_success() {
            tracing::warn!(media_id, status = media.status().as_u16(), "media download failed");
            return Ok(None);
        }
        let bytes = media.bytes().await.map_err(|err| {
            TransportError::transient(
                "whatsapp_body",
                "failed to read media body",
                Some(DEFAULT_RETRY_AFTER),
            )
            .with_cause(err)
        })?;
        Ok(Some(bytes.to_vec()))
    }

    fn token(&self) -> Result<&str, TransportError> {
        self.config.token.as_deref().ok_or_else(|| {
            TransportError::permanent("whatsapp_missing_token", "WHATSAPP_TOKEN is not configured")
        })
    }

    fn phone_id(&self) -> Result<&str, TransportError> {
        self.config.phone_id.as_deref().ok_or_else(|| {
            TransportError::permanent(
                "whatsapp_missing_phone_id",
                "WHATSAPP_PHONE_ID is not configured",
            )
        })
    }

    fn request(&self, method: Method, url: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url).bearer_auth(token)
    }

    async fn post_json(
        &self,
        url: &str,
        token: &str,
        payload: &Value,
    ) -> Result<Value, TransportError> {
        let response = self
            .request(Method::POST, url, token)
            .json(payload)
            .send()
            .await
            .map_err(net)?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body_text = response.text().await.map_err(|err| {
            TransportError::transient(
                "whatsapp_body",
                "failed to read response body",
                Some(DEFAULT_RETRY_AFTER),
            )
            .with_cause(err)
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::transient(
                "whatsapp_retryable",
                format!("status={} body={}", status.as_u16(), body_text),
                retry_after,
            ));
        }
        if status.is_server_error() {
            return Err(TransportError::transient(
                "whatsapp_retryable",
                format!("status={} body={}", status.as_u16(), body_text),
                retry_after.or(Some(DEFAULT_RETRY_AFTER)),
            ));
        }
        if status.is_client_error() {
            return Err(TransportError::permanent(
                "whatsapp_send_failed",
                format!("status={} body={}", status.as_u16(), body_text),
            ));
        }

        Ok(serde_json::from_str(&body_text).unwrap_or_else(|_| json!({"body": body_text})))
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    async fn send(&self, payload: &Value) -> Result<Value, TransportError> {
        let token = self.token()?;
        let phone_id = self.phone_id()?;
        if let Some(scenario) = self.config.mock_scenario() {
            return mock_response(scenario, payload);
        }
        let url = self.config.graph_url(&format!("{phone_id}/messages"));
        let body = self.post_json(&url, token, payload).await?;
        tracing::debug!(to = ?payload.get("to"), mid = ?self.get_mid(Some(&body)), "whatsapp message sent");
        Ok(body)
    }
}

/// `Retry-After` in delay-seconds form; HTTP-date values are ignored.
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn net(err: reqwest::Error) -> TransportError {
    TransportError::transient(
        "whatsapp_http",
        "failed to call WhatsApp API",
        Some(DEFAULT_RETRY_AFTER),
    )
    .with_cause(err)
}

fn mock_response(scenario: &str, payload: &Value) -> Result<Value, TransportError> {
    match scenario.trim_end_matches('/') {
        "success" => Ok(json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": payload.get("to").cloned().unwrap_or(Value::Null)}],
            "messages": [{"id": "mock-msg"}],
        })),
        "throttle" => Err(TransportError::transient(
            "whatsapp_retryable",
            "mock throttled",
            Some(DEFAULT_RETRY_AFTER),
        )),
        "error" => Err(TransportError::permanent(
            "whatsapp_send_failed",
            "mock rejected the payload",
        )),
        other => Err(TransportError::permanent(
            "whatsapp_mock",
            format!("unknown mock scenario `{other}`"),
        )),
    }
}
