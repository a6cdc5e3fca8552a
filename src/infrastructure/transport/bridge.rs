//! HTTP client for a messaging bridge sidecar
//!
//! The sidecar owns the protocol session. This adapter speaks a small JSON API:
//! `GET /session`, `POST /media?kind=`, `POST /messages`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::dispatch::{
    MediaKind, OutboundMessage, RecipientAddress, TransportSession, UploadedMedia,
};
use crate::domain::DomainError;

/// Bridge client configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct SessionStatus {
    connected: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMedia {
    url: String,
    direct_path: String,
    media_key: String,
    file_sha256: String,
    file_enc_sha256: String,
    file_length: u64,
}

impl WireMedia {
    fn from_domain(media: &UploadedMedia) -> Self {
        Self {
            url: media.url.clone(),
            direct_path: media.direct_path.clone(),
            media_key: STANDARD.encode(&media.media_key),
            file_sha256: STANDARD.encode(&media.file_sha256),
            file_enc_sha256: STANDARD.encode(&media.file_enc_sha256),
            file_length: media.file_length,
        }
    }

    fn into_domain(self) -> Result<UploadedMedia, DomainError> {
        let decode = |field: &str, value: &str| {
            STANDARD.decode(value).map_err(|e| {
                DomainError::transport(format!("Bridge returned invalid {}: {}", field, e))
            })
        };

        Ok(UploadedMedia {
            media_key: decode("media_key", &self.media_key)?,
            file_sha256: decode("file_sha256", &self.file_sha256)?,
            file_enc_sha256: decode("file_enc_sha256", &self.file_enc_sha256)?,
            url: self.url,
            direct_path: self.direct_path,
            file_length: self.file_length,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireMessage {
    Text {
        body: String,
    },
    Image {
        media: WireMedia,
        mime_type: String,
        caption: String,
    },
    Document {
        media: WireMedia,
        mime_type: String,
        filename: String,
        caption: String,
    },
}

impl From<OutboundMessage> for WireMessage {
    fn from(message: OutboundMessage) -> Self {
        match message {
            OutboundMessage::Text { body } => Self::Text { body },
            OutboundMessage::Image {
                media,
                mime_type,
                caption,
            } => Self::Image {
                media: WireMedia::from_domain(&media),
                mime_type,
                caption,
            },
            OutboundMessage::Document {
                media,
                mime_type,
                filename,
                caption,
            } => Self::Document {
                media: WireMedia::from_domain(&media),
                mime_type,
                filename,
                caption,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest {
    to: String,
    message: WireMessage,
}

/// Transport session backed by the bridge's HTTP API
#[derive(Debug, Clone)]
pub struct BridgeTransport {
    client: reqwest::Client,
    config: BridgeConfig,
}

impl BridgeTransport {
    pub fn new(config: BridgeConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DomainError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DomainError::transport(format!("HTTP {}: {}", status, body.trim())))
    }
}

#[async_trait]
impl TransportSession for BridgeTransport {
    async fn is_connected(&self) -> bool {
        let request = self.authorize(self.client.get(self.url("/session")));

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Bridge session check failed");
                return false;
            }
        };

        let response = match Self::check_status(response).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Bridge session check rejected");
                return false;
            }
        };

        match response.json::<SessionStatus>().await {
            Ok(status) => status.connected,
            Err(e) => {
                warn!(error = %e, "Bridge returned an invalid session status");
                false
            }
        }
    }

    async fn upload(&self, data: Bytes, kind: MediaKind) -> Result<UploadedMedia, DomainError> {
        debug!(kind = %kind, bytes = data.len(), "Uploading media to bridge");

        let request = self
            .client
            .post(self.url("/media"))
            .query(&[("kind", kind.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("Upload request failed: {}", e)))?;

        Self::check_status(response)
            .await?
            .json::<WireMedia>()
            .await
            .map_err(|e| DomainError::transport(format!("Invalid upload response: {}", e)))?
            .into_domain()
    }

    async fn send_message(
        &self,
        to: &RecipientAddress,
        message: OutboundMessage,
    ) -> Result<(), DomainError> {
        let body = SendRequest {
            to: to.to_string(),
            message: message.into(),
        };

        let request = self.client.post(self.url("/messages")).json(&body);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("Send request failed: {}", e)))?;

        Self::check_status(response).await?;
        Ok(())
    }
}
