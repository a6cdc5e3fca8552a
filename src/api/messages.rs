//! Message dispatch endpoint

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::middleware::RequireApiKey;
use super::state::AppState;
use super::types::{ApiError, Json, MessageResponse};
use crate::domain::dispatch::{
    tokenize_recipients, Attachment, DispatchLimits, DispatchRequest, DispatchValidationError,
};

const OCTET_STREAM: &str = "application/octet-stream";
const DEFAULT_FILENAME: &str = "attachment";

/// Recipients as a JSON list or as whitespace-separated text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    List(Vec<String>),
    Text(String),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(list) => list,
            Self::Text(text) => tokenize_recipients(&text),
        }
    }
}

/// JSON body of `POST /send-message`
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageBody {
    #[serde(alias = "recipients")]
    pub numbers: Recipients,
    #[serde(default)]
    pub message: String,
}

/// POST /send-message
pub async fn send_message(
    State(state): State<AppState>,
    RequireApiKey(api_key): RequireApiKey,
    request: Request,
) -> Result<Json<MessageResponse>, ApiError> {
    let dispatch = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| malformed(e.body_text()))?;
        read_multipart(multipart, &state.limits).await?
    } else {
        let Json(body) = Json::<SendMessageBody>::from_request(request, &state).await?;
        DispatchRequest::new(body.numbers.into_vec(), body.message, None, &state.limits)?
    };

    info!(
        key = %api_key.key().prefix(),
        recipients = dispatch.recipients().len(),
        attachment = dispatch.attachment().map(|a| a.kind().as_str()),
        "Dispatch requested"
    );

    let cancel = CancellationToken::new();
    let run = state.dispatch_engine.dispatch(&dispatch, &cancel);
    tokio::pin!(run);

    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::time::sleep(state.request_timeout) => {
            warn!(timeout_secs = state.request_timeout.as_secs(), "Dispatch deadline reached, cancelling");
            cancel.cancel();
            run.await
        }
    };

    match ApiError::from_outcome(&outcome) {
        None => Ok(Json(MessageResponse::new("Success!"))),
        Some(err) => Err(err),
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn malformed(message: impl Into<String>) -> ApiError {
    DispatchValidationError::MalformedBody(message.into()).into()
}

/// Declared content type, or a guess from the filename when absent or generic
fn resolve_mime(declared: Option<&str>, filename: &str) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.eq_ignore_ascii_case(OCTET_STREAM) => ct.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    limits: &DispatchLimits,
) -> Result<DispatchRequest, ApiError> {
    let mut recipients = String::new();
    let mut message = String::new();
    let mut attachment: Option<Attachment> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = name == "file" || field.file_name().is_some();

        if is_file {
            let named = field.file_name().filter(|f| !f.is_empty()).map(str::to_string);
            let declared = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(|e| malformed(e.body_text()))?;

            // An empty file input still submits a part, with no name and no body
            if named.is_none() && data.is_empty() {
                debug!("Skipping empty file part");
                continue;
            }

            if attachment.is_some() {
                return Err(DispatchValidationError::MultipleFiles.into());
            }

            let filename = named.unwrap_or_else(|| DEFAULT_FILENAME.to_string());
            let mime_type = resolve_mime(declared.as_deref(), &filename);

            debug!(filename = %filename, mime_type = %mime_type, bytes = data.len(), "Received attachment");
            attachment = Some(Attachment::new(data, mime_type, filename)?);
            continue;
        }

        match name.as_str() {
            "numbers" | "recipients" => {
                let text = field.text().await.map_err(|e| malformed(e.body_text()))?;
                recipients.push(' ');
                recipients.push_str(&text);
            }
            "message" => {
                message = field.text().await.map_err(|e| malformed(e.body_text()))?;
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(DispatchRequest::from_text(&recipients, message, attachment, limits)?)
}
