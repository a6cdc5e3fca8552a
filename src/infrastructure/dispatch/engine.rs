//! Dispatch engine
//!
//! Fans one validated request out to its recipients over the installed
//! transport session. Per-recipient failures are collected and never abort
//! the batch; only a missing or disconnected session does.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::dispatch::{
    DispatchOutcome, DispatchRequest, OutboundMessage, Pacer, Recipient, RecipientAddress,
    RecipientFailure, TransportSession, CANCELLED_REASON,
};
use crate::infrastructure::observability::record_dispatch;
use crate::infrastructure::transport::SessionRegistry;

/// Default server part of recipient addresses
pub const DEFAULT_RECIPIENT_SERVER: &str = "s.whatsapp.net";

/// Executes dispatch requests against the current transport session
#[derive(Debug)]
pub struct DispatchEngine {
    sessions: Arc<SessionRegistry>,
    pacer: Arc<dyn Pacer>,
    recipient_server: String,
}

enum Step {
    Done(Result<(), String>),
    Cancelled,
}

impl DispatchEngine {
    /// Create an engine over a session registry and a pacer
    pub fn new(sessions: Arc<SessionRegistry>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            sessions,
            pacer,
            recipient_server: DEFAULT_RECIPIENT_SERVER.to_string(),
        }
    }

    /// Set the server part of recipient addresses
    pub fn with_recipient_server(mut self, server: impl Into<String>) -> Self {
        self.recipient_server = server.into();
        self
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Send the request to every recipient in order.
    ///
    /// When `cancel` fires, the in-flight send is abandoned and every recipient
    /// not yet completed is reported as cancelled.
    pub async fn dispatch(
        &self,
        request: &DispatchRequest,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let outcome = self.run(request, cancel).await;
        record_dispatch(&outcome);

        info!(
            recipients = request.recipients().len(),
            attempted = outcome.attempted(),
            delivered = outcome.delivered(),
            failed = outcome.failures().len(),
            status = outcome.status().as_str(),
            "Dispatch finished"
        );

        outcome
    }

    async fn run(&self, request: &DispatchRequest, cancel: &CancellationToken) -> DispatchOutcome {
        let Some(session) = self.sessions.current().await else {
            warn!("Dispatch rejected: no transport session installed");
            return DispatchOutcome::not_connected();
        };

        if !session.is_connected().await {
            warn!("Dispatch rejected: transport session not connected");
            return DispatchOutcome::not_connected();
        }

        let recipients = request.recipients();
        let mut failures = Vec::new();
        let mut attempted = 0;
        let mut delivered = 0;
        let mut cancelled = false;

        for (index, recipient) in recipients.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                mark_cancelled(&mut failures, recipients, index);
                break;
            }

            let address = RecipientAddress::new(recipient, self.recipient_server.as_str());

            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                result = self.deliver(session.as_ref(), &address, request) => Step::Done(result),
            };

            match step {
                Step::Done(Ok(())) => {
                    attempted += 1;
                    delivered += 1;
                    debug!(index, to = %address, "Message sent");
                }
                Step::Done(Err(error)) => {
                    attempted += 1;
                    warn!(index, to = %address, error = %error, "Message failed");
                    failures.push(RecipientFailure::new(index, recipient.as_str(), error));
                }
                Step::Cancelled => {
                    cancelled = true;
                    mark_cancelled(&mut failures, recipients, index);
                    break;
                }
            }

            if index + 1 < recipients.len() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = self.pacer.pause() => {}
                }
            }
        }

        DispatchOutcome::from_results(failures, attempted, delivered, cancelled)
    }

    /// Build and submit the message for one recipient
    async fn deliver(
        &self,
        session: &dyn TransportSession,
        to: &RecipientAddress,
        request: &DispatchRequest,
    ) -> Result<(), String> {
        let message = match request.attachment() {
            Some(file) => {
                let media = session
                    .upload(file.bytes().clone(), file.kind())
                    .await
                    .map_err(|e| format!("upload failed: {}", e))?;

                OutboundMessage::media(
                    file.kind(),
                    media,
                    file.mime_type(),
                    file.filename(),
                    request.message(),
                )
            }
            None => OutboundMessage::text(request.message()),
        };

        session
            .send_message(to, message)
            .await
            .map_err(|e| e.to_string())
    }
}

fn mark_cancelled(
    failures: &mut Vec<RecipientFailure>,
    recipients: &[Recipient],
    from: usize,
) {
    for (index, recipient) in recipients.iter().enumerate().skip(from) {
        failures.push(RecipientFailure::new(
            index,
            recipient.as_str(),
            CANCELLED_REASON,
        ));
    }
}
