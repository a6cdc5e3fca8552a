//! Transport that logs instead of sending

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::domain::dispatch::{
    MediaKind, OutboundMessage, RecipientAddress, TransportSession, UploadedMedia,
};
use crate::domain::DomainError;

/// Always-connected session that records nothing but log lines
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sent: AtomicUsize,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages accepted so far
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TransportSession for DryRunTransport {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn upload(&self, data: Bytes, kind: MediaKind) -> Result<UploadedMedia, DomainError> {
        let digest = Sha256::digest(&data).to_vec();
        let reference = hex::encode(&digest[..8]);

        info!(kind = %kind, bytes = data.len(), reference = %reference, "Dry-run upload");

        Ok(UploadedMedia {
            url: format!("dry-run://{}/{}", kind, reference),
            direct_path: format!("/{}/{}", kind, reference),
            media_key: Vec::new(),
            file_sha256: digest.clone(),
            file_enc_sha256: digest,
            file_length: data.len() as u64,
        })
    }

    async fn send_message(
        &self,
        to: &RecipientAddress,
        message: OutboundMessage,
    ) -> Result<(), DomainError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!(to = %to, kind = message.kind_name(), "Dry-run send");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch::Recipient;

    #[tokio::test]
    async fn test_upload_fabricates_reference() {
        let transport = DryRunTransport::new();
        let media = transport
            .upload(Bytes::from_static(b"payload"), MediaKind::Document)
            .await
            .unwrap();

        assert_eq!(media.file_length, 7);
        assert_eq!(media.file_sha256.len(), 32);
        assert!(media.url.starts_with("dry-run://document/"));
    }

    #[tokio::test]
    async fn test_send_counts() {
        let transport = DryRunTransport::new();
        let to = RecipientAddress::new(&Recipient::parse("4911").unwrap(), "s.whatsapp.net");

        transport
            .send_message(&to, OutboundMessage::text("hi"))
            .await
            .unwrap();
        assert!(transport.is_connected().await);
        assert_eq!(transport.sent(), 1);
    }
}
