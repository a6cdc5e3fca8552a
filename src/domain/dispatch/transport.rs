//! Transport session boundary
//!
//! The messaging-protocol session (pairing, reconnects, wire encoding) lives
//! outside this crate. The dispatch engine only needs to know whether a session
//! is connected, how to upload a payload, and how to submit a message.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::request::{MediaKind, Recipient};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Network address of a recipient on the transport ("<digits>@<server>")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientAddress {
    user: String,
    server: String,
}

impl RecipientAddress {
    pub fn new(recipient: &Recipient, server: impl Into<String>) -> Self {
        Self {
            user: recipient.digits().to_string(),
            server: server.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl std::fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user, self.server)
    }
}

/// Opaque reference to uploaded content, as returned by the transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadedMedia {
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_length: u64,
}

/// A message ready to be submitted to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Image {
        media: UploadedMedia,
        mime_type: String,
        caption: String,
    },
    Document {
        media: UploadedMedia,
        mime_type: String,
        filename: String,
        caption: String,
    },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    /// Build the media-flavored message matching an upload's kind.
    /// The filename is carried by documents only.
    pub fn media(
        kind: MediaKind,
        media: UploadedMedia,
        mime_type: impl Into<String>,
        filename: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        match kind {
            MediaKind::Image => Self::Image {
                media,
                mime_type: mime_type.into(),
                caption: caption.into(),
            },
            MediaKind::Document => Self::Document {
                media,
                mime_type: mime_type.into(),
                filename: filename.into(),
                caption: caption.into(),
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Document { .. } => "document",
        }
    }
}

/// A live session with the messaging network
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Whether the session is currently usable for sending
    async fn is_connected(&self) -> bool;

    /// Upload a payload and obtain a reference usable in outbound messages
    async fn upload(&self, data: Bytes, kind: MediaKind) -> Result<UploadedMedia, DomainError>;

    /// Submit one message to one recipient
    async fn send_message(
        &self,
        to: &RecipientAddress,
        message: OutboundMessage,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_strips_plus() {
        let recipient = Recipient::parse("+4915112345678").unwrap();
        let address = RecipientAddress::new(&recipient, "s.whatsapp.net");
        assert_eq!(address.to_string(), "4915112345678@s.whatsapp.net");
    }

    #[test]
    fn test_media_message_shape() {
        let image = OutboundMessage::media(
            MediaKind::Image,
            UploadedMedia::default(),
            "image/png",
            "pic.png",
            "caption",
        );
        assert!(matches!(image, OutboundMessage::Image { .. }));
        assert_eq!(image.kind_name(), "image");

        let doc = OutboundMessage::media(
            MediaKind::Document,
            UploadedMedia::default(),
            "application/pdf",
            "report.pdf",
            "caption",
        );
        match doc {
            OutboundMessage::Document { filename, .. } => assert_eq!(filename, "report.pdf"),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
