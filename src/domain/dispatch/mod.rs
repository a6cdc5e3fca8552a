//! Dispatch domain
//!
//! Types for fanning one message (and at most one file) out to many
//! recipients over an external transport session.

mod outcome;
mod pacing;
mod request;
mod transport;

pub use outcome::{
    DispatchOutcome, DispatchStatus, RecipientFailure, CANCELLED_REASON, NOT_CONNECTED_REASON,
};
pub use pacing::Pacer;
pub use request::{
    tokenize_recipients, Attachment, DispatchLimits, DispatchRequest, DispatchValidationError,
    MediaKind, Recipient, DOCUMENT_MIME_TYPES, IMAGE_MIME_TYPES,
};
pub use transport::{OutboundMessage, RecipientAddress, TransportSession, UploadedMedia};

#[cfg(test)]
pub use transport::MockTransportSession;
