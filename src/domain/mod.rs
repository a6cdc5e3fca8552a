//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod dispatch;
pub mod error;

pub use api_key::{
    ApiKey, ApiKeyClaims, ApiKeyError, ApiKeyRepository, ApiKeyValidationError, ApiKeyValue,
};
pub use dispatch::{
    Attachment, DispatchLimits, DispatchOutcome, DispatchRequest, DispatchStatus,
    DispatchValidationError, MediaKind, OutboundMessage, Pacer, RecipientAddress,
    RecipientFailure, TransportSession, UploadedMedia,
};
pub use error::DomainError;
