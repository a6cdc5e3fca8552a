//! Infrastructure layer - Storage, signing, transport and dispatch implementations

pub mod api_key;
pub mod dispatch;
pub mod logging;
pub mod observability;
pub mod storage;
pub mod transport;
