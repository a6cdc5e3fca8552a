//! Pacing between consecutive sends

use async_trait::async_trait;
use std::fmt::Debug;

/// Spaces out sends within one dispatch
///
/// Pacing is a courtesy towards the transport, not a correctness mechanism.
#[async_trait]
pub trait Pacer: Send + Sync + Debug {
    /// Wait before the next recipient is processed
    async fn pause(&self);
}
