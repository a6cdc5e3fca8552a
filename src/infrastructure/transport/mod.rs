//! Transport session adapters
//!
//! The messaging session itself is external. These adapters connect the
//! dispatch engine to it: an HTTP bridge, a dry-run logger, and the registry
//! that holds whichever session is active.

mod bridge;
mod dry_run;
mod registry;

pub use bridge::{BridgeConfig, BridgeTransport};
pub use dry_run::DryRunTransport;
pub use registry::SessionRegistry;
