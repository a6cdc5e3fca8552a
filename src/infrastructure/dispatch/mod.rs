//! Dispatch infrastructure: the fan-out engine and pacers

mod engine;
mod pacer;

pub use engine::{DispatchEngine, DEFAULT_RECIPIENT_SERVER};
pub use pacer::{JitterPacer, NoopPacer, TokenBucketPacer};
