//! Pacer implementations

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;

use crate::domain::dispatch::Pacer;

/// Sleeps a random interval drawn uniformly from `[min, max]`
#[derive(Debug, Clone)]
pub struct JitterPacer {
    min: Duration,
    max: Duration,
}

impl JitterPacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for JitterPacer {
    fn default() -> Self {
        Self::from_millis(50, 700)
    }
}

#[async_trait]
impl Pacer for JitterPacer {
    async fn pause(&self) {
        let delay = self.next_delay();
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every dispatch in the process
///
/// Each pause takes one token; when the bucket is empty the caller waits until
/// its token has been refilled. Concurrent callers queue behind each other.
#[derive(Debug)]
pub struct TokenBucketPacer {
    rate_per_second: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucketPacer {
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        let rate_per_second = if rate_per_second > 0.0 {
            rate_per_second
        } else {
            1.0
        };
        let burst = f64::from(burst.max(1));

        Self {
            rate_per_second,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    async fn reserve(&self) -> Duration {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();

        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_second).min(self.burst);
        bucket.last_refill = now;
        bucket.tokens -= 1.0;

        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.rate_per_second)
        }
    }
}

#[async_trait]
impl Pacer for TokenBucketPacer {
    async fn pause(&self) {
        let wait = self.reserve().await;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Does not pause at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        let pacer = JitterPacer::from_millis(50, 700);
        for _ in 0..200 {
            let delay = pacer.next_delay();
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(700));
        }
    }

    #[test]
    fn test_jitter_swapped_bounds() {
        let pacer = JitterPacer::from_millis(30, 10);
        let delay = pacer.next_delay();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_jitter_sleeps() {
        let pacer = JitterPacer::from_millis(5, 5);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_token_bucket_burst_is_free() {
        let pacer = TokenBucketPacer::new(1.0, 3);
        assert_eq!(pacer.reserve().await, Duration::ZERO);
        assert_eq!(pacer.reserve().await, Duration::ZERO);
        assert_eq!(pacer.reserve().await, Duration::ZERO);

        let wait = pacer.reserve().await;
        assert!(wait > Duration::from_millis(900) && wait <= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_token_bucket_waits_accumulate() {
        let pacer = TokenBucketPacer::new(10.0, 1);
        assert_eq!(pacer.reserve().await, Duration::ZERO);

        let first = pacer.reserve().await;
        let second = pacer.reserve().await;
        assert!(second > first);
        assert!(second <= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_token_bucket_pause() {
        let pacer = TokenBucketPacer::new(100.0, 1);
        pacer.pause().await;

        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_noop() {
        let start = Instant::now();
        NoopPacer.pause().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
