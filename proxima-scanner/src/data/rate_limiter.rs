//! Token bucket rate limiter shared by every worker in a scan.
//!
//! The chart and enrichment endpoints have unpublished rate limits; one
//! bucket per run keeps the aggregate request rate under the configured
//! budget no matter how many workers are active.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::trace;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket rate limiter.
///
/// Holds up to `capacity` tokens (one second's worth of budget) and refills
/// continuously at `requests_per_minute / 60_000` tokens per millisecond.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_per_ms: f64,
    bucket: Mutex<Bucket>,
    name: String,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute` on average.
    ///
    /// A budget of zero is treated as one request per minute.
    pub fn new(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let capacity = ((rpm as f64 / 60.0).ceil() as u32).max(1);

        Self {
            capacity,
            refill_per_ms: rpm as f64 / 60_000.0,
            bucket: Mutex::new(Bucket {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            name: name.into(),
        }
    }

    /// Wait until a token is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                let missing = 1.0 - bucket.tokens;
                Duration::from_millis((missing / self.refill_per_ms).ceil() as u64)
            };

            let wait = wait.clamp(Duration::from_millis(1), Duration::from_secs(60));
            trace!(limiter = %self.name, wait_ms = wait.as_millis() as u64, "Waiting for token");
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(bucket.last_refill).as_secs_f64() * 1000.0;
        if elapsed_ms > 0.0 {
            bucket.tokens =
                (bucket.tokens + elapsed_ms * self.refill_per_ms).min(self.capacity as f64);
            bucket.last_refill = now;
        }
    }
}

/// Rate limiter shared across workers.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Create a shared rate limiter.
pub fn shared_limiter(name: impl Into<String>, requests_per_minute: u32) -> SharedRateLimiter {
    Arc::new(RateLimiter::new(name, requests_per_minute))
}

// ============================================================================
// Tests
// ============================================================================
