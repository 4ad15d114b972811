//! Process-wide request admission using the token bucket algorithm.
//!
//! Tokens refill at `rate` per second up to `burst`. The bucket starts full, so
//! up to `burst` requests are admitted at once.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AdmissionController {
    bucket: Arc<Mutex<Bucket>>,
    rate: f64,
    burst: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl AdmissionController {
    pub fn new(rate: u32, burst: u32) -> Self {
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: burst as f64,
                last_refill: Instant::now(),
            })),
            rate: rate as f64,
            burst: burst as f64,
        }
    }

    /// Takes one token. Returns `false` when the caller should be rejected.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock();
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
