//! Worker-local rate-bucket gap enforcement.
//!
//! Each outbox worker keeps its own last-sent timestamp per bucket; there
//! is no cross-worker coordination, matching the "in-process last-sent
//! map" the dispatch algorithm is specified against.
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum gap enforced between two dispatches on a bucket.
pub const SLACK_MINUTE_GAP: Duration = Duration::from_secs(5);
pub const TICKETS_API_GAP: Duration = Duration::from_secs(2);
pub const EMAIL_DAILY_GAP: Duration = Duration::from_secs(60);
pub const UNKNOWN_BUCKET_GAP: Duration = Duration::from_secs(1);

/// Per-bucket minimum-gap configuration. Unlisted buckets fall back to
/// [`RateLimitConfig::default_gap`].
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub gaps: HashMap<String, Duration>,
    pub default_gap: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut gaps = HashMap::new();
        gaps.insert("slack.minute".to_string(), SLACK_MINUTE_GAP);
        gaps.insert("tickets.api".to_string(), TICKETS_API_GAP);
        gaps.insert("email.daily".to_string(), EMAIL_DAILY_GAP);
        Self {
            gaps,
            default_gap: UNKNOWN_BUCKET_GAP,
        }
    }
}

impl RateLimitConfig {
    pub fn min_gap(&self, bucket: &str) -> Duration {
        self.gaps.get(bucket).copied().unwrap_or(self.default_gap)
    }
}

/// Outcome of a rate-bucket check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Dispatch may proceed now; the bucket's last-sent time was updated.
    Allowed,
    /// Dispatch must wait at least this long before retrying. The
    /// bucket's last-sent time is left untouched.
    Deferred(Duration),
}

/// Worker-local last-sent tracker, one instance per worker/process.
#[derive(Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether `bucket` may be dispatched now. On
    /// [`RateDecision::Allowed`], records `now` as the bucket's new
    /// last-sent time so the next call observes the gap.
    pub async fn check(&self, bucket: &str) -> RateDecision {
        let min_gap = self.config.min_gap(bucket);
        let now = Instant::now();
        let mut guard = self.last_sent.lock().await;
        match guard.get(bucket) {
            Some(&last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < min_gap {
                    RateDecision::Deferred(ceil_remaining(min_gap, elapsed))
                } else {
                    guard.insert(bucket.to_string(), now);
                    RateDecision::Allowed
                }
            }
            None => {
                guard.insert(bucket.to_string(), now);
                RateDecision::Allowed
            }
        }
    }
}

fn ceil_remaining(min_gap: Duration, elapsed: Duration) -> Duration {
    min_gap.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_dispatch_on_a_bucket_is_always_allowed() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert_eq!(limiter.check("slack.minute").await, RateDecision::Allowed);
    }

    #[tokio::test]
    async fn second_dispatch_within_the_gap_is_deferred() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert_eq!(limiter.check("slack.minute").await, RateDecision::Allowed);
        match limiter.check("slack.minute").await {
            RateDecision::Deferred(wait) => assert!(wait <= SLACK_MINUTE_GAP && wait > Duration::ZERO),
            RateDecision::Allowed => panic!("expected deferral"),
        }
    }

    #[tokio::test]
    async fn unknown_buckets_use_the_one_second_default() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert_eq!(limiter.check("webhook.custom").await, RateDecision::Allowed);
        match limiter.check("webhook.custom").await {
            RateDecision::Deferred(wait) => assert!(wait <= UNKNOWN_BUCKET_GAP),
            RateDecision::Allowed => panic!("expected deferral"),
        }
    }

    #[tokio::test]
    async fn distinct_buckets_do_not_interfere() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        assert_eq!(limiter.check("slack.minute").await, RateDecision::Allowed);
        assert_eq!(limiter.check("tickets.api").await, RateDecision::Allowed);
    }

    #[tokio::test]
    async fn gap_elapsing_allows_the_next_dispatch() {
        let mut config = RateLimitConfig::default();
        config
            .gaps
            .insert("tickets.api".to_string(), Duration::from_millis(5));
        let limiter = RateLimiter::new(config);
        assert_eq!(limiter.check("tickets.api").await, RateDecision::Allowed);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(limiter.check("tickets.api").await, RateDecision::Allowed);
    }
}
