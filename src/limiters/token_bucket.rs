//! Token bucket rate limiting algorithm
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::settings::QuotaSpec;

/// Token bucket state: balance and the instant it was last brought up to date
#[derive(Clone, Copy, Debug)]
pub struct TokenBucket {
    pub tokens: f64,
    pub last_refill: Instant,
}

impl TokenBucket {
    pub fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Balance at `now`: tokens are added at `rate * elapsed` and the result
    /// saturates at `capacity`. Does not modify the bucket.
    pub fn refilled(&self, now: Instant, rate: f64, capacity: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.tokens + elapsed.as_secs_f64() * rate).clamp(0.0, capacity)
    }

    /// Return number of tokens as u32, clamped to u32 range
    pub fn tokens_to_u32(tokens: f64) -> u32 {
        tokens.trunc().clamp(0.0, u32::MAX.into()) as u32
    }
}

/// Outcome of a single admission check
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    /// One token was taken; `remaining` whole tokens are left
    Admitted { remaining: u32 },
    /// Bucket unchanged; a token becomes available after `retry_after`
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Token bucket limiter for one quota.
///
/// The bucket starts full. The balance and its timestamp live behind one
/// mutex, so concurrent callers serialize on the refill-then-take step and a
/// token can never be handed out twice.
#[derive(Debug)]
pub struct RateLimiter {
    spec: QuotaSpec,
    rate: f64,
    capacity: f64,
    clock: Arc<dyn Clock>,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(spec: QuotaSpec) -> Self {
        Self::with_clock(spec, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(spec: QuotaSpec, clock: Arc<dyn Clock>) -> Self {
        let capacity = spec.capacity();
        let bucket = TokenBucket::full(capacity, clock.now());
        Self {
            spec,
            rate: spec.refill_rate(),
            capacity,
            clock,
            bucket: Mutex::new(bucket),
        }
    }

    pub fn spec(&self) -> QuotaSpec {
        self.spec
    }

    /// Maximum number of tokens the bucket holds
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second
    pub fn refill_rate(&self) -> f64 {
        self.rate
    }

    /// Take one token if available. Never blocks waiting for a refill.
    pub fn allow(&self) -> bool {
        self.check().is_admitted()
    }

    /// Like [`allow`](Self::allow), but reports the remaining balance on
    /// admission and the time until the next token on denial.
    pub fn check(&self) -> Admission {
        let mut bucket = self.lock_bucket();
        let now = self.clock.now();
        let available = bucket.refilled(now, self.rate, self.capacity);

        if self.covers_one_token(available) {
            bucket.tokens = (available - 1.0).max(0.0);
            bucket.last_refill = now;
            Admission::Admitted {
                remaining: TokenBucket::tokens_to_u32(bucket.tokens),
            }
        } else {
            Admission::Denied {
                retry_after: self.time_until_token(available),
            }
        }
    }

    /// Whole tokens available right now, without consuming any
    pub fn remaining(&self) -> u32 {
        let bucket = self.lock_bucket();
        let available = bucket.refilled(self.clock.now(), self.rate, self.capacity);
        TokenBucket::tokens_to_u32(available)
    }

    // Durations are whole nanoseconds and `as_secs_f64` rounds, so a balance
    // within one nanosecond of refill (plus float error) of a full token counts
    // as a full token.
    fn covers_one_token(&self, available: f64) -> bool {
        let slack = self.rate * 1e-9 + 4.0 * f64::EPSILON * self.capacity.max(1.0);
        available >= 1.0 - slack
    }

    /// Rounded up to the next nanosecond, so waiting exactly this long is
    /// always enough. Never zero.
    fn time_until_token(&self, available: f64) -> Duration {
        let nanos = ((1.0 - available) / self.rate * 1e9).ceil();
        if nanos.is_finite() && nanos < u64::MAX as f64 {
            Duration::from_nanos((nanos as u64).max(1))
        } else {
            Duration::MAX
        }
    }

    // Poisoning is ignored: tokens and timestamp are always written together.
    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::settings::Window;

    fn limiter_with_clock(spec: QuotaSpec) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::default();
        let limiter = RateLimiter::with_clock(spec, Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn tokens_to_u32() {
        assert_eq!(TokenBucket::tokens_to_u32(4294967297.0), u32::MAX);
        assert_eq!(TokenBucket::tokens_to_u32(-4294967297.0), 0);
        assert_eq!(TokenBucket::tokens_to_u32(3.333333333333333), 3);
        assert_eq!(TokenBucket::tokens_to_u32(1203.9999999999), 1203);
        assert_eq!(TokenBucket::tokens_to_u32(0.0), 0);
    }

    #[test]
    fn refill_saturates_at_capacity() {
        let start = Instant::now();
        let bucket = TokenBucket {
            tokens: 4.0,
            last_refill: start,
        };
        let later = start + Duration::from_secs(3_600);
        assert_eq!(bucket.refilled(later, 1.0, 5.0), 5.0);
        // clock moving backwards adds nothing
        let bucket = TokenBucket {
            tokens: 2.5,
            last_refill: later,
        };
        assert_eq!(bucket.refilled(start, 1.0, 5.0), 2.5);
    }

    #[test]
    fn starts_full() {
        let (limiter, _clock) = limiter_with_clock(QuotaSpec::per_hour(3));
        assert_eq!(limiter.capacity(), 180.0);
        assert_eq!(limiter.remaining(), 180);
    }

    #[test]
    fn single_token_then_denied() {
        let (limiter, _clock) = limiter_with_clock(QuotaSpec::per_minute(1));
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn two_per_minute() {
        let (limiter, _clock) = limiter_with_clock(QuotaSpec::per_minute(2));
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn check_reports_remaining_balance() {
        let (limiter, _clock) = limiter_with_clock(QuotaSpec::per_minute(5));
        assert_eq!(limiter.check(), Admission::Admitted { remaining: 4 });
        assert_eq!(limiter.check(), Admission::Admitted { remaining: 3 });
        assert_eq!(limiter.remaining(), 3);
    }

    #[test]
    fn denial_reports_time_until_next_token() {
        let (limiter, _clock) = limiter_with_clock(QuotaSpec::per_minute(1));
        assert!(limiter.allow());
        match limiter.check() {
            Admission::Denied { retry_after } => {
                assert!(retry_after > Duration::from_secs(59));
                assert!(retry_after < Duration::from_secs(61));
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn denial_leaves_bucket_unchanged() {
        let (limiter, clock) = limiter_with_clock(QuotaSpec::per_minute(1));
        assert!(limiter.allow());
        clock.advance(Duration::from_secs(30));
        assert!(!limiter.allow());
        assert!(!limiter.allow());
        // the 30s accrued before the denials still count
        clock.advance(Duration::from_secs(31));
        assert!(limiter.allow());
    }

    #[test]
    fn refills_after_one_token_interval() {
        let (limiter, clock) = limiter_with_clock(QuotaSpec::per_minute(2));
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());

        clock.advance(Duration::from_secs(29));
        assert!(!limiter.allow());

        clock.advance(Duration::from_millis(1_001));
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn waiting_exactly_retry_after_is_enough() {
        for window in [Window::Minute, Window::Unrecognized] {
            for limit in 1..=200 {
                let (limiter, clock) = limiter_with_clock(QuotaSpec::new(limit, window));
                while limiter.allow() {}

                let retry_after = match limiter.check() {
                    Admission::Denied { retry_after } => retry_after,
                    other => panic!("expected denial, got {:?}", other),
                };
                assert!(retry_after > Duration::ZERO);
                clock.advance(retry_after);
                assert!(limiter.allow(), "limit {} per {}", limit, window);
            }
        }
    }

    #[test]
    fn waiting_exactly_one_token_interval_is_enough() {
        for limit in 1..=200 {
            let spec = QuotaSpec::per_minute(limit);
            let (limiter, clock) = limiter_with_clock(spec);
            while limiter.allow() {}

            clock.advance(Duration::from_secs_f64(1.0 / spec.refill_rate()));
            assert!(limiter.allow(), "limit {} per minute", limit);
        }
    }

    #[test]
    fn partial_wait_reports_the_rest() {
        let (limiter, clock) = limiter_with_clock(QuotaSpec::per_minute(7));
        while limiter.allow() {}
        clock.advance(Duration::from_secs(5));

        let retry_after = match limiter.check() {
            Admission::Denied { retry_after } => retry_after,
            other => panic!("expected denial, got {:?}", other),
        };
        // one token every 60/7 s, 5 s of it already elapsed
        assert!(retry_after > Duration::from_millis(3_571));
        assert!(retry_after < Duration::from_millis(3_572));
        clock.advance(retry_after);
        assert!(limiter.allow());
    }

    #[test]
    fn idle_time_never_overfills() {
        let (limiter, clock) = limiter_with_clock(QuotaSpec::per_minute(3));
        assert!(limiter.allow());
        clock.advance(Duration::from_secs(86_400 * 30));
        assert_eq!(limiter.remaining(), 3);
        for _ in 0..3 {
            assert!(limiter.allow());
        }
        assert!(!limiter.allow());
    }

    #[test]
    fn unrecognized_window_has_single_token_burst() {
        let (limiter, clock) = limiter_with_clock(QuotaSpec::new(10, Window::Unrecognized));
        assert_eq!(limiter.capacity(), 1.0);
        assert_eq!(limiter.refill_rate(), 10.0);
        assert!(limiter.allow());
        assert!(!limiter.allow());
        clock.advance(Duration::from_millis(101));
        assert!(limiter.allow());
    }

    #[test]
    fn zero_limit_never_admits() {
        let (limiter, clock) = limiter_with_clock(QuotaSpec::per_minute(0));
        assert!(!limiter.allow());
        clock.advance(Duration::from_secs(3_600));
        assert_eq!(
            limiter.check(),
            Admission::Denied {
                retry_after: Duration::MAX
            }
        );
    }

    #[test]
    fn test_rate_limiter_settings_impact() {
        let (limiter, _clock) = limiter_with_clock(QuotaSpec::per_minute(100));
        assert_eq!(limiter.remaining(), 100);

        for _ in 0..10 {
            assert!(limiter.allow());
        }
        assert_eq!(limiter.remaining(), 90);
    }
}
