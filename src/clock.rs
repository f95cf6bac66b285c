//! Time sources for token refill.
//!
//! Limiters read time through the [`Clock`] trait so that admission decisions
//! can be reproduced exactly. [`SystemClock`] is the production source;
//! [`ManualClock`] only moves when told to.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that stands still until advanced.
///
/// Time is kept as a nanosecond offset from a fixed origin. Clones share the
/// offset, so a test can hand one clone to a registry and keep another to move
/// time forward. The clock never runs backwards: [`set`](Self::set) to an
/// instant before the origin pins it to the origin.
///
/// ```
/// use herald::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::default();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), start + Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let step = nanos(by);
        // fetch_update only fails when the closure returns None
        let _ = self
            .elapsed_nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |elapsed| {
                Some(elapsed.saturating_add(step))
            });
    }

    pub fn set(&self, instant: Instant) {
        let elapsed = nanos(instant.saturating_duration_since(self.origin));
        self.elapsed_nanos.store(elapsed, Ordering::SeqCst);
    }

    /// Time moved since the origin
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
