use chrono::{DateTime, Duration, Utc};
use portal_core::environment::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Fixed clock for deterministic tests
///
/// Returns the same time until [`advance`](Self::advance) is called. Clones
/// share the same instant, so a clone handed to a component can be moved
/// forward from the test.
///
/// # Example
///
/// ```
/// use portal_testing::FixedClock;
/// use portal_core::environment::Clock;
/// use chrono::{Duration, Utc};
///
/// let clock = FixedClock::new(Utc::now());
/// let time1 = clock.now();
/// assert_eq!(time1, clock.now());
///
/// clock.advance(Duration::seconds(5));
/// assert_eq!(clock.now() - time1, Duration::seconds(5));
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
}

impl FixedClock {
    /// Create a new fixed clock at `time` (millisecond precision).
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(time.timestamp_millis())),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default())
}
