//! The single shared clock every "now" comparison reads.

use chrono::Utc;

/// Source of the current time in unix seconds.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-1970 system clocks collapse to zero rather than wrapping.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-helpers"))]
mod manual {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::Clock;

    /// Settable clock for tests. Clones share the same underlying time, so a
    /// test can keep a handle while the commitment owns another.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicU64>,
    }

    impl ManualClock {
        #[must_use]
        pub fn new(start: u64) -> Self {
            Self {
                now: Arc::new(AtomicU64::new(start)),
            }
        }

        pub fn set(&self, now: u64) {
            self.now.store(now, Ordering::SeqCst);
        }

        pub fn advance(&self, secs: u64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
