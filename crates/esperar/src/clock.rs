//! Injectable time source for deterministic wait testing.
//!
//! Every poll loop in the harness reads time and sleeps through a [`Clock`]
//! handle instead of touching `tokio::time` directly. Production code uses
//! [`SystemClock`]; tests install a [`FakeClock`] whose `sleep` advances
//! fake time instantly, so timeout arithmetic is exercised without real
//! delays.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source used by poll loops
#[async_trait]
pub trait Clock: fmt::Debug + Send + Sync {
    /// Milliseconds elapsed since the clock's epoch
    fn now_ms(&self) -> u64;

    /// Suspend cooperatively for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Real time: monotonic reads, tokio sleeps
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Create a system clock with its epoch at construction time
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Create a shared system clock handle
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fake time for deterministic tests.
///
/// `sleep` advances the fake time by exactly the requested duration and
/// yields once to the executor, so a wait that would take seconds of wall
/// time completes in microseconds while observing identical timestamps.
#[derive(Debug, Default)]
pub struct FakeClock {
    current_ms: AtomicU64,
}

impl FakeClock {
    /// Create a fake clock starting at 0 ms
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared fake clock handle
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance fake time by `ms` milliseconds
    pub fn advance_ms(&self, ms: u64) {
        let _ = self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set fake time to an absolute value
    pub fn set_ms(&self, ms: u64) {
        self.current_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_ms(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_starts_at_zero() {
        let clock = FakeClock::new();
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_fake_clock_advance() {
        let clock = FakeClock::new();
        clock.advance_ms(250);
        clock.advance_ms(250);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_fake_clock_set() {
        let clock = FakeClock::new();
        clock.set_ms(9999);
        assert_eq!(clock.now_ms(), 9999);
    }

    #[tokio::test]
    async fn test_fake_clock_sleep_advances_instantly() {
        let clock = FakeClock::new();
        let wall = Instant::now();
        clock.sleep(Duration::from_secs(3600)).await;
        assert_eq!(clock.now_ms(), 3_600_000);
        assert!(wall.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_system_clock_progresses() {
        let clock = SystemClock::new();
        let before = clock.now_ms();
        clock.sleep(Duration::from_millis(20)).await;
        assert!(clock.now_ms() >= before + 20);
    }

    #[test]
    fn test_shared_handles() {
        let fake = FakeClock::shared();
        let as_clock: SharedClock = fake.clone();
        fake.advance_ms(10);
        assert_eq!(as_clock.now_ms(), 10);
    }
}
