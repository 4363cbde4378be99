//! Keep-alive timer.
//!
//! Sends an empty frame on a fixed period so idle connections are not torn
//! down by the service or intermediaries. Sends are best-effort: a failure is
//! logged and the next tick tries again.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::Outbound;
use crate::transport::Link;

// ============================================================================
// Constants
// ============================================================================

/// Default keep-alive period.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(20);

// ============================================================================
// Heartbeat
// ============================================================================

/// Recurring keep-alive sender bound to one link.
///
/// Stops on [`Heartbeat::stop`], on drop, or by itself on the first tick
/// that finds the link closed.
#[derive(Debug)]
pub struct Heartbeat {
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl Heartbeat {
    /// Starts sending keep-alives through `link` every `period`.
    ///
    /// The first keep-alive goes out one full period after start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `period` is zero.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(link: Arc<dyn Link>, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::config("heartbeat period must be non-zero"));
        }

        let handle = tokio::spawn(Self::run(link, period));
        debug!(period_ms = period.as_millis() as u64, "Heartbeat started");

        Ok(Self {
            handle: Some(handle),
            period,
        })
    }

    /// Stops the heartbeat. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Heartbeat stopped");
        }
    }

    /// Returns `true` until stopped or until the timer task exits.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Returns the keep-alive period.
    #[inline]
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    async fn run(link: Arc<dyn Link>, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if !link.is_open() {
                debug!("Link closed, heartbeat exiting");
                break;
            }

            match link.send_text(Outbound::KeepAlive.into_text()) {
                Ok(()) => trace!("Keep-alive sent"),
                Err(e) => debug!(error = %e, "Keep-alive send failed"),
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeLink {
        open: AtomicBool,
        failing: AtomicBool,
        sent: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
    }

    impl FakeLink {
        fn open() -> Arc<Self> {
            let link = Self::default();
            link.open.store(true, Ordering::SeqCst);
            Arc::new(link)
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }
    }

    impl Link for FakeLink {
        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn send_text(&self, text: String) -> Result<()> {
            *self.attempts.lock() += 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::NotConnected);
            }
            self.sent.lock().push(text);
            Ok(())
        }
    }

    const PERIOD: Duration = Duration::from_millis(20_000);

    #[tokio::test(start_paused = true)]
    async fn test_sends_empty_frames_on_period() {
        let link = FakeLink::open();
        let _heartbeat = Heartbeat::start(link.clone(), PERIOD).expect("heartbeat");

        tokio::time::sleep(PERIOD / 2).await;
        assert!(link.sent().is_empty(), "no keep-alive before first period");

        tokio::time::sleep(PERIOD * 2).await;
        assert_eq!(link.sent(), vec![String::new(), String::new()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_fires_after_close() {
        let link = FakeLink::open();
        let heartbeat = Heartbeat::start(link.clone(), PERIOD).expect("heartbeat");

        tokio::time::sleep(PERIOD + Duration::from_millis(1)).await;
        assert_eq!(link.sent().len(), 1);

        link.open.store(false, Ordering::SeqCst);
        tokio::time::sleep(PERIOD * 5).await;

        assert_eq!(link.sent().len(), 1);
        assert_eq!(*link.attempts.lock(), 1);
        assert!(!heartbeat.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_emission() {
        let link = FakeLink::open();
        let mut heartbeat = Heartbeat::start(link.clone(), PERIOD).expect("heartbeat");
        assert!(heartbeat.is_running());

        heartbeat.stop();
        heartbeat.stop();
        tokio::time::sleep(PERIOD * 3).await;

        assert!(link.sent().is_empty());
        assert!(!heartbeat.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_are_swallowed() {
        let link = FakeLink::open();
        link.failing.store(true, Ordering::SeqCst);
        let heartbeat = Heartbeat::start(link.clone(), PERIOD).expect("heartbeat");

        tokio::time::sleep(PERIOD * 3 + Duration::from_millis(1)).await;

        assert_eq!(*link.attempts.lock(), 3);
        assert!(heartbeat.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops() {
        let link = FakeLink::open();
        drop(Heartbeat::start(link.clone(), PERIOD).expect("heartbeat"));

        tokio::time::sleep(PERIOD * 2).await;
        assert!(link.sent().is_empty());
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let link = FakeLink::open();
        let err = Heartbeat::start(link.clone(), Duration::ZERO).unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(*link.attempts.lock(), 0);
    }

    #[test]
    fn test_default_period() {
        assert_eq!(DEFAULT_HEARTBEAT_PERIOD.as_millis(), 20_000);
    }
}
