//! Bounded Retry Driver
//!
//! A [`Waiter`] is a single-use, time-bounded session that hands out
//! [`Tick`]s: each tick is permission to run one probe against the cluster.
//! The first tick is granted immediately; every later tick is preceded by a
//! blocking sleep of `interval`. The session ends once the next tick could
//! no longer be granted inside `timeout`, and records that it ended by
//! expiry so the caller can tell "condition met" from "timed out".
//!
//! ```no_run
//! use std::time::Duration;
//! use cns_ocp_ops::{Error, Waiter};
//!
//! # fn probe() -> bool { true }
//! let mut waiter = Waiter::new(Duration::from_secs(120), Duration::from_secs(3));
//! for _tick in waiter.by_ref() {
//!     if probe() {
//!         break;
//!     }
//! }
//! if waiter.is_expired() {
//!     return Err(Error::timeout("probe", waiter.timeout()));
//! }
//! # Ok::<(), Error>(())
//! ```

use crate::error::{Error, Result};
use std::cell::Cell;
use std::iter::FusedIterator;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// Clock
// =============================================================================

/// Time source used by a [`Waiter`]
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant::now` and `thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock whose `sleep` advances time instantly.
///
/// Clones share the same timeline, so a test can keep one handle while the
/// waiter owns another and simulate probe latency with [`ManualClock::advance`].
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
    sleeps: Rc<Cell<u32>>,
}

impl ManualClock {
    /// Create a clock positioned at virtual time zero
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
            sleeps: Rc::new(Cell::new(0)),
        }
    }

    /// Move virtual time forward
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of times `sleep` was called
    pub fn sleep_count(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

// =============================================================================
// Tick
// =============================================================================

/// One granted permission to run a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based attempt number
    pub attempt: u32,
    /// Time since the first tick when this one was granted
    pub elapsed: Duration,
}

// =============================================================================
// Waiter
// =============================================================================

/// Single-use bounded retry session
#[derive(Debug)]
pub struct Waiter<C: Clock = SystemClock> {
    timeout: Duration,
    interval: Duration,
    clock: C,
    start: Option<Instant>,
    attempts: u32,
    expired: bool,
}

impl Waiter<SystemClock> {
    /// Create a session on the wall clock
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self::with_clock(timeout, interval, SystemClock)
    }

    /// Create a session from second counts, rejecting negative or
    /// non-finite values.
    ///
    /// An interval of zero is accepted and disables throttling.
    pub fn from_secs_f64(timeout: f64, interval: f64) -> Result<Self> {
        let timeout = secs_to_duration("timeout", timeout)?;
        let interval = secs_to_duration("interval", interval)?;
        Ok(Self::new(timeout, interval))
    }
}

impl<C: Clock> Waiter<C> {
    /// Create a session driven by a custom clock
    pub fn with_clock(timeout: Duration, interval: Duration, clock: C) -> Self {
        Self {
            timeout,
            interval,
            clock,
            start: None,
            attempts: 0,
            expired: false,
        }
    }

    /// Total time budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sleep between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of ticks granted so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time since the first tick, zero before it
    pub fn elapsed(&self) -> Duration {
        self.start
            .map(|start| self.clock.now().saturating_duration_since(start))
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the session ended because the budget ran out.
    ///
    /// Stays `false` when the consumer stopped iterating early.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Drive the session with `probe` until it produces a value.
    ///
    /// `Ok(None)` means the session expired first. An error from `probe`
    /// ends the session immediately without marking it expired.
    pub fn until<T, F>(&mut self, mut probe: F) -> Result<Option<T>>
    where
        F: FnMut(Tick) -> Result<Option<T>>,
    {
        while let Some(tick) = self.next() {
            if let Some(value) = probe(tick)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

impl<C: Clock> Iterator for Waiter<C> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.expired {
            return None;
        }

        let start = match self.start {
            Some(start) => start,
            None => {
                self.start = Some(self.clock.now());
                self.attempts = 1;
                return Some(Tick {
                    attempt: 1,
                    elapsed: Duration::ZERO,
                });
            }
        };

        // The next tick would be granted after one more interval; once that
        // point is at or past the budget the session is over.
        let elapsed = self.clock.now().saturating_duration_since(start);
        if elapsed.saturating_add(self.interval) >= self.timeout {
            debug!(
                attempts = self.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = self.timeout.as_millis() as u64,
                "Waiter expired"
            );
            self.expired = true;
            return None;
        }

        if !self.interval.is_zero() {
            trace!(
                attempt = self.attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = self.interval.as_millis() as u64,
                "Sleeping before next attempt"
            );
            self.clock.sleep(self.interval);
        }

        self.attempts += 1;
        Some(Tick {
            attempt: self.attempts,
            elapsed: self.clock.now().saturating_duration_since(start),
        })
    }
}

impl<C: Clock> FusedIterator for Waiter<C> {}

fn secs_to_duration(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::InvalidArgument(format!(
            "{} must be a finite, non-negative number of seconds, got {}",
            name, secs
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn manual(timeout: u64, interval: u64) -> (Waiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (Waiter::with_clock(secs(timeout), secs(interval), clock.clone()), clock)
    }

    #[test]
    fn test_full_run_ticks_on_interval() {
        let (mut waiter, _clock) = manual(5, 2);
        let elapsed: Vec<Duration> = waiter.by_ref().map(|t| t.elapsed).collect();

        assert_eq!(elapsed, vec![secs(0), secs(2), secs(4)]);
        assert!(waiter.is_expired());
        assert_eq!(waiter.attempts(), 3);
    }

    #[test]
    fn test_zero_timeout_yields_one_tick_without_sleep() {
        let (mut waiter, clock) = manual(0, 10);
        let ticks: Vec<Tick> = waiter.by_ref().collect();

        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].attempt, 1);
        assert_eq!(clock.sleep_count(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert!(waiter.is_expired());
    }

    #[test]
    fn test_timeout_below_interval_yields_one_tick() {
        for timeout in 0..7 {
            let (mut waiter, _clock) = manual(timeout, 7);
            assert_eq!(waiter.by_ref().count(), 1, "timeout {}", timeout);
            assert!(waiter.is_expired());
        }
    }

    #[test]
    fn test_break_on_first_tick_is_not_expired() {
        for timeout in [0, 1, 60, 1200] {
            let (mut waiter, _clock) = manual(timeout, 5);
            for tick in waiter.by_ref() {
                assert_eq!(tick.attempt, 1);
                break;
            }
            assert!(!waiter.is_expired());
        }
    }

    #[test]
    fn test_break_on_second_tick_is_not_expired() {
        let (mut waiter, _clock) = manual(5, 2);
        let mut seen = 0;
        for tick in waiter.by_ref() {
            seen = tick.attempt;
            if tick.attempt == 2 {
                break;
            }
        }
        assert_eq!(seen, 2);
        assert!(!waiter.is_expired());
    }

    #[test]
    fn test_gap_between_ticks_includes_probe_time() {
        let (mut waiter, clock) = manual(30, 4);
        let mut previous: Option<Duration> = None;
        for tick in waiter.by_ref() {
            if let Some(prev) = previous {
                assert!(tick.elapsed - prev >= secs(4));
            }
            previous = Some(tick.elapsed);
            // Simulated probe latency
            clock.advance(Duration::from_millis(1500));
        }
        assert!(waiter.is_expired());
        assert!(previous.unwrap() < secs(30));
    }

    #[test]
    fn test_slow_probe_ends_session() {
        let (mut waiter, clock) = manual(10, 1);
        let mut count = 0;
        for _ in waiter.by_ref() {
            count += 1;
            clock.advance(secs(20));
        }
        assert_eq!(count, 1);
        assert!(waiter.is_expired());
    }

    #[test]
    fn test_not_restartable() {
        let (mut waiter, _clock) = manual(0, 1);
        assert_eq!(waiter.by_ref().count(), 1);
        assert!(waiter.next().is_none());
        assert!(waiter.next().is_none());
        assert!(waiter.is_expired());
    }

    #[test]
    fn test_zero_interval_does_not_sleep() {
        let (mut waiter, clock) = manual(3, 0);
        let mut count = 0;
        for _ in waiter.by_ref() {
            count += 1;
            clock.advance(secs(1));
        }
        assert_eq!(count, 3);
        assert_eq!(clock.sleep_count(), 0);
        assert!(waiter.is_expired());
    }

    #[test]
    fn test_from_secs_rejects_negative() {
        assert_matches!(Waiter::from_secs_f64(-1.0, 1.0), Err(Error::InvalidArgument(_)));
        assert_matches!(Waiter::from_secs_f64(1.0, -0.5), Err(Error::InvalidArgument(_)));
        assert_matches!(Waiter::from_secs_f64(f64::NAN, 1.0), Err(Error::InvalidArgument(_)));
        assert_matches!(
            Waiter::from_secs_f64(f64::INFINITY, 1.0),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_from_secs_accepts_zero() {
        let waiter = Waiter::from_secs_f64(0.0, 0.0).unwrap();
        assert_eq!(waiter.timeout(), Duration::ZERO);
        assert_eq!(waiter.interval(), Duration::ZERO);
    }

    #[test]
    fn test_until_returns_first_value() {
        let (mut waiter, clock) = manual(60, 5);
        let value = waiter
            .until(|tick| Ok((tick.attempt == 3).then_some(tick.attempt * 10)))
            .unwrap();
        assert_eq!(value, Some(30));
        assert!(!waiter.is_expired());
        assert_eq!(clock.elapsed(), secs(10));
    }

    #[test]
    fn test_until_expires() {
        let (mut waiter, _clock) = manual(6, 2);
        let value: Option<()> = waiter.until(|_| Ok(None)).unwrap();
        assert!(value.is_none());
        assert!(waiter.is_expired());
        assert_eq!(waiter.attempts(), 3);
    }

    #[test]
    fn test_error_in_loop_body_abandons_session() {
        fn probe(tick: Tick) -> Result<()> {
            if tick.attempt == 2 {
                return Err(Error::Verification("probe failed".into()));
            }
            Ok(())
        }

        let (mut waiter, _clock) = manual(60, 1);
        let result = (|| -> Result<()> {
            for tick in waiter.by_ref() {
                probe(tick)?;
            }
            Ok(())
        })();

        assert_matches!(result, Err(Error::Verification(_)));
        assert!(!waiter.is_expired());
        assert_eq!(waiter.attempts(), 2);
    }
}
