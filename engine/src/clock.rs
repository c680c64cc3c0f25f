//! Clock sources and client clock calibration.
//!
//! The server never trusts a client-reported time directly. Each request
//! carries the client's wall clock at build time; the server derives an
//! offset from it and maps every client timestamp in the request onto its
//! own timeline with a [`Calibrator`].

use crate::Timestamp;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// A source of wall-clock time in milliseconds since the epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in milliseconds.
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and simulations to control skew between nodes.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Set the current reading.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `millis` and return the new reading.
    pub fn advance(&self, millis: i64) -> Timestamp {
        self.now.fetch_add(millis, Ordering::SeqCst) + millis
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Maps client timestamps onto the server timeline for one request.
///
/// `calibrate(t) = min(t + offset, now)` where `offset = now - client_time`.
/// A calibrated time never lies ahead of the server's `now`, so a client
/// with a fast clock cannot win every last-write-wins race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibrator {
    now: Timestamp,
    offset: i64,
}

impl Calibrator {
    /// Build a calibrator from the server time and the client time reported
    /// in the request.
    pub fn new(server_now: Timestamp, client_time: Timestamp) -> Self {
        Self {
            now: server_now,
            offset: server_now.saturating_sub(client_time),
        }
    }

    /// Translate a client timestamp to server time.
    pub fn calibrate(&self, client_timestamp: Timestamp) -> Timestamp {
        client_timestamp.saturating_add(self.offset).min(self.now)
    }

    /// Server time the calibrator was built at.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Estimated difference between server and client clocks.
    pub fn offset(&self) -> i64 {
        self.offset
    }
}
