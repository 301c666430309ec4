//! Cooperative cancellation: a token checked at pull boundaries
//! and before remote round-trips, plus the whole-query timeout that sets it.
//!
//! The executor's operators and `Connection::execute` calls are synchronous
//! (`TableScan.open`/`.next` may block), so this is a plain
//! `Condvar`-backed flag rather than a tokio cancellation token — a waiting
//! retry sleep can be woken immediately instead of riding out its full
//! backoff, without pulling an async runtime into the pull-based operator
//! path.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::FedError;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const TIMED_OUT: u8 = 2;

#[derive(Clone)]
pub struct Cancellation {
    state: Arc<AtomicU8>,
    wake: Arc<(Mutex<()>, Condvar)>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(RUNNING)),
            wake: Arc::new((Mutex::new(()), Condvar::new())),
        }
    }

    pub fn cancel(&self) {
        self.state.compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst).ok();
        self.wake.1.notify_all();
    }

    pub fn expire(&self) {
        self.state.compare_exchange(RUNNING, TIMED_OUT, Ordering::SeqCst, Ordering::SeqCst).ok();
        self.wake.1.notify_all();
    }

    /// Checked at every pull boundary (`Operator::next`) and before every
    /// remote round-trip; fails fast instead of letting work continue after
    /// cancellation or timeout.
    pub fn check(&self) -> Result<(), FedError> {
        match self.state.load(Ordering::SeqCst) {
            CANCELLED => Err(FedError::Cancelled),
            TIMED_OUT => Err(FedError::Timeout),
            _ => Ok(()),
        }
    }

    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::SeqCst) != RUNNING
    }

    /// Sleeps up to `duration`, waking early if cancelled or expired.
    /// Used by the retry backoff so a cancelled query doesn't sit out a
    /// full backoff delay before noticing.
    pub fn sleep_or_interrupted(&self, duration: Duration) -> Result<(), FedError> {
        self.check()?;
        let (lock, cvar) = &*self.wake;
        let guard = lock.lock().unwrap();
        let (_guard, timeout_result) = cvar.wait_timeout(guard, duration).unwrap();
        let _ = timeout_result;
        self.check()
    }

    /// Spawns a background thread that calls `expire()` after `timeout`
    /// unless the query finishes (or is cancelled) first; the returned
    /// guard should be dropped once the query completes so the thread can
    /// notice there's nothing left to expire.
    pub fn start_timeout(&self, timeout: Duration) {
        let cancellation = self.clone();
        std::thread::spawn(move || {
            let (lock, cvar) = &*cancellation.wake;
            let guard = lock.lock().unwrap();
            let (_guard, result) = cvar.wait_timeout(guard, timeout).unwrap();
            if result.timed_out() && !cancellation.is_set() {
                cancellation.expire();
            }
        });
    }
}
