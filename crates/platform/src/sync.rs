//! Single-waiter suspension cell.
//!
//! A [`WaitPoint`] connects exactly one waiting thread to an interrupt
//! handler: the thread parks in [`WaitPoint::wait`], the handler calls
//! [`WaitPoint::signal`]. The cell remembers a signal that arrives while
//! nobody waits, and the next `wait` returns immediately reporting it;
//! that is how stream synchronisation detects an overrun (the caller
//! missed a sync point). A second thread arriving while the first still
//! waits is turned away at once.
//!
//! Hosted builds park by yielding to the OS scheduler; bare-metal builds
//! spin. An RTOS port replaces the relax hook with a real thread-parking
//! call, which does not change any of the semantics above.

use core::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const WAITING: u8 = 1;
const SIGNALED: u8 = 2;

/// Outcome of a [`WaitPoint::wait`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitOutcome {
    /// The caller blocked and was released by a signal.
    Woken,
    /// A signal was already pending; the caller did not block. Stream
    /// code reports this as an overrun.
    Pending,
    /// Another thread is already waiting; the caller did not block.
    Busy,
}

/// One-waiter signal cell shared between a thread and an ISR.
pub struct WaitPoint {
    state: AtomicU8,
}

impl WaitPoint {
    /// New cell with no waiter and no pending signal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Block until the next [`WaitPoint::signal`].
    ///
    /// Returns [`WaitOutcome::Pending`] without blocking when a signal
    /// fired since the last wait, and [`WaitOutcome::Busy`] without
    /// blocking when another thread already occupies the cell.
    pub fn wait(&self) -> WaitOutcome {
        loop {
            match self.state.compare_exchange(
                IDLE,
                WAITING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(SIGNALED) => {
                    // Consume the pending signal instead of blocking.
                    if self
                        .state
                        .compare_exchange(SIGNALED, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return WaitOutcome::Pending;
                    }
                }
                Err(_) => return WaitOutcome::Busy,
            }
        }

        while self.state.load(Ordering::Acquire) == WAITING {
            relax();
        }
        self.state.store(IDLE, Ordering::Release);
        WaitOutcome::Woken
    }

    /// Release the waiter, or latch the signal if nobody waits.
    ///
    /// Interrupt-safe and idempotent.
    pub fn signal(&self) {
        self.state.store(SIGNALED, Ordering::Release);
    }

    /// Drop any latched signal.
    ///
    /// Stream start uses this so a stale sync point from a previous run
    /// cannot masquerade as an overrun of the new one.
    pub fn reset(&self) {
        let _ = self.state.compare_exchange(
            SIGNALED,
            IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// `true` while a thread is parked on the cell.
    #[must_use]
    pub fn has_waiter(&self) -> bool {
        self.state.load(Ordering::Acquire) == WAITING
    }
}

impl Default for WaitPoint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
fn relax() {
    std::thread::yield_now();
}

#[cfg(not(any(test, feature = "std")))]
fn relax() {
    core::hint::spin_loop();
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn pending_signal_returns_immediately() {
        let wp = WaitPoint::new();
        wp.signal();
        assert_eq!(wp.wait(), WaitOutcome::Pending);
        // The pending signal is consumed; the cell is idle again.
        assert!(!wp.has_waiter());
    }

    #[test]
    fn reset_drops_latched_signal() {
        let wp = WaitPoint::new();
        wp.signal();
        wp.reset();

        let wp = Arc::new(wp);
        let waiter = {
            let wp = Arc::clone(&wp);
            std::thread::spawn(move || wp.wait())
        };
        std::thread::sleep(Duration::from_millis(20));
        wp.signal();
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Woken);
    }

    #[test]
    fn signal_wakes_blocked_waiter() {
        let wp = Arc::new(WaitPoint::new());
        let waiter = {
            let wp = Arc::clone(&wp);
            std::thread::spawn(move || wp.wait())
        };

        while !wp.has_waiter() {
            std::thread::yield_now();
        }
        wp.signal();
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Woken);
    }

    #[test]
    fn second_waiter_is_turned_away() {
        let wp = Arc::new(WaitPoint::new());
        let first = {
            let wp = Arc::clone(&wp);
            std::thread::spawn(move || wp.wait())
        };
        while !wp.has_waiter() {
            std::thread::yield_now();
        }

        assert_eq!(wp.wait(), WaitOutcome::Busy);

        wp.signal();
        assert_eq!(first.join().unwrap(), WaitOutcome::Woken);
    }
}
