use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

struct Shared {
    stopped: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Cooperative cancellation flag observed by a running pattern.
///
/// Polling is a single atomic load so patterns can check it per pixel.
/// [`StopSignal::wait_timeout`] doubles as an interruptible sleep.
#[derive(Clone)]
pub struct StopSignal {
    shared: Arc<Shared>,
}

impl StopSignal {
    /// Creates a signal and the trigger that fires it.
    pub fn new() -> (Self, StopTrigger) {
        let shared = Arc::new(Shared {
            stopped: AtomicBool::new(false),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        });
        let signal = Self {
            shared: Arc::clone(&shared),
        };
        (signal, StopTrigger { shared })
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Sleeps for `duration` unless stopped first. Returns `true` if stopped.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self
            .shared
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // Spurious wakeups just go round the loop again.
            let (next, _) = self
                .shared
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Owner side of a [`StopSignal`].
pub struct StopTrigger {
    shared: Arc<Shared>,
}

impl StopTrigger {
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::Release);
        let _guard = self
            .shared
            .lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.shared.wake.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_times_out_when_not_stopped() {
        let (signal, _trigger) = StopSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn stop_wakes_a_sleeping_waiter() {
        let (signal, trigger) = StopSignal::new();
        let waiter = thread::spawn(move || {
            let start = Instant::now();
            let stopped = signal.wait_timeout(Duration::from_secs(10));
            (stopped, start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        trigger.stop();
        let (stopped, elapsed) = waiter.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn clones_share_state() {
        let (signal, trigger) = StopSignal::new();
        let clone = signal.clone();
        trigger.stop();
        assert!(signal.is_stopped());
        assert!(clone.wait_timeout(Duration::from_secs(1)));
    }
}
