//! Cooperative pausing of long-running operations.
//!
//! A `Pause` is shared between the thread doing the work and any thread that
//! wants to suspend it. The worker calls `wait_while_paused()` at a point
//! where its state is consistent (between two source files while packing).
//! That call blocks the worker until some other clone calls `resume()`.
//! Nothing is ever interrupted mid-item.

use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex};

/// Shared pause flag. Clones refer to the same flag.
#[derive(Clone, Default)]
pub struct Pause(Arc<(Mutex<bool>, Condvar)>);

impl Pause {
    /// Creates a new gate in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the worker to stop at its next check.
    #[inline]
    pub fn pause(&self) {
        let (mutex, _) = self.0.deref();
        *mutex.lock().unwrap() = true;
    }

    /// Resumes all threads that are blocked in `wait_while_paused()`.
    #[inline]
    pub fn resume(&self) {
        let (mutex, condvar) = self.0.deref();
        let mut paused = mutex.lock().unwrap();
        *paused = false;
        condvar.notify_all()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        *self.0.deref().0.lock().unwrap()
    }

    /// Blocks the current thread for as long as the gate is paused. Returns
    /// immediately when it is not.
    pub fn wait_while_paused(&self) {
        let (mutex, condvar) = self.0.deref();
        let mut paused = mutex.lock().unwrap();
        while *paused {
            paused = condvar.wait(paused).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pause::Pause;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn running_gate_does_not_block() {
        let pause = Pause::new();
        assert!(!pause.is_paused());
        pause.wait_while_paused();
    }

    #[test]
    fn paused_gate_blocks_until_resumed() {
        let pause = Pause::new();
        let passed = Arc::new(AtomicBool::new(false));

        pause.pause();
        assert!(pause.is_paused());

        let worker = {
            let pause = pause.clone();
            let passed = passed.clone();
            thread::spawn(move || {
                pause.wait_while_paused();
                passed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!passed.load(Ordering::SeqCst));

        pause.resume();
        worker.join().unwrap();
        assert!(passed.load(Ordering::SeqCst));
    }
}
