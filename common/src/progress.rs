//! Observable progress of an operation as a fraction in `[0, 1]`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared progress counter. The value only ever grows and never exceeds
/// `1.0`. It is purely informational: nothing reads it to make decisions.
#[derive(Clone, Default, Debug)]
pub struct Progress(Arc<AtomicU64>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    /// Adds `increment` to the progress. Negative and non-finite increments
    /// are ignored; the result is clamped to `1.0`.
    pub fn add(&self, increment: f64) {
        if !increment.is_finite() || increment <= 0.0 {
            return;
        }

        // the closure always returns Some, so this cannot fail
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + increment).min(1.0).to_bits())
            });
    }

    /// Marks the operation as finished.
    pub fn finish(&self) {
        self.0.store(1.0f64.to_bits(), Ordering::SeqCst);
    }
}
