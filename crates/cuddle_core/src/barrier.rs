use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Completion = Box<dyn FnOnce() + Send + 'static>;

/// Counted join over a known number of asynchronous operations.
///
/// Each operation calls [`CompletionBarrier::leave`] exactly once when it has
/// reported, whatever the outcome. The completion runs once, on whichever
/// context performs the final decrement. A barrier created with a count of
/// zero completes immediately.
pub struct CompletionBarrier {
    remaining: AtomicUsize,
    on_complete: Mutex<Option<Completion>>,
}

impl CompletionBarrier {
    pub fn new(count: usize, on_complete: impl FnOnce() + Send + 'static) -> Arc<Self> {
        let barrier = Arc::new(Self {
            remaining: AtomicUsize::new(count),
            on_complete: Mutex::new(Some(Box::new(on_complete))),
        });
        if count == 0 {
            barrier.fire();
        }
        barrier
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.on_complete.lock().is_none()
    }

    pub fn leave(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match previous {
            Ok(1) => self.fire(),
            Ok(_) => {}
            Err(_) => tracing::warn!("completion barrier left more times than entered"),
        }
    }

    fn fire(&self) {
        // Taken under the lock, run outside it.
        let completion = self.on_complete.lock().take();
        if let Some(completion) = completion {
            completion();
        }
    }
}

impl fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionBarrier")
            .field("remaining", &self.remaining())
            .field("complete", &self.is_complete())
            .finish()
    }
}
