//! One-shot completion latch
//!
//! Both completion channels of an invocation (the handler's callback and its
//! returned value) report into the same latch. The first commit moves the
//! latch out of [`CompletionResult::Pending`]; every later commit is a no-op.

use tokio::sync::watch;

use crate::invocation::CompletionResult;

/// Single-slot result shared by the completion channels of one invocation
pub struct CompletionLatch {
    slot: watch::Sender<CompletionResult>,
}

impl Default for CompletionLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionLatch {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(CompletionResult::Pending);
        Self { slot }
    }

    /// Commit `result` if nothing has been committed yet
    ///
    /// Returns `true` when this call filled the slot. Committing `Pending`
    /// never changes the latch.
    pub fn commit(&self, result: CompletionResult) -> bool {
        if result.is_pending() {
            return false;
        }

        self.slot.send_if_modified(move |slot| {
            if slot.is_pending() {
                *slot = result;
                true
            } else {
                false
            }
        })
    }

    pub fn is_committed(&self) -> bool {
        !self.slot.borrow().is_pending()
    }

    /// Current state without waiting
    pub fn snapshot(&self) -> CompletionResult {
        self.slot.borrow().clone()
    }

    /// Wait until a result is committed
    ///
    /// Never resolves for an invocation whose channels both stay silent.
    pub async fn committed(&self) -> CompletionResult {
        let mut watcher = self.slot.subscribe();
        let result = match watcher.wait_for(|result| !result.is_pending()).await {
            Ok(result) => result.clone(),
            // The sender lives in `self`, so the channel cannot close while
            // we are borrowed.
            Err(_) => CompletionResult::Pending,
        };
        result
    }
}
