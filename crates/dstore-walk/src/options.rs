use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Worker count used when the caller does not choose one.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Cooperative cancellation flag shared between a walk and its caller.
///
/// Workers check the flag each time they take an item off the frontier.
/// Cloning yields a handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Tuning for a single walk.
#[derive(Clone, Debug)]
pub struct WalkOptions {
    /// Maximum number of chunks processed at once. Zero is treated as one.
    pub concurrency: usize,
    pub cancel: CancelToken,
}

impl WalkOptions {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Number of worker threads the pool actually starts.
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Summary of a completed copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Distinct refs claimed by the walk.
    pub visited: u64,
    /// Chunks written to the sink.
    pub copied: u64,
    /// Subtrees skipped because they were excluded or already in the sink.
    pub pruned: u64,
    /// Sum of [`Chunk::size`](dstore_chunks::Chunk::size) over copied chunks.
    pub bytes_copied: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_concurrency_runs_one_worker() {
        assert_eq!(WalkOptions::new(0).workers(), 1);
        assert_eq!(WalkOptions::new(5).workers(), 5);
        assert_eq!(WalkOptions::default().workers(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let opts = WalkOptions::new(2).with_cancel(token.clone());
        assert!(!opts.cancel.is_cancelled());
        token.cancel();
        assert!(opts.cancel.is_cancelled());
    }
}
