//! Bounded worker pool over a shared frontier.
//!
//! Items travel through an unbounded `crossbeam-channel`. A pending counter
//! is raised before every send and lowered after every item is processed;
//! the worker that lowers it to zero broadcasts `Stop` to the rest.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{WalkError, WalkResult};
use crate::options::CancelToken;

enum Msg<T> {
    Item(T),
    Stop,
}

/// Handle a work function uses to add items to the frontier.
pub(crate) struct Frontier<'a, T> {
    tx: &'a Sender<Msg<T>>,
    pending: &'a AtomicUsize,
}

impl<T> Frontier<'_, T> {
    pub(crate) fn push(&self, item: T) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        // The pool holds a receiver until every worker has exited.
        let _ = self.tx.send(Msg::Item(item));
    }
}

struct Shared<T> {
    tx: Sender<Msg<T>>,
    rx: Receiver<Msg<T>>,
    pending: AtomicUsize,
    aborted: AtomicBool,
    first_error: Mutex<Option<WalkError>>,
    workers: usize,
}

impl<T> Shared<T> {
    fn record(&self, err: WalkError) {
        let mut slot = self.first_error.lock().expect("lock poisoned");
        if slot.is_none() {
            *slot = Some(err);
        }
        self.aborted.store(true, Ordering::Release);
    }

    fn finish_item(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            for _ in 0..self.workers {
                let _ = self.tx.send(Msg::Stop);
            }
        }
    }
}

/// Run `work` over `seeds` and everything it pushes, on `workers` threads.
///
/// Returns the first error any item produced. After an error or
/// cancellation, queued items are drained without calling `work`.
pub(crate) fn run<T, F>(
    workers: usize,
    seeds: Vec<T>,
    cancel: &CancelToken,
    work: F,
) -> WalkResult<()>
where
    T: Send,
    F: Fn(T, &Frontier<'_, T>) -> WalkResult<()> + Sync,
{
    if seeds.is_empty() {
        return Ok(());
    }
    let workers = workers.max(1);
    let (tx, rx) = unbounded();
    let shared = Shared {
        tx,
        rx,
        pending: AtomicUsize::new(0),
        aborted: AtomicBool::new(false),
        first_error: Mutex::new(None),
        workers,
    };
    let frontier = Frontier {
        tx: &shared.tx,
        pending: &shared.pending,
    };
    for seed in seeds {
        frontier.push(seed);
    }

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| worker_loop(&shared, cancel, &work));
        }
    });

    match shared.first_error.into_inner().expect("lock poisoned") {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn worker_loop<T, F>(shared: &Shared<T>, cancel: &CancelToken, work: &F)
where
    F: Fn(T, &Frontier<'_, T>) -> WalkResult<()>,
{
    let frontier = Frontier {
        tx: &shared.tx,
        pending: &shared.pending,
    };
    while let Ok(Msg::Item(item)) = shared.rx.recv() {
        if !shared.aborted.load(Ordering::Acquire) {
            if cancel.is_cancelled() {
                shared.record(WalkError::Cancelled);
            } else if let Err(err) = work(item, &frontier) {
                shared.record(err);
            }
        }
        shared.finish_item();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_chunks::ChunkError;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn empty_seeds_return_immediately() {
        let result = run(4, Vec::<u32>::new(), &CancelToken::new(), |_, _| {
            panic!("no work expected")
        });
        assert!(result.is_ok());
    }

    #[test]
    fn processes_pushed_items() {
        // Each n > 0 pushes n - 1; seeding 0..10 yields 1 + 2 + ... + 10 items.
        let seen = AtomicU64::new(0);
        run(4, (0..10u64).collect(), &CancelToken::new(), |n, frontier| {
            seen.fetch_add(1, Ordering::Relaxed);
            if n > 0 {
                frontier.push(n - 1);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 55);
    }

    #[test]
    fn first_error_is_returned() {
        let result = run(3, vec![0u32, 1, 2, 3], &CancelToken::new(), |n, _| {
            if n == 2 {
                Err(ChunkError::Unavailable("boom".into()).into())
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(WalkError::Chunk(_))));
    }

    #[test]
    fn cancelled_token_stops_work() {
        let token = CancelToken::new();
        token.cancel();
        let calls = AtomicU64::new(0);
        let result = run(2, vec![1u32, 2, 3], &token, |_, _| {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        assert!(matches!(result, Err(WalkError::Cancelled)));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
