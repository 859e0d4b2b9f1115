//! # Task Pool
//!
//! Runs listener invocations as independent units of work so the dispatch
//! loop never blocks on user code.
//!
//! A fixed set of worker threads drains an unbounded job queue; jobs are
//! enqueued in spawn order, every job gets a bookkeeping token, and a
//! panicking job is caught and logged without taking its worker down. The
//! bookkeeping entry is removed on completion whether the job succeeded or
//! panicked.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::token::TokenCounter;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Tracker {
    active: Mutex<HashSet<String>>,
    idle: Condvar,
}

impl Tracker {
    fn begin(&self, token: String) {
        self.active.lock().insert(token);
    }

    fn finish(&self, token: &str) {
        let mut active = self.active.lock();
        active.remove(token);
        if active.is_empty() {
            self.idle.notify_all();
        }
    }
}

/// Worker pool for listener fan-out.
pub struct TaskPool {
    sender: Option<Sender<(String, Job)>>,
    workers: Vec<JoinHandle<()>>,
    tracker: Arc<Tracker>,
    tokens: TokenCounter,
}

impl TaskPool {
    /// A pool with the given number of worker threads (at least one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = unbounded::<(String, Job)>();
        let tracker = Arc::new(Tracker::default());

        let handles = (0..workers)
            .map(|index| {
                let receiver = receiver.clone();
                let tracker = Arc::clone(&tracker);
                thread::Builder::new()
                    .name(format!("netherlink-worker-{index}"))
                    .spawn(move || worker_loop(&receiver, &tracker))
                    .expect("spawn worker thread")
            })
            .collect();

        Self {
            sender: Some(sender),
            workers: handles,
            tracker,
            tokens: TokenCounter::new("task"),
        }
    }

    /// Enqueues one unit of work. Never blocks.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        let token = self.tokens.next();
        self.tracker.begin(token.clone());
        if let Some(sender) = &self.sender {
            if sender.send((token.clone(), Box::new(job))).is_err() {
                self.tracker.finish(&token);
            }
        } else {
            self.tracker.finish(&token);
        }
    }

    /// Number of jobs queued or running.
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.tracker.active.lock().len()
    }

    /// Blocks until every job has completed or the timeout expires;
    /// returns whether the pool went idle.
    #[must_use]
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut active = self.tracker.active.lock();
        while !active.is_empty() {
            if self.tracker.idle.wait_until(&mut active, deadline).timed_out() {
                return active.is_empty();
            }
        }
        true
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // closing the queue lets workers drain the backlog and exit
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(receiver: &Receiver<(String, Job)>, tracker: &Tracker) {
    for (token, job) in receiver.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(job));
        if let Err(payload) = outcome {
            tracing::error!(task = %token, reason = panic_message(payload.as_ref()), "listener task panicked");
        }
        tracker.finish(&token);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "opaque panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_jobs_run_and_bookkeeping_drains() {
        let pool = TaskPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 16);
        assert_eq!(pool.active_tasks(), 0);
    }

    #[test]
    fn test_panic_is_isolated() {
        let pool = TaskPool::new(1);
        let (tx, rx) = mpsc::channel();

        pool.spawn(|| panic!("listener exploded"));
        pool.spawn(move || {
            tx.send("still alive").unwrap();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "still alive");
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(pool.active_tasks(), 0);
    }

    #[test]
    fn test_single_worker_preserves_spawn_order() {
        let pool = TaskPool::new(1);
        let (tx, rx) = mpsc::channel();
        for index in 0..8 {
            let tx = tx.clone();
            pool.spawn(move || {
                tx.send(index).unwrap();
            });
        }
        let order: Vec<i32> = (0..8)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(order, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_drop_drains_backlog() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = TaskPool::new(2);
            for _ in 0..32 {
                let counter = Arc::clone(&counter);
                pool.spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }
}
