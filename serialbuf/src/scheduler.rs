//! Task scheduling for the drain loop.
//!
//! A scheduler is handed one unit of work (a drain burst) and runs it
//! forever: run the work, yield, run it again. The work reports whether it
//! made progress so a scheduler may back off while the port is idle.
//!
//! - `CooperativeScheduler`: round-robin, driven explicitly by the caller
//! - `ThreadScheduler`: one OS thread per task (requires `std` feature)
//! - `TokioScheduler`: one tokio task per task (requires `tokio` feature)

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;

/// Outcome of one unit of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Work was done; run again soon.
    Progress,

    /// Nothing to do right now.
    Idle,
}

/// Handle to a spawned task.
///
/// Drain tasks run for the lifetime of the program, so the handle can only
/// be asked whether the task is still there.
pub trait TaskHandle: Send {
    /// Returns true if the task has stopped (panicked, or its scheduler went away).
    fn is_finished(&self) -> bool;
}

/// Starts background tasks.
pub trait Scheduler {
    /// Spawns a task that calls `work` repeatedly, yielding between calls.
    fn spawn<F>(&self, name: &str, work: F) -> Result<Box<dyn TaskHandle>>
    where
        F: FnMut() -> Step + Send + 'static;
}

struct CooperativeTask {
    name: String,
    work: Box<dyn FnMut() -> Step + Send>,
    finished: Arc<AtomicBool>,
}

/// A single-threaded round-robin scheduler.
///
/// Nothing runs until the owner calls [`run_turn`](Self::run_turn): each
/// turn gives every task one unit of work. This is the shape of a bare-metal
/// super-loop, and it makes drain behaviour deterministic under test.
#[derive(Default)]
pub struct CooperativeScheduler {
    tasks: RefCell<Vec<CooperativeTask>>,
}

impl CooperativeScheduler {
    pub fn new() -> Self {
        Self {
            tasks: RefCell::new(Vec::new()),
        }
    }

    /// Returns the number of spawned tasks.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs every task once. Returns how many made progress.
    ///
    /// Must not be called from inside a task.
    pub fn run_turn(&self) -> usize {
        let mut tasks = self.tasks.borrow_mut();
        let mut progressed = 0;
        for task in tasks.iter_mut() {
            if (task.work)() == Step::Progress {
                progressed += 1;
            }
        }
        progressed
    }

    /// Runs turns until one makes no progress, or `max_turns` is reached.
    ///
    /// Returns the number of turns run.
    pub fn run_until_idle(&self, max_turns: usize) -> usize {
        for turn in 1..=max_turns {
            if self.run_turn() == 0 {
                return turn;
            }
        }
        max_turns
    }

    /// Returns the names of the spawned tasks, in spawn order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.borrow().iter().map(|t| t.name.clone()).collect()
    }
}

impl core::fmt::Debug for CooperativeScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CooperativeScheduler")
            .field("tasks", &self.task_names())
            .finish()
    }
}

impl Drop for CooperativeScheduler {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().iter() {
            task.finished.store(true, Ordering::Release);
        }
    }
}

struct CooperativeHandle {
    finished: Arc<AtomicBool>,
}

impl TaskHandle for CooperativeHandle {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Scheduler for CooperativeScheduler {
    fn spawn<F>(&self, name: &str, work: F) -> Result<Box<dyn TaskHandle>>
    where
        F: FnMut() -> Step + Send + 'static,
    {
        let finished = Arc::new(AtomicBool::new(false));
        self.tasks.borrow_mut().push(CooperativeTask {
            name: String::from(name),
            work: Box::new(work),
            finished: Arc::clone(&finished),
        });
        Ok(Box::new(CooperativeHandle { finished }))
    }
}

#[cfg(feature = "std")]
pub use self::thread::ThreadScheduler;

#[cfg(feature = "std")]
mod thread {
    use std::boxed::Box;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use log::error;

    use super::{Scheduler, Step, TaskHandle};
    use crate::error::{Error, ErrorKind, Result};

    /// Runs each task on its own named OS thread.
    ///
    /// Between bursts the thread calls `yield_now`; with an idle back-off
    /// configured it sleeps instead whenever a burst found nothing to do.
    #[derive(Debug, Clone, Default)]
    pub struct ThreadScheduler {
        stack_size: Option<usize>,
        idle_backoff: Option<Duration>,
    }

    impl ThreadScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_stack_size(mut self, size: usize) -> Self {
            self.stack_size = Some(size);
            self
        }

        pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
            self.idle_backoff = Some(backoff);
            self
        }
    }

    impl TaskHandle for JoinHandle<()> {
        fn is_finished(&self) -> bool {
            JoinHandle::is_finished(self)
        }
    }

    impl Scheduler for ThreadScheduler {
        fn spawn<F>(&self, name: &str, mut work: F) -> Result<Box<dyn TaskHandle>>
        where
            F: FnMut() -> Step + Send + 'static,
        {
            let mut builder = thread::Builder::new().name(name.into());
            if let Some(size) = self.stack_size {
                builder = builder.stack_size(size);
            }

            let backoff = self.idle_backoff;
            let handle: JoinHandle<()> = builder
                .spawn(move || loop {
                    match (work(), backoff) {
                        (Step::Idle, Some(pause)) => thread::sleep(pause),
                        _ => thread::yield_now(),
                    }
                })
                .map_err(|e| {
                    error!("failed to spawn thread {}: {}", name, e);
                    Error::new(ErrorKind::Spawn)
                })?;

            Ok(Box::new(handle))
        }
    }
}

#[cfg(feature = "tokio")]
pub use self::tokio_rt::TokioScheduler;

#[cfg(feature = "tokio")]
mod tokio_rt {
    use std::boxed::Box;
    use std::time::Duration;

    use log::debug;
    use tokio::runtime::Handle;
    use tokio::task::JoinHandle;

    use super::{Scheduler, Step, TaskHandle};
    use crate::error::Result;

    /// Runs each task as a tokio task, `yield_now().await` between bursts.
    #[derive(Debug, Clone)]
    pub struct TokioScheduler {
        handle: Handle,
        idle_backoff: Option<Duration>,
    }

    impl TokioScheduler {
        /// Schedules onto the given runtime.
        pub fn new(handle: Handle) -> Self {
            Self {
                handle,
                idle_backoff: None,
            }
        }

        /// Schedules onto the runtime of the calling context.
        ///
        /// Panics outside a tokio runtime.
        pub fn current() -> Self {
            Self::new(Handle::current())
        }

        pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
            self.idle_backoff = Some(backoff);
            self
        }
    }

    impl TaskHandle for JoinHandle<()> {
        fn is_finished(&self) -> bool {
            JoinHandle::is_finished(self)
        }
    }

    impl Scheduler for TokioScheduler {
        fn spawn<F>(&self, name: &str, mut work: F) -> Result<Box<dyn TaskHandle>>
        where
            F: FnMut() -> Step + Send + 'static,
        {
            debug!("spawning tokio task {}", name);
            let backoff = self.idle_backoff;
            let handle: JoinHandle<()> = self.handle.spawn(async move {
                loop {
                    match (work(), backoff) {
                        (Step::Idle, Some(pause)) => tokio::time::sleep(pause).await,
                        _ => tokio::task::yield_now().await,
                    }
                }
            });
            Ok(Box::new(handle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    #[test]
    fn test_cooperative_runs_each_task_per_turn() {
        let scheduler = CooperativeScheduler::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&a);
        scheduler
            .spawn("a", move || {
                counter.fetch_add(1, Ordering::Relaxed);
                Step::Progress
            })
            .unwrap();
        let counter = Arc::clone(&b);
        scheduler
            .spawn("b", move || {
                counter.fetch_add(1, Ordering::Relaxed);
                Step::Idle
            })
            .unwrap();

        assert_eq!(scheduler.run_turn(), 1);
        assert_eq!(scheduler.run_turn(), 1);
        assert_eq!(a.load(Ordering::Relaxed), 2);
        assert_eq!(b.load(Ordering::Relaxed), 2);
        assert_eq!(scheduler.task_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_run_until_idle_stops_early() {
        let scheduler = CooperativeScheduler::new();
        let mut remaining = 3;
        scheduler
            .spawn("countdown", move || {
                if remaining == 0 {
                    return Step::Idle;
                }
                remaining -= 1;
                Step::Progress
            })
            .unwrap();

        assert_eq!(scheduler.run_until_idle(100), 4);
        assert_eq!(scheduler.run_until_idle(100), 1);
    }

    #[test]
    fn test_handle_reports_scheduler_drop() {
        let scheduler = CooperativeScheduler::new();
        let handle = scheduler.spawn("idle", || Step::Idle).unwrap();

        assert!(!handle.is_finished());
        drop(scheduler);
        assert!(handle.is_finished());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_thread_scheduler_runs_work() {
        use std::time::{Duration, Instant};

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let handle = ThreadScheduler::new()
            .with_idle_backoff(Duration::from_millis(1))
            .spawn("test-worker", move || {
                counter.fetch_add(1, Ordering::Relaxed);
                Step::Idle
            })
            .unwrap();

        let start = Instant::now();
        while runs.load(Ordering::Relaxed) < 3 {
            assert!(start.elapsed() < Duration::from_secs(5), "worker never ran");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(!handle.is_finished());
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_tokio_scheduler_runs_work() {
        use std::time::Duration;

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let handle = TokioScheduler::current()
            .spawn("test-worker", move || {
                counter.fetch_add(1, Ordering::Relaxed);
                Step::Progress
            })
            .unwrap();

        for _ in 0..100 {
            if runs.load(Ordering::Relaxed) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(runs.load(Ordering::Relaxed) >= 3);
        assert!(!handle.is_finished());
    }
}
