//! Worker pool and job queue driving the resolution pipeline.
//!
//! All jobs are pre-loaded into one shared queue, then a burst of worker
//! threads drains it. The workload is network-bound and import counts are
//! small (tens, not thousands), so the default is one worker per job; a
//! `max_workers` cap bounds the burst for huge binaries without changing the
//! queue/join contract.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::model::{ImportedSymbol, ResolutionResult};
use crate::report::Reporter;
use crate::services::resolve::{Resolve, ResolveError};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cooperative cancellation flag shared between the pool, its workers, and
/// the frontend's interrupt handler.
///
/// Cancelling stops workers from picking up new jobs and unblocks the
/// pool-level join; in-flight requests are not torn down, their threads are
/// detached and simply never rejoined.
#[derive(Debug, Default)]
pub struct CancelToken {
    flag: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Concurrency-safe FIFO of pending jobs with a completion barrier.
///
/// `join` returns once every job handed out has been marked done with
/// `task_done`, or as soon as the token is cancelled. The wait polls the
/// condvar so a cancellation arriving from a signal handler can never leave
/// the caller blocked.
pub struct JobQueue<T> {
    state: Mutex<QueueState<T>>,
    cond: Condvar,
}

struct QueueState<T> {
    jobs: VecDeque<T>,
    outstanding: usize,
}

impl<T> JobQueue<T> {
    pub fn new(jobs: Vec<T>) -> Self {
        let outstanding = jobs.len();
        Self {
            state: Mutex::new(QueueState { jobs: jobs.into(), outstanding }),
            cond: Condvar::new(),
        }
    }

    /// Take the next job, or `None` once the queue is drained or cancelled.
    pub fn pop(&self, cancel: &CancelToken) -> Option<T> {
        if cancel.is_cancelled() {
            return None;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.jobs.pop_front()
    }

    /// Mark one previously popped job as terminal.
    pub fn task_done(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            self.cond.notify_all();
        }
    }

    /// Block until all jobs are done or the token is cancelled.
    pub fn join(&self, cancel: &CancelToken) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while state.outstanding > 0 && !cancel.is_cancelled() {
            let (guard, _) = self
                .cond
                .wait_timeout(state, JOIN_POLL_INTERVAL)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }
}

/// Fans the resolution pipeline out over all imports and collects results
/// into a map keyed by import address.
pub struct ResolutionPool {
    resolver: Arc<dyn Resolve>,
    reporter: Arc<Reporter>,
    max_workers: Option<usize>,
}

impl ResolutionPool {
    pub fn new(resolver: Arc<dyn Resolve>, reporter: Arc<Reporter>) -> Self {
        Self { resolver, reporter, max_workers: None }
    }

    /// Cap the worker burst; `None` keeps one worker per job.
    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Resolve every import and return the completed result map.
    ///
    /// Returns only after every submitted job has reached a terminal state
    /// (or the token was cancelled); no partial map is ever visible to the
    /// caller. The map's key set is a subset of the submitted addresses.
    pub fn run(
        &self,
        imports: Vec<ImportedSymbol>,
        cancel: &Arc<CancelToken>,
    ) -> HashMap<String, ResolutionResult> {
        let total = imports.len();
        if total == 0 {
            return HashMap::new();
        }

        let queue = Arc::new(JobQueue::new(imports));
        let results: Arc<Mutex<HashMap<String, ResolutionResult>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let workers = match self.max_workers {
            Some(cap) if cap > 0 => total.min(cap),
            _ => total,
        };
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let resolver = Arc::clone(&self.resolver);
            let reporter = Arc::clone(&self.reporter);
            let cancel = Arc::clone(cancel);
            // Detached on purpose: on interrupt the process exits without
            // waiting for stragglers, matching daemon-thread semantics.
            thread::spawn(move || {
                while let Some(symbol) = queue.pop(&cancel) {
                    // A panicking resolver must not take the worker (or the
                    // join barrier) down with it: the job is marked terminal
                    // unconditionally and the worker keeps draining.
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        process_job(resolver.as_ref(), &reporter, &results, symbol.clone());
                    }));
                    if let Err(payload) = outcome {
                        reporter.info(&format!(
                            "An unexpected error happened getting results for imported function \
                             \"{}\" from \"{}\". Error: {}",
                            symbol.function,
                            symbol.module,
                            panic_message(payload.as_ref())
                        ));
                    }
                    queue.task_done();
                }
            });
        }

        queue.join(cancel);
        let map = results.lock().unwrap_or_else(|e| e.into_inner());
        map.clone()
    }
}

/// Best-effort text of a worker panic payload for the diagnostic line.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "worker panicked"
    }
}

/// Run the pipeline for one job and record its terminal state.
///
/// Every failure class is contained right here: one diagnostic line naming
/// the function/module, and the job finishes with no result.
fn process_job(
    resolver: &dyn Resolve,
    reporter: &Reporter,
    results: &Mutex<HashMap<String, ResolutionResult>>,
    symbol: ImportedSymbol,
) {
    match resolver.resolve(&symbol) {
        Ok(Some(result)) => {
            let mut map = results.lock().unwrap_or_else(|e| e.into_inner());
            map.insert(symbol.address.clone(), result);
        }
        Ok(None) => {
            reporter.info(&format!(
                "Function {} for module {} could not be found on online MSDN",
                symbol.function, symbol.module
            ));
        }
        Err(err @ ResolveError::NotFound { .. }) => {
            reporter.info(&err.to_string());
        }
        Err(ResolveError::Transport(reason)) => {
            reporter.info(&format!(
                "Transport error requesting MSDN for \"{}\" from \"{}\": {reason}",
                symbol.function, symbol.module
            ));
        }
        Err(ResolveError::SessionInit(reason)) => {
            reporter.info(&format!(
                "Fetch session could not be created for \"{}\" from \"{}\": {reason}. \
                 Rerun on a fresh session",
                symbol.function, symbol.module
            ));
        }
        Err(ResolveError::Other(reason)) => {
            reporter.info(&format!(
                "An unexpected error happened getting results for imported function \
                 \"{}\" from \"{}\". Error: {reason}",
                symbol.function, symbol.module
            ));
        }
    }
}
