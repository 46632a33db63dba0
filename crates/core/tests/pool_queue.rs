use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use docnote_core::model::{ImportedSymbol, ResolutionResult};
use docnote_core::report::Reporter;
use docnote_core::services::pool::{CancelToken, JobQueue, ResolutionPool};
use docnote_core::services::resolve::{Resolve, ResolveError};

fn symbol(address: &str) -> ImportedSymbol {
    ImportedSymbol::new(address, "SomeFunc", "some.dll")
}

fn hit(symbol: &ImportedSymbol) -> ResolutionResult {
    ResolutionResult {
        function: symbol.function.clone(),
        module: symbol.module.clone(),
        search_link: format!("https://msdn.microsoft.com/{}", symbol.address),
        params: None,
    }
}

/// Resolver whose outcome is scripted per import address.
struct ScriptedResolver {
    outcomes: HashMap<String, Outcome>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Clone, Copy)]
enum Outcome {
    Hit,
    Miss,
    NotFound,
    Transport,
}

impl ScriptedResolver {
    fn new(outcomes: HashMap<String, Outcome>) -> Self {
        Self {
            outcomes,
            delay: Duration::from_millis(5),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl Resolve for ScriptedResolver {
    fn resolve(&self, symbol: &ImportedSymbol) -> Result<Option<ResolutionResult>, ResolveError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.outcomes.get(&symbol.address).copied().unwrap_or(Outcome::Miss) {
            Outcome::Hit => Ok(Some(hit(symbol))),
            Outcome::Miss => Ok(None),
            Outcome::NotFound => Err(ResolveError::NotFound {
                function: symbol.function.clone(),
                module: symbol.module.clone(),
            }),
            Outcome::Transport => Err(ResolveError::Transport("connection reset".into())),
        }
    }
}

#[test]
fn run_returns_after_all_jobs_reach_a_terminal_state() {
    let mut outcomes = HashMap::new();
    outcomes.insert("0x1".to_string(), Outcome::Hit);
    outcomes.insert("0x2".to_string(), Outcome::Miss);
    outcomes.insert("0x3".to_string(), Outcome::NotFound);
    outcomes.insert("0x4".to_string(), Outcome::Transport);
    outcomes.insert("0x5".to_string(), Outcome::Hit);
    let resolver = Arc::new(ScriptedResolver::new(outcomes));

    let pool = ResolutionPool::new(resolver, Arc::new(Reporter::new(false)));
    let jobs: Vec<ImportedSymbol> = ["0x1", "0x2", "0x3", "0x4", "0x5"]
        .iter()
        .map(|a| symbol(a))
        .collect();
    let submitted: Vec<String> = jobs.iter().map(|j| j.address.clone()).collect();

    let results = pool.run(jobs, &Arc::new(CancelToken::new()));

    // Key set is exactly the successful subset of the submitted addresses.
    let mut keys: Vec<&String> = results.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["0x1", "0x5"]);
    assert!(results.keys().all(|k| submitted.contains(k)));
}

#[test]
fn a_failing_job_never_blocks_its_siblings() {
    let mut outcomes = HashMap::new();
    for i in 0..8 {
        let outcome = if i == 3 { Outcome::Transport } else { Outcome::Hit };
        outcomes.insert(format!("0x{i}"), outcome);
    }
    let resolver = Arc::new(ScriptedResolver::new(outcomes));

    let pool = ResolutionPool::new(resolver, Arc::new(Reporter::new(false)));
    let jobs: Vec<ImportedSymbol> = (0..8).map(|i| symbol(&format!("0x{i}"))).collect();
    let results = pool.run(jobs, &Arc::new(CancelToken::new()));

    assert_eq!(results.len(), 7);
    assert!(!results.contains_key("0x3"));
}

#[test]
fn max_workers_caps_concurrency() {
    let outcomes: HashMap<String, Outcome> =
        (0..6).map(|i| (format!("0x{i}"), Outcome::Hit)).collect();
    let resolver = Arc::new(ScriptedResolver::new(outcomes));

    let pool = ResolutionPool::new(Arc::clone(&resolver) as Arc<dyn Resolve>, Arc::new(Reporter::new(false)))
        .with_max_workers(Some(2));
    let jobs: Vec<ImportedSymbol> = (0..6).map(|i| symbol(&format!("0x{i}"))).collect();
    let results = pool.run(jobs, &Arc::new(CancelToken::new()));

    assert_eq!(results.len(), 6);
    assert!(resolver.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[test]
fn empty_job_list_completes_immediately() {
    let resolver = Arc::new(ScriptedResolver::new(HashMap::new()));
    let pool = ResolutionPool::new(resolver, Arc::new(Reporter::new(false)));
    let results = pool.run(Vec::new(), &Arc::new(CancelToken::new()));
    assert!(results.is_empty());
}

#[test]
fn cancelled_token_stops_new_jobs_and_unblocks_run() {
    let outcomes: HashMap<String, Outcome> =
        (0..4).map(|i| (format!("0x{i}"), Outcome::Hit)).collect();
    let resolver = Arc::new(ScriptedResolver::new(outcomes));

    let cancel = Arc::new(CancelToken::new());
    cancel.cancel();

    let pool = ResolutionPool::new(resolver, Arc::new(Reporter::new(false)));
    let jobs: Vec<ImportedSymbol> = (0..4).map(|i| symbol(&format!("0x{i}"))).collect();
    let results = pool.run(jobs, &cancel);
    assert!(results.is_empty());
}

/// Resolver that panics for one scripted address.
struct PanickingResolver {
    poison: String,
}

impl Resolve for PanickingResolver {
    fn resolve(&self, symbol: &ImportedSymbol) -> Result<Option<ResolutionResult>, ResolveError> {
        if symbol.address == self.poison {
            panic!("resolver blew up");
        }
        Ok(Some(hit(symbol)))
    }
}

#[test]
fn a_panicking_job_still_reaches_a_terminal_state() {
    let resolver = Arc::new(PanickingResolver { poison: "0x1".to_string() });
    let pool = ResolutionPool::new(resolver, Arc::new(Reporter::new(false)));
    let jobs: Vec<ImportedSymbol> = (0..3).map(|i| symbol(&format!("0x{i}"))).collect();

    // Must return (not hang): the poisoned job is marked terminal too.
    let results = pool.run(jobs, &Arc::new(CancelToken::new()));
    assert_eq!(results.len(), 2);
    assert!(!results.contains_key("0x1"));
}

#[test]
fn a_panicking_job_does_not_kill_a_capped_worker() {
    // One worker for three jobs: if the panic tore the worker down, the
    // remaining jobs would never be picked up and run would never return.
    let resolver = Arc::new(PanickingResolver { poison: "0x0".to_string() });
    let pool = ResolutionPool::new(resolver as Arc<dyn Resolve>, Arc::new(Reporter::new(false)))
        .with_max_workers(Some(1));
    let jobs: Vec<ImportedSymbol> = (0..3).map(|i| symbol(&format!("0x{i}"))).collect();

    let results = pool.run(jobs, &Arc::new(CancelToken::new()));
    let mut keys: Vec<&String> = results.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["0x1", "0x2"]);
}

/// Resolver that cancels the shared token as soon as the first job finishes.
struct CancellingResolver {
    cancel: Arc<CancelToken>,
    processed: AtomicUsize,
}

impl Resolve for CancellingResolver {
    fn resolve(&self, symbol: &ImportedSymbol) -> Result<Option<ResolutionResult>, ResolveError> {
        self.processed.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        Ok(Some(hit(symbol)))
    }
}

#[test]
fn cancellation_mid_run_stops_issuing_new_jobs() {
    let cancel = Arc::new(CancelToken::new());
    let resolver = Arc::new(CancellingResolver {
        cancel: Arc::clone(&cancel),
        processed: AtomicUsize::new(0),
    });

    // One worker, four jobs: the worker cancels during the first job, so the
    // remaining three are never picked up.
    let pool = ResolutionPool::new(
        Arc::clone(&resolver) as Arc<dyn Resolve>,
        Arc::new(Reporter::new(false)),
    )
    .with_max_workers(Some(1));
    let jobs: Vec<ImportedSymbol> = (0..4).map(|i| symbol(&format!("0x{i}"))).collect();
    let results = pool.run(jobs, &cancel);

    assert_eq!(resolver.processed.load(Ordering::SeqCst), 1);
    assert!(results.len() <= 1);
}

#[test]
fn job_queue_join_waits_for_task_done() {
    let queue = Arc::new(JobQueue::new(vec![1, 2, 3]));
    let cancel = CancelToken::new();

    let worker_queue = Arc::clone(&queue);
    let handle = thread::spawn(move || {
        let cancel = CancelToken::new();
        let mut seen = Vec::new();
        while let Some(job) = worker_queue.pop(&cancel) {
            seen.push(job);
            worker_queue.task_done();
        }
        seen
    });

    queue.join(&cancel);
    let seen = handle.join().expect("worker panicked");
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn job_queue_join_returns_promptly_on_cancel() {
    // No worker ever calls task_done; only cancellation can unblock join.
    let queue: JobQueue<u32> = JobQueue::new(vec![1, 2, 3]);
    let cancel = CancelToken::new();
    cancel.cancel();
    queue.join(&cancel);
}
