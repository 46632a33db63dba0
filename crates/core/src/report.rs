//! Serialized diagnostic output shared by all worker threads.

use std::sync::Mutex;

/// Thread-safe progress/diagnostic printer.
///
/// Workers from the resolution pool log concurrently; routing every line
/// through one lock guarantees lines are never split mid-line. Debug lines
/// are only emitted when verbose mode is on.
#[derive(Debug, Default)]
pub struct Reporter {
    verbose: bool,
    lock: Mutex<()>,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, lock: Mutex::new(()) }
    }

    /// Print one progress/diagnostic line.
    pub fn info(&self, msg: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        println!("[docnote] {msg}");
    }

    /// Print one debug line; no-op unless verbose mode is on.
    pub fn debug(&self, msg: &str) {
        if !self.verbose {
            return;
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        println!("[docnote] [debug] {msg}");
    }
}
