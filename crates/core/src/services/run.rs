//! Orchestration of one enrichment run against a live radare2 session.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::model::{EnrichmentTypes, RunSummary};
use crate::r2::{parse_call_sites, R2Error, R2Session};
use crate::report::Reporter;
use crate::services::correlate::correlate;
use crate::services::imports::{default_ignored_modules, parse_import_listing};
use crate::services::pool::{CancelToken, ResolutionPool};
use crate::services::resolve::Resolve;

// Column grep over the import listing: r2 cannot select columns without a
// grep, so grep for "plt" which appears on every import line.
const LIST_IMPORTS_CMD: &str = "ii~plt[3,9]";
const LIST_CALLS_CMD: &str = "/cj call";

/// Knobs for one enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub types: EnrichmentTypes,
    /// Cap on concurrent resolution workers; `None` means one per import.
    pub max_workers: Option<usize>,
    pub ignored_modules: Vec<String>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            types: EnrichmentTypes::default(),
            max_workers: None,
            ignored_modules: default_ignored_modules(),
        }
    }
}

/// Run the full pipeline: analyze, list imports, resolve them concurrently,
/// correlate against call sites, and write annotations back to the session.
///
/// Cancellation stops new requests and new annotations; anything already
/// written stays written. A run with zero resolutions completes normally and
/// reports zero annotations.
pub fn enrich(
    session: &mut dyn R2Session,
    resolver: Arc<dyn Resolve>,
    options: &EnrichOptions,
    reporter: &Arc<Reporter>,
    cancel: &Arc<CancelToken>,
) -> Result<RunSummary, R2Error> {
    session.cmd("aa")?;
    let listing = session.cmd(LIST_IMPORTS_CMD)?;
    let imports = parse_import_listing(&listing, &options.ignored_modules);
    let submitted = imports.len();
    reporter.info(&format!(
        "Getting parameters for {submitted} imported functions from MSDN. This might take a while..."
    ));

    let started_at = Utc::now().to_rfc3339();
    let start = Instant::now();
    let pool = ResolutionPool::new(resolver, Arc::clone(reporter))
        .with_max_workers(options.max_workers);
    let results = pool.run(imports, cancel);
    let elapsed_secs = start.elapsed().as_secs_f64();
    reporter.info(&format!(
        "Parameters were found for {} imported functions in {:.1} seconds",
        results.len(),
        elapsed_secs
    ));

    let calls = if cancel.is_cancelled() {
        Vec::new()
    } else {
        parse_call_sites(&session.cmd(LIST_CALLS_CMD)?)?
    };
    let annotations = correlate(&results, &calls, options.types);

    let mut annotated = 0;
    for annotation in &annotations {
        if cancel.is_cancelled() {
            break;
        }
        reporter.debug(&format!(
            "Annotation \"{}\" added to address \"0x{:x}\"",
            annotation.text, annotation.address
        ));
        session.cmd(&format!("CC {} @ 0x{:x}", annotation.text, annotation.address))?;
        annotated += 1;
    }
    reporter.info(&format!("{annotated} annotations added to import call sites"));

    Ok(RunSummary {
        imports: submitted,
        resolved: results.len(),
        annotated,
        started_at,
        elapsed_secs,
    })
}
