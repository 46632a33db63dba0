//! Resolution pipeline: fetch and parse MSDN metadata for one import.
//!
//! Each worker runs this pipeline for one imported symbol at a time: open a
//! fetch session, request the search page (with retry), pick the first result
//! link on the documentation host, and optionally pull the parameter list off
//! the detail page.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::{FetchError, PageSession, SessionFactory};
use crate::model::{ImportedSymbol, ResolutionResult};
use crate::report::Reporter;

/// Result links are only accepted from this host path; anything else on the
/// search page is an ad or a forum thread.
pub const RESULT_HOST_PREFIX: &str = "https://msdn.microsoft.com/en-us/library/windows/desktop/";

const RESULT_LINK_SELECTOR: &str = "a.resultTitleLink";
const CODE_SNIPPET_SELECTOR: &str = ".codeSnippetContainerCode div pre";

/// Build the MSDN search URL for one imported function.
pub fn search_url(function: &str, module: &str) -> String {
    format!(
        "https://social.msdn.microsoft.com/search/en-US/windows?query={function}%20{module}&refinement=181"
    )
}

/// Per-job failure classes. All of them are contained at the job boundary:
/// the pool logs one line and moves on, no failure reaches a sibling job.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The expected page element is absent; an ordinary miss, not a fault.
    #[error("Result not found for imported function \"{function}\" from \"{module}\"")]
    NotFound { function: String, module: String },
    /// Network hiccup that survived every retry.
    #[error("transport failure requesting MSDN: {0}")]
    Transport(String),
    /// The fetch session could not be created; the job's work is abandoned.
    #[error("fetch session could not be created: {0}")]
    SessionInit(String),
    /// Anything unclassified; logged with full detail.
    #[error("{0}")]
    Other(String),
}

/// Retry policy for individual page requests.
///
/// Only transient transport failures are retried; a missing element is a
/// final answer. Nothing above the single request ever retries.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { retry_attempts: 3, retry_delay: Duration::from_secs(2) }
    }
}

/// Seam between the worker pool and the network.
///
/// The pool only sees this trait, so tests can drive it with stub resolvers
/// and the real [`DocResolver`] stays the only code that touches HTTP.
pub trait Resolve: Send + Sync {
    /// `Ok(None)` means the search page had a first result, but not on the
    /// documentation host. A missing result element is `Err(NotFound)`.
    fn resolve(&self, symbol: &ImportedSymbol) -> Result<Option<ResolutionResult>, ResolveError>;
}

/// Real resolver: MSDN search + optional detail-page parameter extraction.
pub struct DocResolver {
    factory: Arc<dyn SessionFactory>,
    config: ResolverConfig,
    fetch_params: bool,
    reporter: Arc<Reporter>,
}

impl DocResolver {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: ResolverConfig,
        fetch_params: bool,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self { factory, config, fetch_params, reporter }
    }

    /// Request `url` with the configured retry policy.
    fn request(&self, session: &mut dyn PageSession, url: &str) -> Result<(), FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.reporter.debug(&format!("Requesting {url}"));
            match session.open(url) {
                Ok(()) => return Ok(()),
                Err(FetchError::Transport(reason)) if attempt < self.config.retry_attempts => {
                    self.reporter.debug(&format!(
                        "Transient failure requesting {url} (attempt {attempt}): {reason}"
                    ));
                    thread::sleep(self.config.retry_delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn classify(err: FetchError, symbol: &ImportedSymbol) -> ResolveError {
        match err {
            FetchError::NotFound(_) => ResolveError::NotFound {
                function: symbol.function.clone(),
                module: symbol.module.clone(),
            },
            FetchError::Transport(reason) => ResolveError::Transport(reason),
            FetchError::SessionInit(reason) => ResolveError::SessionInit(reason),
            FetchError::Other(reason) => ResolveError::Other(reason),
        }
    }

    /// Fetch the detail page and attach the parameter list to `result`.
    ///
    /// The link-only result is already worth keeping at this point, so any
    /// failure here is logged and swallowed rather than discarding it.
    fn attach_params(
        &self,
        session: &mut dyn PageSession,
        symbol: &ImportedSymbol,
        result: &mut ResolutionResult,
    ) {
        if let Err(err) = self.request(session, &result.search_link) {
            self.reporter.info(&format!(
                "Could not fetch detail page for \"{}\" from \"{}\": {err}",
                symbol.function, symbol.module
            ));
            return;
        }
        match session.element_text(CODE_SNIPPET_SELECTOR) {
            Ok(snippet) => {
                let params = parse_signature_params(&snippet);
                if !params.is_empty() {
                    result.params = Some(params);
                }
            }
            // No code block on the detail page: keep the result without params.
            Err(FetchError::NotFound(_)) => {}
            Err(err) => {
                self.reporter.info(&format!(
                    "Could not extract parameters for \"{}\" from \"{}\": {err}",
                    symbol.function, symbol.module
                ));
            }
        }
    }
}

impl Resolve for DocResolver {
    fn resolve(&self, symbol: &ImportedSymbol) -> Result<Option<ResolutionResult>, ResolveError> {
        let mut session =
            self.factory.open_session().map_err(|e| Self::classify(e, symbol))?;
        let url = search_url(&symbol.function, &symbol.module);
        self.request(session.as_mut(), &url).map_err(|e| Self::classify(e, symbol))?;

        let href = session
            .link_href(RESULT_LINK_SELECTOR)
            .map_err(|e| Self::classify(e, symbol))?;
        if !href.starts_with(RESULT_HOST_PREFIX) {
            return Ok(None);
        }

        let mut result = ResolutionResult {
            function: symbol.function.clone(),
            module: symbol.module.clone(),
            search_link: href,
            params: None,
        };
        if self.fetch_params {
            self.attach_params(session.as_mut(), symbol, &mut result);
        }
        Ok(Some(result))
    }
}

/// Extract a parameter list from a signature code block.
///
/// The first and last lines are the signature open/close; every line in
/// between is one parameter. Internal whitespace collapses to single spaces
/// and trailing commas are stripped, preserving source order.
pub fn parse_signature_params(snippet: &str) -> Vec<String> {
    let lines: Vec<&str> = snippet.lines().collect();
    if lines.len() <= 2 {
        return Vec::new();
    }
    lines[1..lines.len() - 1]
        .iter()
        .map(|line| {
            line.split_whitespace().collect::<Vec<_>>().join(" ").trim_end_matches(',').to_string()
        })
        .filter(|param| !param.is_empty())
        .collect()
}
