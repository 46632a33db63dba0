use std::sync::Mutex;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::fetch::{FetchError, PageSession, SessionFactory};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Real [`SessionFactory`] backed by a blocking HTTP agent.
pub struct HttpFactory {
    timeout: Duration,
    // Single-permit gate: concurrent agent construction has been seen to
    // trigger connection resets with browser-driver backends, so creation is
    // serialized across all workers.
    init_gate: Mutex<()>,
}

impl HttpFactory {
    pub fn new() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, init_gate: Mutex::new(()) }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout, init_gate: Mutex::new(()) }
    }
}

impl Default for HttpFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory for HttpFactory {
    fn open_session(&self) -> Result<Box<dyn PageSession>, FetchError> {
        let _gate = self.init_gate.lock().unwrap_or_else(|e| e.into_inner());
        let agent = ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .redirects(8)
            .build();
        Ok(Box::new(HttpSession { agent, document: None }))
    }
}

/// HTTP-backed page session: fetches a page, parses it, answers CSS queries.
struct HttpSession {
    agent: ureq::Agent,
    document: Option<Html>,
}

impl HttpSession {
    fn document(&self) -> Result<&Html, FetchError> {
        self.document.as_ref().ok_or_else(|| FetchError::Other("no page loaded".into()))
    }

    fn first_element<'a>(
        doc: &'a Html,
        selector: &str,
    ) -> Result<scraper::ElementRef<'a>, FetchError> {
        let parsed = Selector::parse(selector)
            .map_err(|e| FetchError::Other(format!("bad selector {selector:?}: {e}")))?;
        doc.select(&parsed)
            .next()
            .ok_or_else(|| FetchError::NotFound(format!("no element matches {selector:?}")))
    }
}

impl PageSession for HttpSession {
    fn open(&mut self, url: &str) -> Result<(), FetchError> {
        // Non-2xx statuses surface as errors here; classify them as transport
        // failures so the pipeline's retry policy applies.
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let body = response
            .into_string()
            .map_err(|e| FetchError::Transport(format!("reading body of {url}: {e}")))?;
        self.document = Some(Html::parse_document(&body));
        Ok(())
    }

    fn link_href(&self, selector: &str) -> Result<String, FetchError> {
        let doc = self.document()?;
        let element = Self::first_element(doc, selector)?;
        element
            .value()
            .attr("href")
            .map(str::to_string)
            .ok_or_else(|| FetchError::NotFound(format!("element {selector:?} has no href")))
    }

    fn element_text(&self, selector: &str) -> Result<String, FetchError> {
        let doc = self.document()?;
        let element = Self::first_element(doc, selector)?;
        Ok(element.text().collect::<String>())
    }
}
