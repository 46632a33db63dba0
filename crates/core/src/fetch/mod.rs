//! Fetch/query boundary for the documentation search service.
//!
//! The resolution pipeline never talks HTTP directly; it drives a
//! [`PageSession`] obtained from a [`SessionFactory`]. That keeps the network
//! stack swappable and lets tests substitute scripted sessions for the real
//! one, the same way analysis backends are swapped behind a trait.

use thiserror::Error;

mod http;

pub use http::HttpFactory;

/// Failure classes surfaced by the fetch layer.
///
/// `Transport` is the only retryable class; everything else is terminal for
/// the request that produced it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network/driver hiccup: connect failure, bad status, truncated body.
    #[error("transport error: {0}")]
    Transport(String),
    /// The page loaded but the expected element is not there.
    #[error("element not found: {0}")]
    NotFound(String),
    /// The fetch session itself could not be created.
    #[error("session init error: {0}")]
    SessionInit(String),
    /// Anything else (malformed selector, no page loaded, ...).
    #[error("{0}")]
    Other(String),
}

/// One page-fetching session: load a URL, then query the loaded document.
///
/// A session is owned by a single worker for the duration of one job.
pub trait PageSession {
    /// Fetch `url` and make it the current document.
    fn open(&mut self, url: &str) -> Result<(), FetchError>;

    /// Return the `href` of the first element matching `selector`.
    fn link_href(&self, selector: &str) -> Result<String, FetchError>;

    /// Return the concatenated text of the first element matching `selector`.
    fn element_text(&self, selector: &str) -> Result<String, FetchError>;
}

/// Creates page sessions for the resolution workers.
///
/// Implementations must serialize session creation internally: sessions are
/// slow and fragile to create concurrently, so creation goes through a single
/// exclusive gate even though many workers request sessions at once.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn PageSession>, FetchError>;
}
