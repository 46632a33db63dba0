//! Core data model for imports, resolution results, call sites, and
//! annotations.
//!
//! Everything here is plain data: the resolution pipeline and the correlator
//! only read these types, they never mutate them after construction.

use serde::{Deserialize, Serialize};

/// One entry of the binary's import table, as reported by the analysis engine.
///
/// `address` is the canonical hex form (e.g. `0x00402010`) and is the natural
/// key for a run: the result map is keyed by it and no two imports share one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedSymbol {
    pub address: String,
    pub function: String,
    pub module: String,
}

impl ImportedSymbol {
    pub fn new(
        address: impl Into<String>,
        function: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self { address: address.into(), function: function.into(), module: module.into() }
    }
}

/// Documentation metadata resolved for one import.
///
/// `params` is absent when parameter enrichment was not requested or the
/// detail page had no usable code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub function: String,
    pub module: String,
    pub search_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

/// A call instruction found by the analysis engine's instruction search.
///
/// `code` is raw disassembly text; addresses inside it may be printed without
/// the leading zeros that import addresses carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub address: u64,
    pub code: String,
}

/// A comment to attach at an address in the analysis database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub address: u64,
    pub text: String,
}

/// A metadata category the user asked to feed into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKind {
    /// Parameter lists for imported functions.
    Imports,
    /// MSDN documentation URLs.
    Urls,
}

/// The set of enrichment categories requested for a run.
///
/// An empty request means URLs only; that is the historical default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentTypes {
    pub params: bool,
    pub urls: bool,
}

impl EnrichmentTypes {
    pub fn from_kinds(kinds: &[EnrichmentKind]) -> Self {
        if kinds.is_empty() {
            return Self::default();
        }
        Self {
            params: kinds.contains(&EnrichmentKind::Imports),
            urls: kinds.contains(&EnrichmentKind::Urls),
        }
    }
}

impl Default for EnrichmentTypes {
    fn default() -> Self {
        Self { params: false, urls: true }
    }
}

/// Counters and timing reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Imports submitted to the resolution pool.
    pub imports: usize,
    /// Imports for which a documentation link was found.
    pub resolved: usize,
    /// Annotations written to the analysis database.
    pub annotated: usize,
    /// RFC 3339 timestamp taken when the pool started.
    pub started_at: String,
    /// Wall-clock seconds spent in the resolution pool.
    pub elapsed_secs: f64,
}
