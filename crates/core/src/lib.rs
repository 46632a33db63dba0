//! docnote-core
//!
//! Core library for enriching a disassembled binary's imported-symbol table
//! with documentation metadata (parameter lists and MSDN URLs) and annotating
//! the call sites that reference those imports.
//!
//! This crate defines the data model, the import-listing adapter, the
//! concurrent resolution pipeline, the call-site correlator, and the radare2
//! session boundary. The goal is to keep all substantive logic here so it is
//! fully testable and reusable from multiple frontends (CLI, scripting, etc.).

pub mod fetch;
pub mod model;
pub mod r2;
pub mod report;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
