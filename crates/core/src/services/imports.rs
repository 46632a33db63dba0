//! Import Source Adapter: turns the analysis engine's textual import listing
//! into a clean sequence of imported symbols.

use crate::model::ImportedSymbol;

/// Modules whose imports are never worth resolving (noise like the C runtime).
pub fn default_ignored_modules() -> Vec<String> {
    vec!["msvcrt".to_string()]
}

/// Parse a line-oriented import listing.
///
/// Each useful line carries an address token followed by a
/// `<module>.dll_<function>` token. Lines mentioning an ignored module
/// (case-insensitive) are dropped before job creation; lines that do not fit
/// the shape are skipped.
pub fn parse_import_listing(listing: &str, ignored_modules: &[String]) -> Vec<ImportedSymbol> {
    listing
        .lines()
        .filter(|line| !mentions_ignored_module(line, ignored_modules))
        .filter_map(parse_import_line)
        .collect()
}

fn mentions_ignored_module(line: &str, ignored_modules: &[String]) -> bool {
    let lowered = line.to_lowercase();
    ignored_modules.iter().any(|module| lowered.contains(&module.to_lowercase()))
}

fn parse_import_line(line: &str) -> Option<ImportedSymbol> {
    let mut tokens = line.split_whitespace();
    let address = tokens.next()?;
    let symbol = tokens.next()?;
    // Assume a dll will not be named <something>(.dll)+.dll.
    let (module, function) = symbol.split_once(".dll_")?;
    if function.is_empty() {
        return None;
    }
    Some(ImportedSymbol::new(address, function, format!("{module}.dll")))
}
