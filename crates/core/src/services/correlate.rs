//! Address Correlator: match resolved imports back to call sites.
//!
//! Import addresses come zero-padded (`0x00402010`) while call-instruction
//! text prints them short (`0x402010`), so import addresses are normalized
//! before matching. Matching is a raw substring test against the call site's
//! disassembly text; two imports whose normalized forms collide as substrings
//! of unrelated text is a known accuracy limitation, not a crash condition.

use std::collections::HashMap;

use crate::model::{Annotation, CallSite, EnrichmentTypes, ResolutionResult};

/// Collapse a `0x` prefix followed by a run of zero digits into a bare `0x`.
///
/// Idempotent; addresses with no leading zeros pass through unchanged.
pub fn normalize_address(address: &str) -> String {
    match address.strip_prefix("0x") {
        Some(rest) => format!("0x{}", rest.trim_start_matches('0')),
        None => address.to_string(),
    }
}

/// Produce one annotation per requested enrichment type for every call site
/// whose text contains a resolved import's normalized address.
///
/// A single import may match many call sites (one per call instruction
/// referencing it), and one call site may receive both a parameter-list and a
/// URL annotation. Imports are visited in address order so output is stable.
pub fn correlate(
    results: &HashMap<String, ResolutionResult>,
    calls: &[CallSite],
    types: EnrichmentTypes,
) -> Vec<Annotation> {
    let mut addresses: Vec<&String> = results.keys().collect();
    addresses.sort();

    let mut annotations = Vec::new();
    for address in addresses {
        let result = &results[address];
        let needle = normalize_address(address);
        for call in calls {
            if !call.code.contains(&needle) {
                continue;
            }
            if types.params {
                if let Some(params) = &result.params {
                    annotations.push(Annotation {
                        address: call.address,
                        text: format!("Parameters: {}", params.join(", ")),
                    });
                }
            }
            if types.urls {
                annotations.push(Annotation {
                    address: call.address,
                    text: format!("MSDN URL: {}", result.search_link),
                });
            }
        }
    }
    annotations
}
