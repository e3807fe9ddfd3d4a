// BattScan - core/discovery.rs
//
// Candidate log discovery with a three-tier fallback search.
//
// Vendor tooling sometimes nests logs one directory deeper or names them
// inconsistently; the fallback tiers maximise the chance of finding
// *something* parseable without over-matching when well-formed names exist:
//   1. canonically named files at the top level;
//   2. the same pattern one directory deeper;
//   3. any generic .log file at the top level (permissive last resort).
// The search stops at the first non-empty tier.

use crate::core::index::DocumentIndex;
use crate::core::latest;
use crate::core::model::LogEntry;
use crate::util::constants;
use crate::util::error::IndexError;

/// True iff `name` follows the canonical dumpstate log naming convention:
/// a case-insensitive `dumpState_` prefix and `.log` suffix.
pub fn is_candidate_name(name: &str) -> bool {
    let prefix = constants::DUMPSTATE_PREFIX;
    let prefix_ok = name
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
    prefix_ok && has_log_extension(name)
}

/// True iff `name` ends in `.log`, case-insensitively. The tier-3 match.
pub fn has_log_extension(name: &str) -> bool {
    let suffix = constants::LOG_EXTENSION;
    name.get(name.len().saturating_sub(suffix.len())..)
        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Find all candidate log entries under the index's root container.
///
/// A failure listing the root itself is fatal (the caller probes it to tell
/// "folder gone" from "permission lost"). Failures listing an individual
/// subdirectory during tier 2 are non-fatal and logged.
pub fn discover_logs(index: &dyn DocumentIndex) -> Result<Vec<LogEntry>, IndexError> {
    let top_level = index.list_children(index.root_id())?;

    // Tier 1: canonical names at the top level.
    let mut logs: Vec<LogEntry> = top_level
        .iter()
        .filter(|e| is_candidate_name(&e.name))
        .cloned()
        .collect();

    // Tier 2: canonical names one directory deeper.
    if logs.is_empty() {
        for child in top_level.iter().filter(|e| e.is_directory()) {
            match index.list_children(&child.id) {
                Ok(children) => {
                    logs.extend(children.into_iter().filter(|e| is_candidate_name(&e.name)));
                }
                Err(e) => {
                    tracing::debug!(dir = %child.name, error = %e, "Skipping unreadable subdirectory");
                }
            }
        }
    }

    // Tier 3: any .log file at the top level, excluding directories.
    if logs.is_empty() {
        logs = top_level
            .into_iter()
            .filter(|e| !e.is_directory() && has_log_extension(&e.name))
            .collect();
        if !logs.is_empty() {
            tracing::debug!(
                count = logs.len(),
                "No canonical dumpstate names found; fell back to generic .log matching"
            );
        }
    }

    tracing::debug!(candidates = logs.len(), "Discovery complete");
    Ok(logs)
}

/// All candidate logs sorted newest-first (for the browse-all-logs view).
///
/// Uses the same ordering key as the latest selector so the list head always
/// agrees with `select_latest`.
pub fn list_all_logs(index: &dyn DocumentIndex) -> Result<Vec<LogEntry>, IndexError> {
    let mut logs = discover_logs(index)?;
    logs.sort_by_key(|e| std::cmp::Reverse(latest::ordering_key(e)));
    Ok(logs)
}

// =============================================================================
// Tests
// =============================================================================
