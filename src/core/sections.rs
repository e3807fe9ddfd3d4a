// BattScan - core/sections.rs
//
// Labeled raw-section extraction for the "view raw log" path.
//
// Independent of the field parser but sharing its line-streaming discipline:
// one forward pass, no buffering of the whole file. A three-state scanner
// carves out the battery backup record and the battery service dump, then a
// nested sub-filter strips LogBuffer noise blocks from each section before
// display.

use crate::util::constants;
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::sync::OnceLock;

/// `[SomethingLogBuffer]` header at the start of a (trimmed) line.
fn log_buffer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\w+LogBuffer\]").expect("LogBuffer regex is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Watching for a section-start marker.
    Scanning,
    /// Inside the backup record block (indented `m`-prefixed field lines).
    Backup,
    /// Inside the battery service dump, until another service's dump begins.
    ServiceDump,
}

/// Extract the battery-relevant sections of a log as one display string.
///
/// Sections appear in file order, each preceded by a `━━━ <label> ━━━`
/// divider, separated by blank lines. A log with no recognisable sections
/// yields a fixed placeholder; a mid-stream read failure yields a
/// `(read error: ...)` placeholder. Never returns an error.
pub fn extract_labeled_sections<R: Read>(reader: R) -> String {
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut current = String::new();
    let mut label = String::new();
    let mut state = State::Scanning;

    for line_result in BufReader::new(reader).lines() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => return format!("(read error: {e})"),
        };

        match state {
            State::Scanning => {
                if line.contains(constants::BACKUP_HEADER) {
                    flush_nonempty(&mut sections, &label, &mut current);
                    state = State::Backup;
                    label = constants::BACKUP_HEADER.to_string();
                } else if line.contains(constants::BATTERY_DUMP_HEADER) {
                    flush_nonempty(&mut sections, &label, &mut current);
                    state = State::ServiceDump;
                    label = "Battery Service Dump".to_string();
                }
            }
            State::Backup => {
                let inside = line.trim().is_empty()
                    || line.starts_with(' ')
                    || line.starts_with('\t')
                    || line.trim_start().starts_with('m');
                if inside {
                    current.push_str(&line);
                    current.push('\n');
                } else if line.contains(constants::BATTERY_DUMP_HEADER) {
                    // A service dump directly after the backup block: do not
                    // miss it by merely returning to Scanning.
                    flush_nonempty(&mut sections, &label, &mut current);
                    state = State::ServiceDump;
                    label = "Battery Service Dump".to_string();
                } else {
                    sections.push((std::mem::take(&mut label), current.trim().to_string()));
                    current.clear();
                    state = State::Scanning;
                }
            }
            State::ServiceDump => {
                if line.contains(constants::SERVICE_DUMP_MARKER)
                    && !line.contains(constants::BATTERY_DUMP_HEADER)
                {
                    sections.push((std::mem::take(&mut label), current.trim().to_string()));
                    current.clear();
                    state = State::Scanning;
                } else {
                    current.push_str(&line);
                    current.push('\n');
                }
            }
        }
    }

    if !current.is_empty() {
        sections.push((label, current.trim().to_string()));
    }

    if sections.is_empty() {
        return constants::NO_SECTIONS_PLACEHOLDER.to_string();
    }

    let divider = constants::SECTION_DIVIDER;
    sections
        .iter()
        .map(|(label, content)| {
            let filtered = strip_log_buffers(content);
            if label.is_empty() {
                filtered
            } else {
                format!("{divider} {label} {divider}\n\n{filtered}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Drop `[<word>LogBuffer]` blocks from a section.
///
/// A block starts at its bracketed header and runs until a line that looks
/// like a new header or a non-indented, non-numeric-led line; that boundary
/// line is kept and ends the filtered region. Blank lines inside a block are
/// swallowed with it.
fn strip_log_buffers(content: &str) -> String {
    let mut out = String::new();
    let mut inside_buffer = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if log_buffer_regex().is_match(trimmed) {
            inside_buffer = true;
        } else if inside_buffer && trimmed.is_empty() {
            // swallowed
        } else if inside_buffer
            && (trimmed.starts_with('[')
                || trimmed
                    .chars()
                    .next()
                    .is_some_and(|c| !c.is_ascii_digit()))
        {
            inside_buffer = false;
            out.push_str(line);
            out.push('\n');
        } else if inside_buffer {
            // swallowed
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

fn flush_nonempty(sections: &mut Vec<(String, String)>, label: &str, current: &mut String) {
    if !current.is_empty() {
        sections.push((label.to_string(), current.trim().to_string()));
        current.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
