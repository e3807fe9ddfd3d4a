// BattScan - core/parser.rs
//
// Stream-oriented battery field extraction from one dumpstate log.
// Core layer: accepts Read trait objects, never touches the filesystem.
//
// One forward pass, line by line, scalar accumulators only — no
// backtracking. "First match wins" loops here are a documented priority
// rule, not an implementation accident: changing the evaluation order
// changes output and must be treated as a behavioural change.

use crate::core::latest;
use crate::core::model::{BatteryTelemetry, HealthSource, LlbType};
use crate::util::constants;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::sync::OnceLock;

/// `LLB CAL: 20230207` / `LLB MAN: 20230207` assembly-date line.
fn llb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^LLB\s+(CAL|MAN):\s*(\d{8})\s*$").expect("LLB regex is valid")
    })
}

/// Body date-time, variant (a): text following one of three prefix phrases.
fn prefixed_datetime_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:==\s*dumpstate:|dumpstate:|Build time:)\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})")
            .expect("prefixed date-time regex is valid")
    })
}

/// Body date-time, variant (b): `[YYYY-MM-DD HH:MM:SS]` at line start.
fn bracketed_datetime_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})]")
            .expect("bracketed date-time regex is valid")
    })
}

/// Parse one log's byte stream into structured battery telemetry.
///
/// Never returns an error: any I/O failure mid-stream produces a
/// `success == false` result carrying the message in `error_message`, and a
/// log without battery markers produces `success == false` with an empty
/// message (the "wrong folder" signature).
pub fn parse_stream<R: Read>(reader: R, file_name: &str) -> BatteryTelemetry {
    let mut asoc: Option<i32> = None;
    let mut asoc_seen = false;
    let mut asoc_raw = String::new();
    let mut bsoh: Option<i32> = None;
    let mut bsoh_raw = String::new();
    let mut cycles: Option<i32> = None;
    let mut usage_raw = String::new();
    let mut llb_type = LlbType::None;
    let mut install_date: Option<DateTime<Utc>> = None;
    let mut log_timestamp: Option<DateTime<Utc>> = None;

    for line_result in BufReader::new(reader).lines() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                tracing::debug!(file = file_name, error = %e, "Stream read failed mid-parse");
                return BatteryTelemetry::failed(file_name, format!("Read error: {e}"));
            }
        };
        let t = line.trim();

        if t.contains(constants::ASOC_MARKER) {
            asoc_seen = true;
            asoc_raw = remainder_after(t, constants::ASOC_MARKER);
            asoc = extract_value(t, constants::ASOC_MARKER);
        }
        if t.contains(constants::BSOH_MARKER) {
            bsoh_raw = remainder_after(t, constants::BSOH_MARKER);
            bsoh = extract_value(t, constants::BSOH_MARKER);
        }
        if t.contains(constants::USAGE_MARKER) {
            usage_raw = remainder_after(t, constants::USAGE_MARKER);
            cycles = extract_value(t, constants::USAGE_MARKER)
                .map(|raw| raw / constants::USAGE_MILLI_DIVISOR);
        }

        // Assembly-date line: first match wins, later matches are ignored.
        if install_date.is_none() {
            if let Some(caps) = llb_regex().captures(t) {
                llb_type = if caps[1].eq_ignore_ascii_case("CAL") {
                    LlbType::Cal
                } else {
                    LlbType::Man
                };
                install_date = NaiveDate::parse_from_str(&caps[2], "%Y%m%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|ndt| ndt.and_utc());
            }
        }

        // Log timestamp: prefixed variant takes priority over the bracketed
        // one on the same line; first successful parse wins overall.
        if log_timestamp.is_none() {
            let caps = prefixed_datetime_regex()
                .captures(t)
                .or_else(|| bracketed_datetime_regex().captures(t));
            if let Some(caps) = caps {
                log_timestamp = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|ndt| ndt.and_utc());
            }
        }
    }

    // The filename's embedded timestamp backs up a body without one.
    if log_timestamp.is_none() {
        let ms = latest::timestamp_from_name(file_name);
        if ms != 0 {
            log_timestamp = Utc.timestamp_millis_opt(ms).single();
        }
    }

    // Health priority: ASOC (primary, calibrated) over BSOH (estimate).
    let (health_percent, health_source, health_unsupported) = match (asoc, bsoh) {
        (Some(v), _) => (Some(v as u32), HealthSource::Asoc, false),
        (None, Some(v)) => (Some(v as u32), HealthSource::Bsoh, false),
        (None, None) => (None, HealthSource::None, true),
    };

    // A sighted ASOC marker counts even when its value was unsupported:
    // it proves this is the right kind of log.
    let success =
        health_percent.is_some() || cycles.is_some() || install_date.is_some() || asoc_seen;

    tracing::debug!(
        file = file_name,
        success,
        health = ?health_percent,
        source = health_source.label(),
        cycles = ?cycles,
        "Parse complete"
    );

    BatteryTelemetry {
        health_percent,
        health_source,
        health_unsupported,
        cycle_count: cycles.map(|c| c as u32),
        asoc_raw,
        bsoh_raw,
        usage_raw,
        llb_type,
        install_date,
        source_file_name: file_name.to_string(),
        log_timestamp,
        success,
        error_message: String::new(),
    }
}

/// Verbatim trimmed text after the first occurrence of `marker`.
fn remainder_after(line: &str, marker: &str) -> String {
    line.split_once(marker)
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

/// Tolerant numeric extraction shared by the three value markers.
///
/// Takes the substring after `marker`; a leading `[` selects the content up
/// to the matching `]`, otherwise the leading run of digits/minus is taken.
/// The literal `unsupported` (case-insensitive) and any negative integer map
/// to "no value" — devices use negative sentinels for "not reported".
fn extract_value(line: &str, marker: &str) -> Option<i32> {
    let raw = line.split_once(marker).map(|(_, rest)| rest.trim())?;
    if raw.is_empty() {
        return None;
    }
    let stripped = if raw.starts_with('[') && raw.contains(']') {
        raw[1..].split(']').next().unwrap_or("").trim()
    } else {
        let end = raw
            .find(|c: char| !c.is_ascii_digit() && c != '-')
            .unwrap_or(raw.len());
        &raw[..end]
    };
    if stripped.eq_ignore_ascii_case("unsupported") {
        return None;
    }
    let v = stripped.parse::<i32>().ok()?;
    if v < 0 {
        None
    } else {
        Some(v)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(content: &str, file_name: &str) -> BatteryTelemetry {
        parse_stream(content.as_bytes(), file_name)
    }

    // -------------------------------------------------------------------------
    // extract_value
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_value_plain_number() {
        assert_eq!(extract_value("mSavedBatteryAsoc: 96", "mSavedBatteryAsoc:"), Some(96));
    }

    #[test]
    fn test_extract_value_bracketed() {
        assert_eq!(
            extract_value("mSavedBatteryUsage: [157000]", "mSavedBatteryUsage:"),
            Some(157_000)
        );
    }

    #[test]
    fn test_extract_value_trailing_noise_after_digits() {
        assert_eq!(
            extract_value("mSavedBatteryAsoc: 96 (cached)", "mSavedBatteryAsoc:"),
            Some(96)
        );
    }

    #[test]
    fn test_extract_value_unsupported_literal() {
        assert_eq!(
            extract_value("mSavedBatteryAsoc: Unsupported", "mSavedBatteryAsoc:"),
            None
        );
        assert_eq!(
            extract_value("mSavedBatteryBsoh: [unsupported]", "mSavedBatteryBsoh:"),
            None
        );
    }

    #[test]
    fn test_extract_value_negative_sentinel() {
        assert_eq!(extract_value("mSavedBatteryAsoc: -1", "mSavedBatteryAsoc:"), None);
        assert_eq!(
            extract_value("mSavedBatteryBsoh: [-1]", "mSavedBatteryBsoh:"),
            None
        );
    }

    #[test]
    fn test_extract_value_blank_or_garbage() {
        assert_eq!(extract_value("mSavedBatteryAsoc:", "mSavedBatteryAsoc:"), None);
        assert_eq!(
            extract_value("mSavedBatteryAsoc: n/a", "mSavedBatteryAsoc:"),
            None
        );
        // Opening bracket with no closing bracket: no leading digits either.
        assert_eq!(
            extract_value("mSavedBatteryAsoc: [96", "mSavedBatteryAsoc:"),
            None
        );
    }

    // -------------------------------------------------------------------------
    // Full parse
    // -------------------------------------------------------------------------

    /// The end-to-end example: all fields present and well-formed.
    #[test]
    fn test_parse_complete_log() {
        let content = "\
mSavedBatteryAsoc: 96
mSavedBatteryUsage: [157000]
LLB CAL: 20230207
";
        let t = parse(content, "dumpState_202403151030.log");

        assert_eq!(t.health_percent, Some(96));
        assert_eq!(t.health_source, HealthSource::Asoc);
        assert!(!t.health_unsupported);
        assert_eq!(t.cycle_count, Some(157));
        assert_eq!(t.llb_type, LlbType::Cal);
        assert_eq!(
            t.install_date,
            Utc.with_ymd_and_hms(2023, 2, 7, 0, 0, 0).single()
        );
        assert_eq!(
            t.log_timestamp,
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).single(),
            "timestamp should fall back to the filename run"
        );
        assert!(t.success);
        assert!(t.error_message.is_empty());
    }

    #[test]
    fn test_health_priority_asoc_wins_over_bsoh() {
        let t = parse("mSavedBatteryAsoc: 91\nmSavedBatteryBsoh: 84\n", "a.log");
        assert_eq!(t.health_percent, Some(91));
        assert_eq!(t.health_source, HealthSource::Asoc);
    }

    #[test]
    fn test_health_falls_back_to_bsoh() {
        let t = parse("mSavedBatteryBsoh: 84\n", "a.log");
        assert_eq!(t.health_percent, Some(84));
        assert_eq!(t.health_source, HealthSource::Bsoh);
        assert!(!t.health_unsupported);
        assert!(t.success);
    }

    #[test]
    fn test_health_unsupported_when_neither_yields_a_value() {
        let t = parse(
            "mSavedBatteryAsoc: unsupported\nmSavedBatteryBsoh: [-1]\n",
            "a.log",
        );
        assert_eq!(t.health_percent, None);
        assert_eq!(t.health_source, HealthSource::None);
        assert!(t.health_unsupported);
        // The ASOC marker was seen, so the parse still counts as successful.
        assert!(t.success);
        assert_eq!(t.asoc_raw, "unsupported");
    }

    #[test]
    fn test_unsupported_never_resolves_to_negative() {
        let t = parse("mSavedBatteryAsoc: [-1]\nmSavedBatteryBsoh: -1\n", "a.log");
        assert_eq!(t.health_percent, None);
        assert_ne!(t.health_percent, Some(u32::MAX)); // no sentinel leakage
    }

    #[test]
    fn test_usage_milli_units_truncate() {
        let t = parse("mSavedBatteryUsage: 157999\n", "a.log");
        assert_eq!(t.cycle_count, Some(157));
    }

    #[test]
    fn test_llb_first_match_wins() {
        let content = "LLB MAN: 20220101\nLLB CAL: 20230207\n";
        let t = parse(content, "a.log");
        assert_eq!(t.llb_type, LlbType::Man);
        assert_eq!(
            t.install_date,
            Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn test_llb_requires_exact_line_shape() {
        // Embedded in other text: the anchored pattern must not match.
        let t = parse("noise LLB CAL: 20230207\n", "a.log");
        assert_eq!(t.llb_type, LlbType::None);
        assert!(t.install_date.is_none());
    }

    #[test]
    fn test_log_timestamp_prefixed_variant() {
        let content = "== dumpstate: 2024-03-15 10:29:55\nmSavedBatteryAsoc: 96\n";
        let t = parse(content, "nodate.log");
        assert_eq!(
            t.log_timestamp,
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 29, 55).single()
        );
    }

    #[test]
    fn test_log_timestamp_bracketed_variant() {
        let content = "[2024-03-15 10:29:55] boot complete\nmSavedBatteryAsoc: 96\n";
        let t = parse(content, "nodate.log");
        assert_eq!(
            t.log_timestamp,
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 29, 55).single()
        );
    }

    #[test]
    fn test_log_timestamp_first_match_wins() {
        let content = "\
Build time: 2024-03-15 10:00:00
[2024-03-15 11:00:00] later line
";
        let t = parse(content, "a.log");
        assert_eq!(
            t.log_timestamp,
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).single()
        );
    }

    #[test]
    fn test_body_timestamp_beats_filename() {
        let content = "dumpstate: 2024-01-01 00:00:01\nmSavedBatteryAsoc: 96\n";
        let t = parse(content, "dumpState_202403151030.log");
        assert_eq!(
            t.log_timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).single()
        );
    }

    #[test]
    fn test_empty_input_is_never_successful() {
        let t = parse("", "empty.log");
        assert!(!t.success);
        assert!(t.health_unsupported);
        assert!(t.error_message.is_empty());
    }

    #[test]
    fn test_unrelated_content_is_wrong_folder_signature() {
        let t = parse("hello world\nnothing battery here\n", "random.log");
        assert!(!t.success);
        assert!(t.error_message.is_empty());
    }

    #[test]
    fn test_read_error_mid_stream_is_captured() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device unplugged",
                ))
            }
        }

        let t = parse_stream(FailingReader, "a.log");
        assert!(!t.success);
        assert!(t.error_message.contains("device unplugged"));
        assert_eq!(t.source_file_name, "a.log");
    }

    #[test]
    fn test_raw_echoes_are_verbatim() {
        let t = parse(
            "mSavedBatteryAsoc: [96]\nmSavedBatteryBsoh: unsupported\nmSavedBatteryUsage: [157000]\n",
            "a.log",
        );
        assert_eq!(t.asoc_raw, "[96]");
        assert_eq!(t.bsoh_raw, "unsupported");
        assert_eq!(t.usage_raw, "[157000]");
    }

    #[test]
    fn test_indented_marker_lines_are_trimmed_first() {
        let t = parse("   mSavedBatteryAsoc: 88\n", "a.log");
        assert_eq!(t.health_percent, Some(88));
    }
}
