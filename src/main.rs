// BattScan - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Config loading and the remembered source folder
// 4. Scan dispatch and result rendering (human or JSON)

use battscan::app;
use battscan::app::scan::ScanOutcome;
use battscan::core;
use battscan::core::index::DocumentIndex;
use battscan::core::model::BatteryTelemetry;
use battscan::platform;
use battscan::util;
use battscan::util::error::ScanError;

use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};

/// BattScan - Battery health telemetry from Android dumpstate logs.
///
/// Point BattScan at a folder of exported dumpstate logs to extract the
/// battery health percentage, charge cycle count, and install date from
/// the newest log. Results are cached so an unchanged folder answers
/// instantly, and the last good result keeps answering when the folder
/// becomes unreachable.
#[derive(Parser, Debug)]
#[command(name = "battscan", version, about)]
struct Cli {
    /// Folder containing the dumpstate logs (defaults to the remembered one).
    folder: Option<PathBuf>,

    /// List all discovered candidate logs, newest first, and exit.
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Print the labeled battery sections of the named log and exit.
    #[arg(long = "sections", value_name = "NAME")]
    sections: Option<String>,

    /// Parse the named log instead of the newest one (never cached).
    #[arg(short = 'f', long = "file", value_name = "NAME")]
    file: Option<String>,

    /// Ignore the cache fingerprint and re-parse the newest log.
    #[arg(long = "fresh")]
    fresh: bool,

    /// Remove the cached result and exit (unless a folder is also given).
    #[arg(long = "clear-cache")]
    clear_cache: bool,

    /// Remember the folder for future runs without arguments.
    #[arg(short = 'r', long = "remember")]
    remember: bool,

    /// Emit the result as JSON on stdout.
    #[arg(short = 'j', long = "json")]
    json: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let paths = platform::config::PlatformPaths::resolve();
    let config_file = paths.config_file();
    let (config, config_warnings) = platform::config::load_config(&config_file);

    util::logging::init(cli.debug, config.log_level.as_deref());
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    let cache_file = app::cache::cache_path(&paths.data_dir);

    if cli.clear_cache {
        app::cache::clear(&cache_file);
        if cli.folder.is_none() && !cli.list && cli.sections.is_none() && cli.file.is_none() {
            return;
        }
    }

    let Some(folder) = cli.folder.clone().or_else(|| config.folder.clone()) else {
        eprintln!("error: no folder given and none remembered (run once with --remember)");
        std::process::exit(2);
    };

    if cli.remember {
        if let Err(e) = app::scan::remember_folder(&folder, &config, &config_file, &cache_file) {
            tracing::warn!(error = %e, "Could not save remembered folder");
        }
    }

    let index = platform::fs::FsDocumentIndex::new(&folder);

    let exit_code = if cli.list {
        run_list(&index)
    } else if let Some(name) = cli.sections.as_deref() {
        run_sections(&index, name)
    } else if let Some(name) = cli.file.as_deref() {
        run_single_file(&index, name, cli.json)
    } else {
        run_scan(&index, &cache_file, cli.fresh, cli.json)
    };
    std::process::exit(exit_code);
}

/// `--list`: all candidates, newest first.
fn run_list(index: &platform::fs::FsDocumentIndex) -> i32 {
    match core::discovery::list_all_logs(index) {
        Ok(logs) if logs.is_empty() => {
            println!("no candidate logs found");
            0
        }
        Ok(logs) => {
            for entry in &logs {
                let ts = core::latest::ordering_key(entry);
                let stamp = chrono::TimeZone::timestamp_millis_opt(&Utc, ts)
                    .single()
                    .filter(|_| ts != 0);
                match stamp {
                    Some(dt) => println!("{}  {}", dt.format("%Y-%m-%d %H:%M"), entry.name),
                    None => println!("{:16}  {}", "-", entry.name),
                }
            }
            0
        }
        Err(e) => {
            report_error(&app::scan::classify_index_error(e));
            1
        }
    }
}

/// `--sections NAME`: the raw-view string for one log.
fn run_sections(index: &platform::fs::FsDocumentIndex, name: &str) -> i32 {
    match app::scan::find_entry(index, name) {
        Ok(entry) => {
            println!("{}", app::scan::extract_sections(index, &entry));
            0
        }
        Err(e) => {
            report_error(&e);
            1
        }
    }
}

/// `--file NAME`: parse a specific log, bypassing the cache entirely.
fn run_single_file(index: &platform::fs::FsDocumentIndex, name: &str, json: bool) -> i32 {
    let result = app::scan::find_entry(index, name)
        .and_then(|entry| app::scan::parse_entry(index, &entry));
    match result {
        Ok(telemetry) => {
            render(&telemetry, false, json);
            0
        }
        Err(e) => {
            report_error(&e);
            1
        }
    }
}

/// Default action: the smart scan (or `--fresh` re-parse).
fn run_scan(
    index: &platform::fs::FsDocumentIndex,
    cache_file: &Path,
    fresh: bool,
    json: bool,
) -> i32 {
    let result = if fresh {
        app::scan::fresh_scan(index, cache_file)
    } else {
        app::scan::smart_scan(index, cache_file)
    };

    match result {
        Ok(ScanOutcome {
            telemetry,
            from_cache,
        }) => {
            render(&telemetry, from_cache, json);
            0
        }
        Err(e @ (ScanError::AccessLost | ScanError::SourceGone)) => {
            // The folder itself is unreachable: prefer stale-but-real data
            // over an empty answer. Only this folder's own record qualifies.
            if let Some(record) = app::cache::load(cache_file, index.root_id()) {
                tracing::warn!(error = %e, "Source unreachable; showing cached telemetry");
                render(&record.into_telemetry(), true, json);
                0
            } else {
                report_error(&e);
                1
            }
        }
        Err(e) => {
            report_error(&e);
            1
        }
    }
}

fn report_error(e: &ScanError) {
    tracing::debug!(error = %e, "Scan failed");
    eprintln!("error: {e}");
}

fn render(telemetry: &BatteryTelemetry, from_cache: bool, json: bool) {
    if json {
        let outcome = ScanOutcome {
            telemetry: telemetry.clone(),
            from_cache,
        };
        match serde_json::to_string_pretty(&outcome) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: cannot serialise result: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let now = Utc::now();
    let age = telemetry.relative_age(now);
    if age.is_empty() {
        println!("Battery telemetry from {}", telemetry.source_file_name);
    } else {
        println!(
            "Battery telemetry from {} ({age})",
            telemetry.source_file_name
        );
    }

    match telemetry.health_percent {
        Some(p) => println!("  Health:        {p}% ({})", telemetry.health_source.label()),
        None if telemetry.health_unsupported => println!("  Health:        unsupported"),
        None => println!("  Health:        -"),
    }

    match telemetry.cycle_count {
        Some(c) => println!("  Cycle count:   {c}"),
        None => println!("  Cycle count:   -"),
    }

    match telemetry.install_date {
        Some(d) if telemetry.llb_type != core::model::LlbType::None => println!(
            "  Installed:     {} ({})",
            d.format("%Y-%m-%d"),
            telemetry.llb_type.label()
        ),
        Some(d) => println!("  Installed:     {}", d.format("%Y-%m-%d")),
        None => println!("  Installed:     -"),
    }

    if let Some(ts) = telemetry.log_timestamp {
        println!("  Log timestamp: {} UTC", ts.format("%Y-%m-%d %H:%M:%S"));
    }

    if from_cache {
        println!("  (served from cache)");
    }
}
