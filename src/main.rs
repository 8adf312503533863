// Entry point and high-level CLI flow.
//
// Resolve the audit configuration, locate the dataset (prompting for a
// path when none is given), stream the records once through the
// aggregator, then print the field and region reports to stdout.
mod aggregate;
mod config;
mod error;
mod loader;
mod logging;
mod output;
mod registry;
mod reports;
mod types;
mod util;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use crate::aggregate::aggregate_sharded;
use crate::config::{AuditConfig, Preset, UnknownRegionPolicy};
use crate::error::AuditError;
use crate::loader::{locate, parent_dir_exists, CsvRecordSource};
use crate::output::{write_report, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPreset {
    /// NAME and ZIPCODE by county
    Addresses,
    /// ROADNAMESHA and ROADNAMELOCAL by county
    Centerlines,
}

impl From<CliPreset> for Preset {
    fn from(cli: CliPreset) -> Self {
        match cli {
            CliPreset::Addresses => Preset::Addresses,
            CliPreset::Centerlines => Preset::Centerlines,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliUnknownRegion {
    /// Abort on the first record with an unregistered region
    Fail,
    /// Count such records under UNASSIGNED and keep going
    Unassigned,
}

impl From<CliUnknownRegion> for UnknownRegionPolicy {
    fn from(cli: CliUnknownRegion) -> Self {
        match cli {
            CliUnknownRegion::Fail => UnknownRegionPolicy::Fail,
            CliUnknownRegion::Unassigned => UnknownRegionPolicy::Unassigned,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    /// Fixed-width console tables
    Text,
    /// Markdown tables
    Markdown,
    /// JSON summary
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(cli: CliFormat) -> Self {
        match cli {
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Markdown => OutputFormat::Markdown,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "null-audit",
    version,
    about = "Count null/empty values per field and per county in a tabular dataset",
    long_about = "Streams a CSV export once and reports, for each field of interest, how many \
                  records hold a null, empty or whitespace-only value, overall and broken down \
                  by the region (county) column."
)]
struct Args {
    /// Path to the CSV dataset. Prompted for when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Built-in dataset layout
    #[arg(long, value_enum, conflicts_with = "config")]
    preset: Option<CliPreset>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fields of interest, comma separated (overrides preset/config)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Column holding the region key
    #[arg(long)]
    region_field: Option<String>,

    /// Registered region keys, comma separated, in report order
    #[arg(long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Word that marks a missing value (case-insensitive)
    #[arg(long)]
    null_sentinel: Option<String>,

    /// How to handle records whose region is not registered
    #[arg(long, value_enum)]
    unknown_region: Option<CliUnknownRegion>,

    /// CSV field delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Report format written to stdout
    #[arg(short, long, value_enum, default_value = "text")]
    format: CliFormat,

    /// Worker threads used for aggregation
    #[arg(long, default_value = "1")]
    shards: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn resolve_config(args: &Args) -> Result<AuditConfig> {
    let mut config = match (&args.config, args.preset) {
        (Some(path), _) => AuditConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(preset)) => AuditConfig::preset(preset.into()),
        (None, None) => AuditConfig::default(),
    };
    if !args.fields.is_empty() {
        config.fields_of_interest = args.fields.iter().map(|f| f.trim().to_string()).collect();
    }
    if let Some(field) = &args.region_field {
        config.region_field = field.clone();
    }
    if !args.regions.is_empty() {
        config.region_keys = args.regions.clone();
    }
    if let Some(sentinel) = &args.null_sentinel {
        config.null_sentinel = sentinel.clone();
    }
    if let Some(policy) = args.unknown_region {
        config.unknown_region = policy.into();
    }
    config.validate()?;
    Ok(config)
}

fn delimiter_byte(c: char) -> Result<u8> {
    if !c.is_ascii() {
        bail!("delimiter must be a single ASCII character, got '{c}'");
    }
    Ok(c as u8)
}

/// Ask for the dataset path until its parent directory exists.
///
/// Prompts go to stderr; stdout is reserved for the report. Empty input or
/// end of input aborts.
fn prompt_for_dataset_path() -> Result<PathBuf> {
    let stdin = io::stdin();
    loop {
        eprint!("Paste the path to the dataset\n>");
        let _ = io::stderr().flush();
        let mut buf = String::new();
        let read = stdin.read_line(&mut buf)?;
        let trimmed = buf.trim().trim_matches('"');
        if read == 0 || trimmed.is_empty() {
            bail!("no dataset path provided");
        }
        let path = PathBuf::from(trimmed);
        if parent_dir_exists(&path) {
            return Ok(path);
        }
        eprintln!("There is a problem with the path to the dataset; its folder does not exist.");
    }
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    let delimiter = delimiter_byte(args.delimiter)?;
    let path = match &args.input {
        Some(path) => path.clone(),
        None => prompt_for_dataset_path()?,
    };

    let located = locate(&path, delimiter)?;

    info!("Getting null/empty count...");
    let state = {
        let source = CsvRecordSource::open(&path, &config, delimiter)?;
        aggregate_sharded(source, &config, args.shards)?
    };
    if state.total != located.record_count {
        warn!(
            located = located.record_count,
            aggregated = state.total,
            "record count changed between locating and reading the dataset"
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(
        &mut out,
        args.format.into(),
        &state,
        &config,
        &located.path,
        Some(located.record_count),
    )?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_logging(&args.log_level, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let audit = err.downcast_ref::<AuditError>();
            let code = audit.map_or("ERROR", AuditError::error_code);
            match audit.and_then(AuditError::record_ordinal) {
                Some(ordinal) => error!(code, ordinal, "{err:#}"),
                None => error!(code, "{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
