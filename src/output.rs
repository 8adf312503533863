use std::io::Write;
use std::path::Path;

use crate::aggregate::AggregateState;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::reports::{build_summary, format_markdown, format_report, RegionLabels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Fixed-width console tables.
    #[default]
    Text,
    Markdown,
    Json,
}

/// Write the finished audit to `out` in the requested format.
pub fn write_report<W: Write>(
    out: &mut W,
    format: OutputFormat,
    state: &AggregateState,
    config: &AuditConfig,
    dataset: &Path,
    located_records: Option<u64>,
) -> Result<()> {
    let labels = RegionLabels::from_config(config);
    match format {
        OutputFormat::Text => out.write_all(format_report(state, labels).as_bytes())?,
        OutputFormat::Markdown => out.write_all(format_markdown(state, labels).as_bytes())?,
        OutputFormat::Json => {
            let summary = build_summary(state, labels, dataset, located_records);
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}
