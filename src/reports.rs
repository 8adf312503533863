use std::path::Path;

use tabled::{builder::Builder, settings::Style, Table};

use crate::aggregate::{AggregateState, FieldCount};
use crate::config::AuditConfig;
use crate::registry::{RegionCounts, RegionRegistry, UNASSIGNED_REGION};
use crate::types::{AuditSummary, FieldSummaryRow, RegionFieldCell, RegionSummaryRow};
use crate::util::{format_percent, is_undefined_percent, percent, region_display_label};

const FIELD_COL: usize = 10;
const REGION_COL: usize = 15;
const COUNT_COL: usize = 7;
const FIELD_PCT_COL: usize = 7;
const REGION_PCT_COL: usize = 6;

/// Display settings for the region table.
#[derive(Debug, Clone, Copy)]
pub struct RegionLabels<'a> {
    pub header: &'a str,
    pub strip_suffix: Option<&'a str>,
}

impl<'a> RegionLabels<'a> {
    pub fn from_config(config: &'a AuditConfig) -> Self {
        Self {
            header: &config.region_label,
            strip_suffix: config.region_label_suffix.as_deref(),
        }
    }
}

/// Field-level table: one row per field of interest, in declaration order.
///
/// Percentages are relative to `total`; with no records they render `N/A`.
pub fn format_field_report(total: u64, fields: &[FieldCount]) -> String {
    let name_w = fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0)
        .max(FIELD_COL);
    let mut out = format!(
        "{:^name_w$}{:>COUNT_COL$} {:>FIELD_PCT_COL$}\n",
        "Field", "Count", "Percent"
    );
    for field in fields {
        out.push_str(&format!(
            "{:name_w$}{:COUNT_COL$}{}\n",
            field.name,
            field.nulls,
            format_percent(percent(total, field.nulls), FIELD_PCT_COL)
        ));
    }
    out
}

/// Region-level table: exactly one row per registered region, in
/// registration order, followed by an `UNASSIGNED` row when that bucket
/// received records.
///
/// A region with no records shows `0` and `0.00%` so it stays visible.
pub fn format_region_report(
    registry: &RegionRegistry,
    fields: &[FieldCount],
    labels: RegionLabels<'_>,
) -> String {
    let rows = labelled_regions(registry, labels);
    let label_w = rows
        .iter()
        .map(|(_, label, _)| label.len())
        .max()
        .unwrap_or(0)
        .max(REGION_COL);
    let count_w: Vec<usize> = fields.iter().map(|f| f.name.len().max(COUNT_COL)).collect();

    let mut out = format!("{:^label_w$}", labels.header);
    for (i, field) in fields.iter().enumerate() {
        let w = count_w[i];
        out.push_str(column_gap(i));
        out.push_str(&format!("{:>w$}  {:>pw$}", field.name, "%", pw = REGION_PCT_COL + 1));
    }
    out.push('\n');

    for (_, label, counts) in &rows {
        out.push_str(&format!("{label:label_w$}"));
        for (i, nulls) in counts.nulls.iter().enumerate() {
            let w = count_w[i];
            out.push_str(column_gap(i));
            out.push_str(&format!(
                "{:w$}  {}",
                nulls,
                format_percent(region_percent(counts, *nulls), REGION_PCT_COL)
            ));
        }
        out.push('\n');
    }
    out
}

/// Both tables with the blank separator line between them.
pub fn format_report(state: &AggregateState, labels: RegionLabels<'_>) -> String {
    format!(
        "{}\n{}",
        format_field_report(state.total, &state.fields),
        format_region_report(&state.regions, &state.fields, labels)
    )
}

pub fn field_rows(state: &AggregateState) -> Vec<FieldSummaryRow> {
    state
        .fields
        .iter()
        .map(|f| FieldSummaryRow {
            field: f.name.clone(),
            count: f.nulls,
            percent: percent_label(percent(state.total, f.nulls)),
        })
        .collect()
}

pub fn region_rows(state: &AggregateState, labels: RegionLabels<'_>) -> Vec<RegionSummaryRow> {
    labelled_regions(&state.regions, labels)
        .into_iter()
        .map(|(key, label, counts)| RegionSummaryRow {
            region: key.to_string(),
            label,
            total: counts.total,
            fields: state
                .fields
                .iter()
                .zip(&counts.nulls)
                .map(|(f, nulls)| RegionFieldCell {
                    field: f.name.clone(),
                    count: *nulls,
                    percent: percent_label(region_percent(counts, *nulls)),
                })
                .collect(),
        })
        .collect()
}

/// Markdown versions of both tables, rendered with `tabled`.
pub fn format_markdown(state: &AggregateState, labels: RegionLabels<'_>) -> String {
    let mut field_table = Table::new(field_rows(state));
    field_table.with(Style::markdown());

    let mut builder = Builder::default();
    let mut header = vec![labels.header.to_string(), "Total".to_string()];
    for f in &state.fields {
        header.push(f.name.clone());
        header.push("%".to_string());
    }
    builder.push_record(header);
    for row in region_rows(state, labels) {
        let mut record = vec![row.label, row.total.to_string()];
        for cell in row.fields {
            record.push(cell.count.to_string());
            record.push(cell.percent);
        }
        builder.push_record(record);
    }
    let mut region_table = builder.build();
    region_table.with(Style::markdown());

    format!("{field_table}\n\n{region_table}\n")
}

pub fn build_summary(
    state: &AggregateState,
    labels: RegionLabels<'_>,
    dataset: &Path,
    located_records: Option<u64>,
) -> AuditSummary {
    AuditSummary {
        dataset: dataset.display().to_string(),
        located_records,
        total_records: state.total,
        fields: field_rows(state),
        regions: region_rows(state, labels),
        unassigned_records: state.unassigned_total(),
    }
}

fn labelled_regions<'r>(
    registry: &'r RegionRegistry,
    labels: RegionLabels<'_>,
) -> Vec<(&'r str, String, &'r RegionCounts)> {
    let mut rows: Vec<_> = registry
        .iter()
        .map(|(key, counts)| (key, region_display_label(key, labels.strip_suffix), counts))
        .collect();
    if let Some(bucket) = registry.unassigned().filter(|c| c.total > 0) {
        rows.push((UNASSIGNED_REGION, UNASSIGNED_REGION.to_string(), bucket));
    }
    rows
}

// A region without records has nothing missing: report 0.00% rather than
// the undefined marker, matching the zero row above it.
fn region_percent(counts: &RegionCounts, nulls: u64) -> f64 {
    if counts.total == 0 {
        0.0
    } else {
        percent(counts.total, nulls)
    }
}

fn percent_label(p: f64) -> String {
    if is_undefined_percent(p) {
        "N/A".to_string()
    } else {
        format!("{p:.2}%")
    }
}

fn column_gap(i: usize) -> &'static str {
    if i == 0 { " " } else { "  " }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::config::UnknownRegionPolicy;
    use crate::types::Record;
    use pretty_assertions::assert_eq;

    fn scenario_config() -> AuditConfig {
        AuditConfig {
            fields_of_interest: vec!["NAME".into(), "ZIPCODE".into()],
            region_keys: vec!["A COUNTY".into(), "B COUNTY".into(), "C COUNTY".into()],
            ..AuditConfig::default()
        }
    }

    fn scenario_state(config: &AuditConfig) -> AggregateState {
        let records = vec![
            Record::new(1, ["Main St", "21045"], "A COUNTY"),
            Record::new(2, ["", "21046"], "A COUNTY"),
            Record::new(3, ["Oak St", "none"], "B COUNTY"),
        ];
        aggregate(records.into_iter().map(Ok), config).unwrap()
    }

    #[test]
    fn test_field_report_layout() {
        let config = scenario_config();
        let state = scenario_state(&config);
        let text = format_field_report(state.total, &state.fields);
        let expected = concat!(
            "  Field     Count Percent\n",
            "NAME            1  33.33%\n",
            "ZIPCODE         1  33.33%\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_field_report_without_records_is_not_zero_percent() {
        let config = scenario_config();
        let state = AggregateState::new(&config).unwrap();
        let text = format_field_report(state.total, &state.fields);
        assert!(text.contains("N/A"));
        assert!(!text.contains("-9999"));
        assert!(!text.contains("0.00%"));
    }

    #[test]
    fn test_region_report_layout() {
        let config = scenario_config();
        let state = scenario_state(&config);
        let text = format_region_report(
            &state.regions,
            &state.fields,
            RegionLabels::from_config(&config),
        );
        let expected = concat!(
            "    County         NAME        %  ZIPCODE        %\n",
            "A                     1   50.00%        0    0.00%\n",
            "B                     0    0.00%        1  100.00%\n",
            "C                     0    0.00%        0    0.00%\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_region_report_has_one_row_per_region_in_order() {
        let config = AuditConfig::default();
        let state = AggregateState::new(&config).unwrap();
        let text = format_region_report(
            &state.regions,
            &state.fields,
            RegionLabels::from_config(&config),
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + config.region_keys.len());
        assert!(lines[1].starts_with("ALLEGANY "));
        assert!(lines[2].starts_with("ANNAPOLIS "));
        assert!(lines[4].starts_with("BALTIMORE CITY "));
        assert!(lines[25].starts_with("WORCESTER "));
        for line in &lines[1..] {
            assert!(line.contains("0.00%"));
            assert!(!line.contains("-9999"));
            assert!(!line.contains("N/A"));
        }
    }

    #[test]
    fn test_long_field_names_keep_columns_aligned() {
        let config = AuditConfig::preset(crate::config::Preset::Centerlines);
        let state = AggregateState::new(&config).unwrap();
        let text = format_region_report(
            &state.regions,
            &state.fields,
            RegionLabels::from_config(&config),
        );
        let widths: Vec<usize> = text.lines().map(str::len).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
        let field_text = format_field_report(3, &state.fields);
        let widths: Vec<usize> = field_text.lines().map(str::len).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_unassigned_row_only_when_used() {
        let config = AuditConfig {
            unknown_region: UnknownRegionPolicy::Unassigned,
            ..scenario_config()
        };
        let state = scenario_state(&config);
        let labels = RegionLabels::from_config(&config);
        let text = format_region_report(&state.regions, &state.fields, labels);
        assert!(!text.contains(UNASSIGNED_REGION));

        let records = vec![Record::new(1, ["", ""], "Z COUNTY")];
        let state = aggregate(records.into_iter().map(Ok), &config).unwrap();
        let text = format_region_report(&state.regions, &state.fields, labels);
        let last = text.lines().last().unwrap();
        assert!(last.starts_with(UNASSIGNED_REGION));
        assert!(last.contains("100.00%"));
        assert_eq!(text.lines().count(), 1 + 3 + 1);
    }

    #[test]
    fn test_full_report_has_blank_separator() {
        let config = scenario_config();
        let state = scenario_state(&config);
        let text = format_report(&state, RegionLabels::from_config(&config));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "");
        assert!(lines[4].contains("County"));
    }

    #[test]
    fn test_rows_and_summary() {
        let config = scenario_config();
        let state = scenario_state(&config);
        let labels = RegionLabels::from_config(&config);
        assert_eq!(
            field_rows(&state),
            vec![
                FieldSummaryRow { field: "NAME".into(), count: 1, percent: "33.33%".into() },
                FieldSummaryRow { field: "ZIPCODE".into(), count: 1, percent: "33.33%".into() },
            ]
        );
        let regions = region_rows(&state, labels);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].label, "A");
        assert_eq!(regions[0].total, 2);
        assert_eq!(regions[2].fields[1].percent, "0.00%");

        let summary = build_summary(&state, labels, Path::new("a.csv"), Some(3));
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"total_records\":3"));
        assert!(json.contains("\"Percent\":\"33.33%\""));
    }

    #[test]
    fn test_markdown_tables() {
        let config = scenario_config();
        let state = scenario_state(&config);
        let md = format_markdown(&state, RegionLabels::from_config(&config));
        assert!(md.contains("| Field"));
        assert!(md.contains("| NAME"));
        assert!(md.contains("33.33%"));
        assert!(md.contains("| County"));
        assert!(md.contains("| C "));
    }
}
