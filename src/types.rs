use serde::Serialize;
use tabled::Tabled;

/// One row pulled from the record source.
///
/// `values` is positional and matches the configured fields of interest.
/// `None` means the column was absent for this row. Records are consumed by
/// the aggregator and dropped immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based position in the source, used in fault messages.
    pub ordinal: u64,
    pub values: Vec<Option<String>>,
    pub region: Option<String>,
}

impl Record {
    #[cfg(test)]
    pub fn new<I, S>(ordinal: u64, values: I, region: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ordinal,
            values: values.into_iter().map(|v| Some(v.into())).collect(),
            region: Some(region.into()),
        }
    }

    pub fn value(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct FieldSummaryRow {
    #[serde(rename = "Field")]
    #[tabled(rename = "Field")]
    pub field: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: u64,
    #[serde(rename = "Percent")]
    #[tabled(rename = "Percent")]
    pub percent: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RegionFieldCell {
    pub field: String,
    pub count: u64,
    pub percent: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RegionSummaryRow {
    pub region: String,
    pub label: String,
    pub total: u64,
    pub fields: Vec<RegionFieldCell>,
}

#[derive(Debug, Serialize)]
pub struct AuditSummary {
    pub dataset: String,
    pub located_records: Option<u64>,
    pub total_records: u64,
    pub fields: Vec<FieldSummaryRow>,
    pub regions: Vec<RegionSummaryRow>,
    pub unassigned_records: u64,
}
