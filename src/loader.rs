use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::types::Record;
use crate::util::format_int;

#[derive(Debug, Clone)]
pub struct LocatedDataset {
    pub path: PathBuf,
    pub record_count: u64,
}

/// Check that the dataset exists and count its data rows.
///
/// The count is for display only; the aggregator keeps its own total.
pub fn locate(path: &Path, delimiter: u8) -> Result<LocatedDataset> {
    if !parent_dir_exists(path) || !path.is_file() {
        return Err(AuditError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    info!("Getting feature count...");
    let record_count = count_records(path, delimiter)?;
    info!("TOTAL = {}", format_int(record_count));
    Ok(LocatedDataset {
        path: path.to_path_buf(),
        record_count,
    })
}

/// The parent directory check used by the path prompt as well.
pub fn parent_dir_exists(path: &Path) -> bool {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
        _ => true,
    }
}

fn count_records(path: &Path, delimiter: u8) -> Result<u64> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|source| AuditError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
    let mut row = ByteRecord::new();
    let mut count = 0u64;
    loop {
        match rdr.read_byte_record(&mut row) {
            Ok(true) => count += 1,
            Ok(false) => break,
            Err(source) => {
                return Err(AuditError::SourceRead {
                    ordinal: count + 1,
                    source,
                });
            }
        }
    }
    Ok(count)
}

/// One-pass, forward-only stream of [`Record`]s from a CSV table.
///
/// Columns are resolved by header name. Rows are read as raw bytes and only
/// the audited columns are decoded, lossily, so stray non-UTF-8 bytes never
/// abort the pass. After the first I/O or parse error the stream yields that
/// error once and then ends.
pub struct CsvRecordSource<R> {
    reader: csv::Reader<R>,
    value_idx: Vec<usize>,
    region_idx: usize,
    row: ByteRecord,
    ordinal: u64,
    done: bool,
}

impl CsvRecordSource<File> {
    pub fn open(path: &Path, config: &AuditConfig, delimiter: u8) -> Result<Self> {
        let file = File::open(path).map_err(|e| AuditError::SourceUnavailable {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_reader(file, path, config, delimiter)
    }
}

impl<R: Read> CsvRecordSource<R> {
    /// `label` names the source in error messages.
    pub fn from_reader(rdr: R, label: &Path, config: &AuditConfig, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(rdr);
        let headers = reader
            .headers()
            .map_err(|source| AuditError::SourceUnavailable {
                path: label.to_path_buf(),
                source,
            })?
            .clone();

        let value_idx = config
            .fields_of_interest
            .iter()
            .map(|f| column_index(&headers, f, label))
            .collect::<Result<Vec<_>>>()?;
        let region_idx = column_index(&headers, &config.region_field, label)?;
        debug!(?value_idx, region_idx, "resolved columns");

        Ok(Self {
            reader,
            value_idx,
            region_idx,
            row: ByteRecord::new(),
            ordinal: 0,
            done: false,
        })
    }
}

impl<R: Read> Iterator for CsvRecordSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_byte_record(&mut self.row) {
            Ok(true) => {
                self.ordinal += 1;
                let values = self.value_idx.iter().map(|&i| decode(&self.row, i)).collect();
                Some(Ok(Record {
                    ordinal: self.ordinal,
                    values,
                    region: decode(&self.row, self.region_idx),
                }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(source) => {
                self.done = true;
                Some(Err(AuditError::SourceRead {
                    ordinal: self.ordinal + 1,
                    source,
                }))
            }
        }
    }
}

fn decode(row: &ByteRecord, idx: usize) -> Option<String> {
    row.get(idx).map(|raw| String::from_utf8_lossy(raw).into_owned())
}

// Exact header match first, then ASCII case-insensitive, since
// geodatabase exports do not preserve field name case reliably.
fn column_index(headers: &StringRecord, name: &str, label: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .or_else(|| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name)))
        .ok_or_else(|| AuditError::ColumnNotFound {
            column: name.to_string(),
            path: label.to_path_buf(),
        })
}
