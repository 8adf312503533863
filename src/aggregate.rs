// Streaming fold from records into per-field and per-region null counts.
//
// Every counter is a plain sum, so partial states built over disjoint
// slices of the input can be merged in any order and give the same result
// as one sequential pass.

use tracing::{debug, warn};

use crate::config::{AuditConfig, UnknownRegionPolicy};
use crate::error::{AuditError, Result};
use crate::registry::RegionRegistry;
use crate::types::Record;
use crate::util::is_missing;

/// Records handed to each shard worker per batch.
const SHARD_BATCH: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCount {
    pub name: String,
    pub nulls: u64,
}

/// Everything accumulated during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateState {
    pub total: u64,
    pub fields: Vec<FieldCount>,
    pub regions: RegionRegistry,
}

impl AggregateState {
    pub fn new(config: &AuditConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            total: 0,
            fields: config
                .fields_of_interest
                .iter()
                .map(|name| FieldCount {
                    name: name.clone(),
                    nulls: 0,
                })
                .collect(),
            regions: config.build_registry()?,
        })
    }

    fn empty_like(&self) -> Self {
        Self {
            total: 0,
            fields: self
                .fields
                .iter()
                .map(|f| FieldCount {
                    name: f.name.clone(),
                    nulls: 0,
                })
                .collect(),
            regions: self.regions.empty_like(),
        }
    }

    /// Fold one record into the state.
    ///
    /// The region is resolved before anything is counted, so a rejected
    /// record leaves the state untouched.
    pub fn observe(&mut self, record: &Record, null_sentinel: &str) -> Result<()> {
        let key = record.region.as_deref().unwrap_or("");
        let region = if self.regions.contains(key) {
            self.regions.get_mut(key)
        } else {
            debug!(ordinal = record.ordinal, region = key, "unregistered region");
            self.regions.unassigned_mut()
        };
        let Some(region) = region else {
            return Err(AuditError::UnknownRegion {
                ordinal: record.ordinal,
                value: key.to_string(),
            });
        };

        for (i, field) in self.fields.iter_mut().enumerate() {
            if is_missing(record.value(i), null_sentinel) {
                field.nulls += 1;
                region.nulls[i] += 1;
            }
        }
        region.total += 1;
        self.total += 1;
        Ok(())
    }

    /// Add another partial state with the same fields and regions.
    pub fn merge(&mut self, other: &AggregateState) -> Result<()> {
        let same_fields = self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| a.name == b.name);
        if !same_fields {
            return Err(AuditError::Internal(
                "cannot merge states with different fields".to_string(),
            ));
        }
        self.regions.merge(&other.regions)?;
        for (a, b) in self.fields.iter_mut().zip(&other.fields) {
            a.nulls += b.nulls;
        }
        self.total += other.total;
        Ok(())
    }

    /// Records counted under the `UNASSIGNED` bucket.
    pub fn unassigned_total(&self) -> u64 {
        self.regions.unassigned().map_or(0, |c| c.total)
    }
}

/// Consume the whole record stream in a single pass.
///
/// Stops at the first source error or, under [`UnknownRegionPolicy::Fail`],
/// at the first unregistered region.
pub fn aggregate<I>(records: I, config: &AuditConfig) -> Result<AggregateState>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut state = AggregateState::new(config)?;
    for record in records {
        state.observe(&record?, &config.null_sentinel)?;
    }
    warn_unassigned(&state, config);
    Ok(state)
}

/// Same result as [`aggregate`], with each batch split across `shards`
/// scoped worker threads. Memory stays bounded by one batch.
pub fn aggregate_sharded<I>(
    records: I,
    config: &AuditConfig,
    shards: usize,
) -> Result<AggregateState>
where
    I: IntoIterator<Item = Result<Record>>,
{
    if shards == 0 {
        return Err(AuditError::InvalidConfig(
            "shard count must be at least 1".to_string(),
        ));
    }
    if shards == 1 {
        return aggregate(records, config);
    }

    let mut state = AggregateState::new(config)?;
    let batch_size = shards * SHARD_BATCH;
    let mut iter = records.into_iter();
    loop {
        let mut batch = Vec::with_capacity(batch_size);
        let mut source_err = None;
        for item in iter.by_ref().take(batch_size) {
            match item {
                Ok(record) => batch.push(record),
                Err(e) => {
                    source_err = Some(e);
                    break;
                }
            }
        }
        let last = source_err.is_some() || batch.len() < batch_size;

        // Records read before a source failure still count, and a fault
        // among them takes precedence since it came first.
        let partial = aggregate_batch(&state, &batch, &config.null_sentinel, shards)?;
        state.merge(&partial)?;
        if let Some(e) = source_err {
            return Err(e);
        }
        if last {
            break;
        }
    }
    warn_unassigned(&state, config);
    Ok(state)
}

fn aggregate_batch(
    template: &AggregateState,
    batch: &[Record],
    null_sentinel: &str,
    shards: usize,
) -> Result<AggregateState> {
    let mut merged = template.empty_like();
    if batch.is_empty() {
        return Ok(merged);
    }
    let chunk = batch.len().div_ceil(shards);

    let partials: Vec<Result<AggregateState>> = std::thread::scope(|s| {
        let handles: Vec<_> = batch
            .chunks(chunk)
            .map(|part| {
                let mut partial = template.empty_like();
                s.spawn(move || -> Result<AggregateState> {
                    for record in part {
                        partial.observe(record, null_sentinel)?;
                    }
                    Ok(partial)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(AuditError::Internal("shard worker panicked".to_string()))
                })
            })
            .collect()
    });

    // Chunks are contiguous and in order, so the first error seen has the
    // lowest record ordinal.
    for partial in partials {
        merged.merge(&partial?)?;
    }
    Ok(merged)
}

fn warn_unassigned(state: &AggregateState, config: &AuditConfig) {
    let unassigned = state.unassigned_total();
    if config.unknown_region == UnknownRegionPolicy::Unassigned && unassigned > 0 {
        warn!(
            records = unassigned,
            "records with unregistered '{}' values were counted as UNASSIGNED", config.region_field
        );
    }
}
