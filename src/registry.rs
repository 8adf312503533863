// Closed, ordered set of region keys with their counters.

use std::collections::HashMap;

use crate::error::{AuditError, Result};

/// Label used for the overflow bucket when unknown regions are tolerated.
pub const UNASSIGNED_REGION: &str = "UNASSIGNED";

/// Per-region tally: records seen plus one null counter per field of
/// interest, in field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionCounts {
    pub total: u64,
    pub nulls: Vec<u64>,
}

impl RegionCounts {
    fn zeroed(field_count: usize) -> Self {
        Self {
            total: 0,
            nulls: vec![0; field_count],
        }
    }

    fn merge(&mut self, other: &RegionCounts) {
        self.total += other.total;
        for (a, b) in self.nulls.iter_mut().zip(&other.nulls) {
            *a += *b;
        }
    }
}

/// Registry of valid region keys. Keys are fixed at construction and keep
/// their registration order; lookups are exact string matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRegistry {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    counts: Vec<RegionCounts>,
    unassigned: Option<RegionCounts>,
    field_count: usize,
}

impl RegionRegistry {
    pub fn new<I, S>(region_keys: I, field_count: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys = Vec::new();
        let mut index = HashMap::new();
        for key in region_keys {
            let key: String = key.into();
            if key.trim().is_empty() {
                return Err(AuditError::InvalidConfig(
                    "region keys must not be empty".to_string(),
                ));
            }
            if index.insert(key.clone(), keys.len()).is_some() {
                return Err(AuditError::InvalidConfig(format!(
                    "duplicate region key '{key}'"
                )));
            }
            keys.push(key);
        }
        if keys.is_empty() {
            return Err(AuditError::InvalidConfig(
                "at least one region key is required".to_string(),
            ));
        }
        let counts = vec![RegionCounts::zeroed(field_count); keys.len()];
        Ok(Self {
            keys,
            index,
            counts,
            unassigned: None,
            field_count,
        })
    }

    /// Enable the `UNASSIGNED` bucket for records with unknown regions.
    pub fn with_unassigned_bucket(mut self) -> Self {
        let field_count = self.field_count();
        self.unassigned = Some(RegionCounts::zeroed(field_count));
        self
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&RegionCounts> {
        self.index.get(key).map(|&i| &self.counts[i])
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut RegionCounts> {
        self.index.get(key).map(|&i| &mut self.counts[i])
    }

    pub(crate) fn unassigned_mut(&mut self) -> Option<&mut RegionCounts> {
        self.unassigned.as_mut()
    }

    pub fn unassigned(&self) -> Option<&RegionCounts> {
        self.unassigned.as_ref()
    }

    /// Registered regions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegionCounts)> {
        self.keys.iter().map(String::as_str).zip(self.counts.iter())
    }

    /// A zeroed registry with the same keys, for a shard worker.
    pub(crate) fn empty_like(&self) -> Self {
        let field_count = self.field_count();
        Self {
            keys: self.keys.clone(),
            index: self.index.clone(),
            counts: vec![RegionCounts::zeroed(field_count); self.keys.len()],
            unassigned: self
                .unassigned
                .as_ref()
                .map(|_| RegionCounts::zeroed(field_count)),
            field_count,
        }
    }

    /// Element-wise sum of another registry with the same keys.
    pub(crate) fn merge(&mut self, other: &RegionRegistry) -> Result<()> {
        if self.keys != other.keys || self.field_count() != other.field_count() {
            return Err(AuditError::Internal(
                "cannot merge registries with different shapes".to_string(),
            ));
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            a.merge(b);
        }
        match (&mut self.unassigned, &other.unassigned) {
            (Some(a), Some(b)) => a.merge(b),
            (None, None) => {}
            _ => {
                return Err(AuditError::Internal(
                    "cannot merge registries with different unassigned buckets".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zeroed_and_ordered() {
        let reg = RegionRegistry::new(["B COUNTY", "A COUNTY", "ANNAPOLIS"], 2).unwrap();
        assert_eq!(reg.len(), 3);
        let keys: Vec<&str> = reg.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["B COUNTY", "A COUNTY", "ANNAPOLIS"]);
        for (_, c) in reg.iter() {
            assert_eq!(c.total, 0);
            assert_eq!(c.nulls, vec![0, 0]);
        }
        assert!(reg.unassigned().is_none());
    }

    #[test]
    fn test_lookup_is_exact() {
        let reg = RegionRegistry::new(["A COUNTY"], 1).unwrap();
        assert!(reg.contains("A COUNTY"));
        assert!(!reg.contains("a county"));
        assert!(!reg.contains(" A COUNTY"));
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(
            RegionRegistry::new(["A", "A"], 1),
            Err(AuditError::InvalidConfig(_))
        ));
        assert!(matches!(
            RegionRegistry::new(["A", " "], 1),
            Err(AuditError::InvalidConfig(_))
        ));
        assert!(matches!(
            RegionRegistry::new(Vec::<String>::new(), 1),
            Err(AuditError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_merge_requires_same_shape() {
        let mut a = RegionRegistry::new(["A", "B"], 1).unwrap();
        let b = RegionRegistry::new(["B", "A"], 1).unwrap();
        assert!(a.merge(&b).is_err());
        let c = RegionRegistry::new(["A", "B"], 1).unwrap().with_unassigned_bucket();
        assert!(a.merge(&c).is_err());
    }
}
