// Audit configuration.
//
// One [`AuditConfig`] drives the whole run: which fields to inspect, which
// column holds the region key, the closed set of regions, and how to treat
// records whose region is not registered. Configurations come from a named
// preset, a JSON file, CLI flags, or a mix (flags win over the file, the
// file wins over the preset).

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::registry::RegionRegistry;
use crate::util::DEFAULT_NULL_SENTINEL;

/// What to do with a record whose region value is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRegionPolicy {
    /// Abort the run; the region list is a curated reference set.
    #[default]
    Fail,
    /// Count the record under an `UNASSIGNED` bucket and warn at the end.
    Unassigned,
}

/// Built-in dataset layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Address points: NAME and ZIPCODE by ADDSOURCE county.
    Addresses,
    /// Road centerlines: ROADNAMESHA and ROADNAMELOCAL by ADDSOURCE county.
    Centerlines,
}

/// Maryland jurisdictions, in report order.
pub static MARYLAND_JURISDICTIONS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "ALLEGANY COUNTY",
        "ANNAPOLIS",
        "ANNE ARUNDEL COUNTY",
        "BALTIMORE CITY",
        "BALTIMORE COUNTY",
        "CALVERT COUNTY",
        "CAROLINE COUNTY",
        "CARROLL COUNTY",
        "CECIL COUNTY",
        "CHARLES COUNTY",
        "DORCHESTER COUNTY",
        "FREDERICK COUNTY",
        "GARRETT COUNTY",
        "HARFORD COUNTY",
        "HOWARD COUNTY",
        "KENT COUNTY",
        "MONTGOMERY COUNTY",
        "PRINCE GEORGES COUNTY",
        "QUEEN ANNES COUNTY",
        "SAINT MARYS COUNTY",
        "SOMERSET COUNTY",
        "TALBOT COUNTY",
        "WASHINGTON COUNTY",
        "WICOMICO COUNTY",
        "WORCESTER COUNTY",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Ordered fields to inspect. Must not include `region_field`.
    pub fields_of_interest: Vec<String>,

    /// Column holding the region key.
    pub region_field: String,

    /// Word a missing value stringifies to. Compared case-insensitively.
    pub null_sentinel: String,

    /// Closed, ordered set of valid region values.
    pub region_keys: Vec<String>,

    /// Header of the first column of the region report.
    pub region_label: String,

    /// Trailing qualifier stripped from region keys for display.
    pub region_label_suffix: Option<String>,

    pub unknown_region: UnknownRegionPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::preset(Preset::Addresses)
    }
}

impl AuditConfig {
    pub fn preset(preset: Preset) -> Self {
        let fields: &[&str] = match preset {
            Preset::Addresses => &["NAME", "ZIPCODE"],
            Preset::Centerlines => &["ROADNAMESHA", "ROADNAMELOCAL"],
        };
        Self {
            fields_of_interest: fields.iter().map(|f| f.to_string()).collect(),
            region_field: "ADDSOURCE".to_string(),
            null_sentinel: DEFAULT_NULL_SENTINEL.to_string(),
            region_keys: MARYLAND_JURISDICTIONS.clone(),
            region_label: "County".to_string(),
            region_label_suffix: Some("COUNTY".to_string()),
            unknown_region: UnknownRegionPolicy::Fail,
        }
    }

    /// Read a JSON configuration file. Missing keys fall back to the
    /// addresses preset.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AuditConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Reject malformed configurations before any record is read.
    pub fn validate(&self) -> Result<()> {
        if self.fields_of_interest.is_empty() {
            return Err(AuditError::InvalidConfig(
                "at least one field of interest is required".to_string(),
            ));
        }
        if self.region_field.trim().is_empty() {
            return Err(AuditError::InvalidConfig(
                "region field must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for field in &self.fields_of_interest {
            if field.trim().is_empty() {
                return Err(AuditError::InvalidConfig(
                    "field names must not be empty".to_string(),
                ));
            }
            if field == &self.region_field {
                return Err(AuditError::InvalidConfig(format!(
                    "region field '{field}' cannot also be a field of interest"
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(AuditError::InvalidConfig(format!(
                    "duplicate field of interest '{field}'"
                )));
            }
        }
        // Key checks live in the registry constructor.
        self.build_registry().map(|_| ())
    }

    /// A fresh zeroed registry for one run.
    pub fn build_registry(&self) -> Result<RegionRegistry> {
        let registry =
            RegionRegistry::new(self.region_keys.iter().cloned(), self.fields_of_interest.len())?;
        Ok(match self.unknown_region {
            UnknownRegionPolicy::Fail => registry,
            UnknownRegionPolicy::Unassigned => registry.with_unassigned_bucket(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_presets_are_valid() {
        for preset in [Preset::Addresses, Preset::Centerlines] {
            let config = AuditConfig::preset(preset);
            config.validate().unwrap();
            assert_eq!(config.region_keys.len(), 25);
            assert_eq!(config.region_keys[1], "ANNAPOLIS");
        }
    }

    #[test]
    fn test_empty_field_list_is_rejected() {
        let config = AuditConfig {
            fields_of_interest: vec![],
            ..AuditConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AuditError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_region_field_cannot_be_inspected() {
        let config = AuditConfig {
            fields_of_interest: vec!["NAME".into(), "ADDSOURCE".into()],
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let config = AuditConfig {
            fields_of_interest: vec!["NAME".into(), "NAME".into()],
            ..AuditConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unassigned_policy_adds_bucket() {
        let config = AuditConfig {
            unknown_region: UnknownRegionPolicy::Unassigned,
            ..AuditConfig::default()
        };
        let registry = config.build_registry().unwrap();
        assert!(registry.unassigned().is_some());
        assert!(AuditConfig::default().build_registry().unwrap().unassigned().is_none());
    }

    #[test]
    fn test_json_file_with_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"fields_of_interest": ["STREETNAME"], "region_keys": ["A COUNTY", "B COUNTY"], "unknown_region": "unassigned"}}"#
        )
        .unwrap();
        let config = AuditConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.fields_of_interest, vec!["STREETNAME"]);
        assert_eq!(config.region_field, "ADDSOURCE");
        assert_eq!(config.null_sentinel, "none");
        assert_eq!(config.unknown_region, UnknownRegionPolicy::Unassigned);
        config.validate().unwrap();
    }
}
