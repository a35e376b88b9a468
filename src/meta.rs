//! Decoding of QA4SM variable names into dataset metadata.
//!
//! QA4SM output files store one variable per metric and dataset pair, with
//! the pair encoded in the variable name, e.g. `ubRMSD_between_4-ISMN_3-ESA_CCI_SM_combined`
//! is the unbiased RMSD of dataset #3 (`ESA_CCI_SM_combined`) against reference
//! dataset #4 (`ISMN`). The only exception is `n_obs`, which is shared by
//! all pairs.
//!
//! The human-readable names of the datasets and their versions are stored
//! as global attributes of the file, indexed by the 0-based dataset number
//! (`val_dc_pretty_name0` belongs to dataset #1). Older files may lack these,
//! so [`MetaResolver`] falls back first on the tables in [`NameTables`] and
//! then on the short names themselves.
use std::{fmt::Display, str::FromStr, sync::OnceLock};

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

static VARNAME_REGEX: OnceLock<regex::Regex> = OnceLock::new();

/// Name of the variable holding the number of observations
pub const N_OBS: &'static str = "n_obs";

/// Reference and dataset assumed for the `n_obs` variable.
///
/// `n_obs` does not carry its dataset pair in its name, so which dataset it
/// belongs to cannot be inferred. QA4SM files so far always had GLDAS as
/// dataset #1; files where that is not true will get mislabeled.
pub const N_OBS_DATASET: &'static str = "GLDAS";

/// Value used for the version of a dataset when the file does not record one
pub const UNKNOWN_VERSION: &'static str = "unknown";

/// Value used for the version pretty name of a dataset when the file does not record a version
pub const UNKNOWN_VERSION_PRETTY_NAME: &'static str = "unknown version";

/// Global attributes of a validation file, as attribute name to value
pub type Attributes = IndexMap<String, String>;

pub(crate) static DEFAULT_DATASET_PRETTY_NAMES: &'static [(&'static str, &'static str)] = &[
    ("ISMN", "ISMN"),
    ("C3S", "C3S"),
    ("GLDAS", "GLDAS"),
    ("SMAP", "SMAP level 3"),
    ("ASCAT", "H-SAF ASCAT SSM CDR"),
    ("SMOS", "SMOS IC"),
    ("ERA5", "ERA5"),
    ("ERA5_LAND", "ERA5-Land"),
    ("ESA_CCI_SM_combined", "ESA CCI SM combined"),
    ("ESA_CCI_SM_active", "ESA CCI SM active"),
    ("ESA_CCI_SM_passive", "ESA CCI SM passive"),
];

pub(crate) static DEFAULT_VERSION_PRETTY_NAMES: &'static [(&'static str, &'static str)] = &[
    ("ISMN_V20180712_TEST", "20180712 testset"),
    ("ISMN_V20180712_MINI", "20180712 mini testset"),
    ("ISMN_V20180830_GLOBAL", "20180830 global"),
    ("ISMN_V20191211", "20191211 global"),
    ("C3S_V201706", "v201706"),
    ("C3S_V201812", "v201812"),
    ("C3S_V201912", "v201912"),
    ("SMAP_V5_PM", "v5 PM/ascending"),
    ("SMAP_V6_PM", "v6 PM/ascending"),
    ("ASCAT_H113", "H113"),
    ("SMOS_105_ASC", "V.105 Ascending"),
    ("GLDAS_NOAH025_3H_2_1", "NOAH025 3H.2.1"),
    ("GLDAS_TEST", "TEST"),
    ("ERA5_test", "ERA5 test"),
    ("ERA5_20190613", "v20190613"),
    ("ERA5_LAND_V20190904", "v20190904"),
    ("ESA_CCI_SM_C_V04_4", "v04.4"),
    ("ESA_CCI_SM_C_V04_5", "v04.5"),
    ("ESA_CCI_SM_C_V04_7", "v04.7"),
    ("ESA_CCI_SM_A_V04_4", "v04.4"),
    ("ESA_CCI_SM_P_V04_4", "v04.4"),
];

/// Errors that can occur while decoding a variable name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("The given var '{0}' does not match the pattern '<metric>_between_<n>-<reference>_<n>-<dataset>'")]
    InvalidVarName(String),
    #[error("The dataset number '{value}' in var '{varname}' is too large")]
    InvalidNumber{varname: String, value: String},
}

impl ParseError {
    /// The variable name that could not be decoded
    pub fn varname(&self) -> &str {
        match self {
            Self::InvalidVarName(v) => v,
            Self::InvalidNumber { varname, .. } => varname,
        }
    }
}

/// What to do with variables in a batch whose names cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Stop at the first undecodable name and return its error
    #[default]
    FailFast,
    /// Log a warning and leave the variable out of the result
    SkipAndWarn,
}

/// A decoded variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarName {
    /// The `n_obs` variable, which is not tied to a dataset pair
    NObs,
    /// A metric computed for one dataset against a reference
    Between {
        metric: String,
        ref_no: u32,
        ref_name: String,
        ds_no: u32,
        ds_name: String,
    },
}

impl VarName {
    pub fn metric(&self) -> &str {
        match self {
            Self::NObs => N_OBS,
            Self::Between { metric, .. } => metric,
        }
    }

    /// The reference dataset's number and short name.
    pub fn reference(&self) -> (u32, &str) {
        match self {
            Self::NObs => (1, N_OBS_DATASET),
            Self::Between { ref_no, ref_name, .. } => (*ref_no, ref_name),
        }
    }

    /// The compared dataset's number and short name.
    pub fn dataset(&self) -> (u32, &str) {
        match self {
            Self::NObs => (1, N_OBS_DATASET),
            Self::Between { ds_no, ds_name, .. } => (*ds_no, ds_name),
        }
    }

    /// The part of the name after `_between_`, e.g. `4-ISMN_3-C3S`.
    /// `n_obs` has no pair and returns `None`.
    pub fn pair_name(&self) -> Option<String> {
        match self {
            Self::NObs => None,
            Self::Between { ref_no, ref_name, ds_no, ds_name, .. } => {
                Some(format!("{ref_no}-{ref_name}_{ds_no}-{ds_name}"))
            }
        }
    }
}

impl FromStr for VarName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == N_OBS {
            return Ok(Self::NObs);
        }

        let re = VARNAME_REGEX.get_or_init(|| {
            regex::Regex::new(r"^(?<metric>[^0-9]+)_between_(?<ref_no>[0-9]+)-(?<ref>\S+)_(?<ds_no>[0-9]+)-(?<ds>\S+)").unwrap()
        });

        let caps = re.captures(s)
            .ok_or_else(|| ParseError::InvalidVarName(s.to_string()))?;

        let parse_no = |group: &str| -> Result<u32, ParseError> {
            caps[group].parse().map_err(|_| ParseError::InvalidNumber {
                varname: s.to_string(),
                value: caps[group].to_string()
            })
        };

        Ok(Self::Between {
            metric: caps["metric"].to_string(),
            ref_no: parse_no("ref_no")?,
            ref_name: caps["ref"].to_string(),
            ds_no: parse_no("ds_no")?,
            ds_name: caps["ds"].to_string(),
        })
    }
}

impl Display for VarName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NObs => write!(f, "{N_OBS}"),
            Self::Between { metric, ref_no, ref_name, ds_no, ds_name } => {
                write!(f, "{metric}_between_{ref_no}-{ref_name}_{ds_no}-{ds_name}")
            }
        }
    }
}

/// Lookup tables of human-readable names used when a file's attributes do not provide them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NameTables {
    /// Dataset short name (e.g. "SMOS") to pretty name (e.g. "SMOS IC")
    pub datasets: IndexMap<String, String>,
    /// Dataset version (e.g. "SMOS_105_ASC") to pretty name (e.g. "V.105 Ascending")
    pub versions: IndexMap<String, String>,
}

impl NameTables {
    /// Tables with no entries, so every fallback ends at the short name or version itself.
    pub fn empty() -> Self {
        Self { datasets: IndexMap::new(), versions: IndexMap::new() }
    }
}

impl Default for NameTables {
    fn default() -> Self {
        let to_map = |pairs: &[(&str, &str)]| -> IndexMap<String, String> {
            pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
        };
        Self {
            datasets: to_map(DEFAULT_DATASET_PRETTY_NAMES),
            versions: to_map(DEFAULT_VERSION_PRETTY_NAMES),
        }
    }
}

/// Everything known about one of the two datasets in a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMeta {
    /// 1-based position of the dataset in the validation
    pub number: u32,
    pub short_name: String,
    pub pretty_name: String,
    pub version: String,
    pub version_pretty_name: String,
}

/// Metadata for one variable of a validation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableMetadata {
    pub metric: String,
    #[serde(rename = "ref")]
    pub reference: DatasetMeta,
    #[serde(rename = "ds")]
    pub dataset: DatasetMeta,
}

/// Resolves variable names to [`VariableMetadata`] using a file's global attributes
/// with a fallback to the given name tables.
#[derive(Debug, Clone, Copy)]
pub struct MetaResolver<'t> {
    tables: &'t NameTables,
}

impl<'t> MetaResolver<'t> {
    pub fn new(tables: &'t NameTables) -> Self {
        Self { tables }
    }

    /// Decode `varname` and look up the names and versions of both datasets.
    ///
    /// Only fails if `varname` is neither `n_obs` nor follows the
    /// `<metric>_between_<n>-<ref>_<n>-<ds>` pattern; missing attributes or
    /// table entries are never an error.
    pub fn resolve(&self, attrs: &Attributes, varname: &str) -> Result<VariableMetadata, ParseError> {
        let parsed: VarName = varname.parse()?;
        let (ref_no, ref_name) = parsed.reference();
        let (ds_no, ds_name) = parsed.dataset();

        Ok(VariableMetadata {
            metric: parsed.metric().to_string(),
            reference: self.resolve_dataset(attrs, ref_name, ref_no),
            dataset: self.resolve_dataset(attrs, ds_name, ds_no),
        })
    }

    /// Resolve each of `varnames`, keyed by variable name in the order given.
    ///
    /// Duplicate names collapse into one entry.
    pub fn resolve_all<S: AsRef<str>>(&self, attrs: &Attributes, varnames: &[S], policy: BatchPolicy)
    -> Result<IndexMap<String, VariableMetadata>, ParseError> {
        let mut varmeta = IndexMap::with_capacity(varnames.len());
        for varname in varnames {
            let varname = varname.as_ref();
            match (self.resolve(attrs, varname), policy) {
                (Ok(meta), _) => {
                    varmeta.insert(varname.to_string(), meta);
                },
                (Err(e), BatchPolicy::SkipAndWarn) => {
                    warn!("Skipping variable '{varname}': {e}");
                },
                (Err(e), BatchPolicy::FailFast) => return Err(e),
            }
        }
        Ok(varmeta)
    }

    fn resolve_dataset(&self, attrs: &Attributes, short_name: &str, number: u32) -> DatasetMeta {
        // Attributes are indexed from 0, dataset numbers from 1. Number 0 gives
        // index -1, which no attribute uses, so it goes straight to the fallbacks.
        let idx = i64::from(number) - 1;

        let pretty_name = attrs.get(&format!("val_dc_pretty_name{idx}"))
            .or_else(|| self.tables.datasets.get(short_name))
            .cloned()
            .unwrap_or_else(|| short_name.to_string());

        let (version, version_pretty_name) = if let Some(version) = attrs.get(&format!("val_dc_version{idx}")) {
            let version_pretty_name = attrs.get(&format!("val_dc_version_pretty_name{idx}"))
                .or_else(|| self.tables.versions.get(version))
                .cloned()
                .unwrap_or_else(|| version.clone());
            (version.clone(), version_pretty_name)
        } else {
            (UNKNOWN_VERSION.to_string(), UNKNOWN_VERSION_PRETTY_NAME.to_string())
        };

        DatasetMeta {
            number,
            short_name: short_name.to_string(),
            pretty_name,
            version,
            version_pretty_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[fixture]
    fn empty_tables() -> NameTables {
        NameTables::empty()
    }

    #[rstest]
    #[case("R_between_1-ISMN_2-SMAP", "R", 1, "ISMN", 2, "SMAP")]
    #[case("rmsd_between_3-ISMN_1-C3S", "rmsd", 3, "ISMN", 1, "C3S")]
    #[case("ubRMSD_between_4-ISMN_3-ESA_CCI_SM_combined", "ubRMSD", 4, "ISMN", 3, "ESA_CCI_SM_combined")]
    #[case("p_rho_between_12-ERA5_LAND_10-SMOS", "p_rho", 12, "ERA5_LAND", 10, "SMOS")]
    #[case("mse_corr_between_1-ISMN_2-SMAP", "mse_corr", 1, "ISMN", 2, "SMAP")]
    fn test_groups_from_name(
        empty_tables: NameTables,
        #[case] varname: &str,
        #[case] metric: &str,
        #[case] ref_no: u32,
        #[case] ref_name: &str,
        #[case] ds_no: u32,
        #[case] ds_name: &str,
    ) {
        let meta = MetaResolver::new(&empty_tables).resolve(&Attributes::new(), varname).unwrap();
        assert_eq!(meta.metric, metric);
        assert_eq!(meta.reference.number, ref_no);
        assert_eq!(meta.reference.short_name, ref_name);
        assert_eq!(meta.dataset.number, ds_no);
        assert_eq!(meta.dataset.short_name, ds_name);
    }

    #[rstest]
    fn test_n_obs_ignores_attributes(empty_tables: NameTables) {
        let a = attrs(&[
            ("val_dc_pretty_name0", "Global Land Data Assimilation System"),
            ("val_dc_pretty_name1", "Something else"),
        ]);
        let resolver = MetaResolver::new(&empty_tables);
        for a in [Attributes::new(), a] {
            let meta = resolver.resolve(&a, "n_obs").unwrap();
            assert_eq!(meta.metric, "n_obs");
            assert_eq!(meta.reference.short_name, "GLDAS");
            assert_eq!(meta.dataset.short_name, "GLDAS");
            assert_eq!(meta.reference.number, 1);
            assert_eq!(meta.dataset.number, 1);
        }
    }

    #[test]
    fn test_attribute_overrides_table() {
        let tables = NameTables::default();
        assert!(tables.datasets.contains_key("ISMN"));
        let a = attrs(&[("val_dc_pretty_name0", "In Situ Network")]);
        let meta = MetaResolver::new(&tables).resolve(&a, "R_between_1-ISMN_2-SMAP").unwrap();
        assert_eq!(meta.reference.pretty_name, "In Situ Network");
        // No val_dc_pretty_name1, so SMAP comes from the table
        assert_eq!(meta.dataset.pretty_name, "SMAP level 3");
    }

    #[rstest]
    fn test_pretty_name_identity_fallback(empty_tables: NameTables) {
        let meta = MetaResolver::new(&empty_tables)
            .resolve(&Attributes::new(), "rmsd_between_3-ISMN_1-C3S")
            .unwrap();
        assert_eq!(meta.reference.pretty_name, meta.reference.short_name);
        assert_eq!(meta.dataset.pretty_name, "C3S");
    }

    #[rstest]
    fn test_unknown_version_skips_version_pretty_name(empty_tables: NameTables) {
        // A version pretty name without a version must not be picked up
        let a = attrs(&[("val_dc_version_pretty_name0", "v1.0")]);
        let meta = MetaResolver::new(&empty_tables).resolve(&a, "R_between_1-ISMN_2-SMAP").unwrap();
        assert_eq!(meta.reference.version, "unknown");
        assert_eq!(meta.reference.version_pretty_name, "unknown version");
        assert_eq!(meta.dataset.version, "unknown");
        assert_eq!(meta.dataset.version_pretty_name, "unknown version");
    }

    #[test]
    fn test_version_fallback_chain() {
        let tables = NameTables::default();
        let a = attrs(&[
            ("val_dc_version0", "ISMN_V20180712_MINI"),
            ("val_dc_version1", "SMAP_V5_PM"),
            ("val_dc_version_pretty_name1", "version five"),
            ("val_dc_version2", "C3S_V999"),
        ]);
        let resolver = MetaResolver::new(&tables);

        let meta = resolver.resolve(&a, "R_between_1-ISMN_2-SMAP").unwrap();
        assert_eq!(meta.reference.version, "ISMN_V20180712_MINI");
        assert_eq!(meta.reference.version_pretty_name, "20180712 mini testset");
        assert_eq!(meta.dataset.version, "SMAP_V5_PM");
        assert_eq!(meta.dataset.version_pretty_name, "version five");

        let meta = resolver.resolve(&a, "R_between_1-ISMN_3-C3S").unwrap();
        assert_eq!(meta.dataset.version, "C3S_V999");
        assert_eq!(meta.dataset.version_pretty_name, "C3S_V999");
    }

    #[test]
    fn test_spec_example_no_attributes() {
        let tables = NameTables::default();
        let meta = MetaResolver::new(&tables)
            .resolve(&Attributes::new(), "rmsd_between_3-ISMN_1-C3S")
            .unwrap();
        assert_eq!(meta.metric, "rmsd");
        assert_eq!(meta.reference.number, 3);
        assert_eq!(meta.reference.short_name, "ISMN");
        assert_eq!(meta.dataset.number, 1);
        assert_eq!(meta.dataset.short_name, "C3S");
        assert_eq!(meta.reference.version, "unknown");
        assert_eq!(meta.dataset.version, "unknown");
        assert_eq!(meta.reference.pretty_name, "ISMN");
        assert_eq!(meta.dataset.pretty_name, "C3S");
    }

    #[rstest]
    #[case("not_a_valid_name")]
    #[case("lat")]
    #[case("R_between_ISMN_SMAP")]
    #[case("R_between_1-ISMN")]
    #[case("1_between_1-ISMN_2-SMAP")]
    #[case("N_OBS")]
    fn test_invalid_names(empty_tables: NameTables, #[case] varname: &str) {
        let err = MetaResolver::new(&empty_tables).resolve(&Attributes::new(), varname).unwrap_err();
        assert_eq!(err, ParseError::InvalidVarName(varname.to_string()));
        assert_eq!(err.varname(), varname);
    }

    #[rstest]
    fn test_number_overflow(empty_tables: NameTables) {
        let varname = "R_between_99999999999-ISMN_2-SMAP";
        let err = MetaResolver::new(&empty_tables).resolve(&Attributes::new(), varname).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
        assert!(err.to_string().contains(varname));
    }

    #[rstest]
    fn test_dataset_zero_uses_fallbacks(empty_tables: NameTables) {
        let a = attrs(&[("val_dc_pretty_name0", "first"), ("val_dc_version0", "v1")]);
        let meta = MetaResolver::new(&empty_tables).resolve(&a, "R_between_0-ISMN_1-SMAP").unwrap();
        assert_eq!(meta.reference.pretty_name, "ISMN");
        assert_eq!(meta.reference.version, "unknown");
        assert_eq!(meta.dataset.pretty_name, "first");
        assert_eq!(meta.dataset.version, "v1");
    }

    #[test]
    fn test_pair_name_and_display() {
        let v: VarName = "ubRMSD_between_4-ISMN_3-ESA_CCI_SM_combined".parse().unwrap();
        assert_eq!(v.pair_name().as_deref(), Some("4-ISMN_3-ESA_CCI_SM_combined"));
        assert_eq!(v.to_string(), "ubRMSD_between_4-ISMN_3-ESA_CCI_SM_combined");

        let v: VarName = "p_rho_between_12-ERA5_LAND_10-SMOS".parse().unwrap();
        assert_eq!(v.to_string(), "p_rho_between_12-ERA5_LAND_10-SMOS");

        let v: VarName = "n_obs".parse().unwrap();
        assert_eq!(v, VarName::NObs);
        assert_eq!(v.pair_name(), None);
        assert_eq!(v.to_string(), "n_obs");
    }

    #[rstest]
    fn test_resolve_all_keeps_order(empty_tables: NameTables) {
        let names = ["R_between_1-ISMN_3-SMAP", "n_obs", "R_between_1-ISMN_2-C3S"];
        let varmeta = MetaResolver::new(&empty_tables)
            .resolve_all(&Attributes::new(), &names, BatchPolicy::FailFast)
            .unwrap();
        let keys: Vec<&str> = varmeta.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, names);
        assert_eq!(varmeta["R_between_1-ISMN_2-C3S"].dataset.short_name, "C3S");
    }

    #[rstest]
    fn test_resolve_all_policies(empty_tables: NameTables) {
        let names = ["R_between_1-ISMN_3-SMAP", "gpi", "R_between_1-ISMN_2-C3S"];
        let resolver = MetaResolver::new(&empty_tables);

        let err = resolver.resolve_all(&Attributes::new(), &names, BatchPolicy::FailFast).unwrap_err();
        assert_eq!(err.varname(), "gpi");

        let varmeta = resolver.resolve_all(&Attributes::new(), &names, BatchPolicy::SkipAndWarn).unwrap();
        assert_eq!(varmeta.len(), 2);
        assert!(!varmeta.contains_key("gpi"));
    }
}
