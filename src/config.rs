//! Plot configuration.
//!
//! All of the lookup tables (metric names, units, value ranges, pretty names of
//! datasets) and layout defaults are collected in [`PlotConfig`]. The built-in
//! values are given by its [`Default`] implementation; a TOML file and environment
//! variables can override any of them. Tables are merged key by key, so a file
//! containing only
//!
//! ```toml
//! [names.datasets]
//! MYDS = "My dataset"
//!
//! [metrics.rmsd]
//! max = 0.2
//! ```
//!
//! adds one dataset pretty name and caps the RMSD color scale while keeping every other
//! default. Environment variables use the prefix `QA4SM_` and a double underscore
//! to separate nested keys, e.g. `QA4SM_MAP__PAD=0.1`.
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::meta::NameTables;

/// Errors that can occur while loading the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
    #[error("Could not serialize configuration to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Color scale families, describing what the metric's values mean rather than
/// prescribing specific colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColormapClass {
    /// Diverging; high values good, low values bad (e.g. correlations)
    DivBetter,
    /// Diverging; zero is good, both directions equally bad (e.g. bias)
    DivNeutral,
    /// Sequential; increasing values are worse (e.g. RMSD, p-values)
    SeqWorse,
    /// Sequential; increasing values are better (e.g. number of observations)
    SeqBetter,
}

/// How a single metric is labeled and scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricStyle {
    /// Human readable name of the metric
    pub name: String,
    /// Suffix appended to the name in axis labels. A `{}` in it is replaced
    /// with the unit of the reference dataset.
    pub description: String,
    /// Fixed lower bound of the plotted value range; if absent, the data minimum is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Fixed upper bound of the plotted value range; if absent, the data maximum is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub colormap: ColormapClass,
}

impl Default for MetricStyle {
    fn default() -> Self {
        Self { name: String::new(), description: String::new(), min: None, max: None, colormap: ColormapClass::SeqWorse }
    }
}

impl MetricStyle {
    fn new(name: &str, description: &str, min: Option<f64>, max: Option<f64>, colormap: ColormapClass) -> Self {
        Self { name: name.to_string(), description: description.to_string(), min, max, colormap }
    }
}

/// Names of the coordinate variables in a validation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexNames {
    pub lat: String,
    pub lon: String,
    /// Other per-location variables that are neither coordinates nor metrics
    pub extra: Vec<String>,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self { lat: "lat".to_string(), lon: "lon".to_string(), extra: vec!["gpi".to_string()] }
    }
}

impl IndexNames {
    /// All names that are not metric variables: latitude, longitude, then the extras.
    pub fn all(&self) -> Vec<&str> {
        let mut names = vec![self.lat.as_str(), self.lon.as_str()];
        names.extend(self.extra.iter().map(|s| s.as_str()));
        names
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapDefaults {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
    /// Padding around the data, as a fraction of the data's latitude span
    pub pad: f64,
    /// Marker diameter for scattered (point) data, in pixels
    pub marker_size: usize,
    /// Candidate spacings for grid lines, in degrees
    pub grid_intervals: Vec<f64>,
    /// Titles longer than this many characters are wrapped
    pub max_title_len: usize,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            width: 1132,
            height: 610,
            pad: 0.15,
            marker_size: 4,
            grid_intervals: vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0],
            max_title_len: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoxplotDefaults {
    /// Image width per box in pixels; one extra box width is added for the axis
    pub width_per_box: usize,
    /// Image height in pixels
    pub height: usize,
    /// Whether to list median, standard deviation and number of observations under each box
    pub print_stats: bool,
    /// Title line length per box, in characters
    pub title_len_per_box: usize,
}

impl Default for BoxplotDefaults {
    fn default() -> Self {
        Self { width_per_box: 180, height: 520, print_stats: true, title_len_per_box: 30 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WatermarkPosition {
    Top,
    Bottom,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub text: String,
    pub position: WatermarkPosition,
    /// Font size in points
    pub font_size: usize,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self { text: "made with QA4SM (qa4sm.eodc.eu)".to_string(), position: WatermarkPosition::Top, font_size: 10 }
    }
}

/// Configuration for reading and plotting validation files.
///
/// Normally created with [`PlotConfig::load`]. Once loaded it is never modified;
/// pass it by reference to whatever needs the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    /// Pretty names for datasets and their versions, used when a file lacks them
    pub names: NameTables,
    /// Labels, value ranges and color scales of each metric
    pub metrics: IndexMap<String, MetricStyle>,
    /// Units of the soil moisture values of each dataset
    pub units: IndexMap<String, String>,
    pub index: IndexNames,
    /// Metrics never plotted, e.g. because they are all NaN
    pub excluded_metrics: Vec<String>,
    /// Datasets whose data are points rather than a regular grid; any comparison
    /// involving one of these is drawn as a scatter map.
    pub scattered_datasets: Vec<String>,
    pub map: MapDefaults,
    pub boxplot: BoxplotDefaults,
    pub watermark: WatermarkConfig,
}

impl Default for PlotConfig {
    fn default() -> Self {
        use ColormapClass::*;

        let metrics = [
            ("R", MetricStyle::new("Pearson's r", "", Some(-1.0), Some(1.0), DivBetter)),
            ("p_R", MetricStyle::new("Pearson's r p-value", "", Some(0.0), Some(1.0), SeqWorse)),
            ("rho", MetricStyle::new("Spearman's rho", "", Some(-1.0), Some(1.0), DivBetter)),
            ("p_rho", MetricStyle::new("Spearman's rho p-value", "", Some(0.0), Some(1.0), SeqWorse)),
            ("rmsd", MetricStyle::new("Root-mean-square deviation", " in {}", Some(0.0), None, SeqWorse)),
            ("bias", MetricStyle::new("Bias (difference of means)", " in {}", None, None, DivNeutral)),
            ("n_obs", MetricStyle::new("# observations", "", Some(0.0), None, SeqBetter)),
            ("ubRMSD", MetricStyle::new("Unbiased root-mean-square deviation", " in {}", Some(0.0), None, SeqWorse)),
            ("RSS", MetricStyle::new("Residual sum of squares", " in ({})²", Some(0.0), None, SeqWorse)),
            ("mse", MetricStyle::new("Mean square error", "", Some(0.0), None, SeqWorse)),
            ("mse_corr", MetricStyle::new("Mean square error correlation", "", Some(0.0), None, SeqWorse)),
            ("mse_bias", MetricStyle::new("Mean square error bias", "", Some(0.0), None, SeqWorse)),
            ("mse_var", MetricStyle::new("Mean square error variance", "", Some(0.0), None, SeqWorse)),
        ].into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let units = [
            ("ISMN", "m³/m³"),
            ("C3S", "m³/m³"),
            ("GLDAS", "m³/m³"),
            ("ASCAT", "percentage of saturation"),
            ("SMAP", "m³/m³"),
            ("ERA5", "m³/m³"),
            ("ERA5_LAND", "m³/m³"),
            ("SMOS", "m³/m³"),
        ].into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            names: NameTables::default(),
            metrics,
            units,
            index: IndexNames::default(),
            excluded_metrics: vec!["tau".to_string(), "p_tau".to_string()],
            scattered_datasets: vec!["ISMN".to_string()],
            map: MapDefaults::default(),
            boxplot: BoxplotDefaults::default(),
            watermark: WatermarkConfig::default(),
        }
    }
}

impl PlotConfig {
    /// Load the configuration: built-in defaults, overridden by `toml_file` if given,
    /// then by `QA4SM_*` environment variables.
    pub fn load(toml_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(PlotConfig::default()));
        if let Some(p) = toml_file {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.to_path_buf()));
            }
            figment = figment.merge(Toml::file(p));
        }
        figment = figment.merge(Env::prefixed("QA4SM_").split("__"));
        Ok(figment.extract()?)
    }

    /// Like [`PlotConfig::load`], but overriding the defaults from a TOML string and ignoring the environment.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config = Figment::from(Serialized::defaults(PlotConfig::default()))
            .merge(Toml::string(s))
            .extract()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Whether plots of the `reference`/`dataset` comparison should show points instead of a grid.
    pub fn is_scattered(&self, reference: &str, dataset: &str) -> bool {
        self.scattered_datasets.iter().any(|s| s == reference || s == dataset)
    }

    pub fn is_excluded_metric(&self, metric: &str) -> bool {
        self.excluded_metrics.iter().any(|m| m == metric)
    }
}
