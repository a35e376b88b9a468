//! Access to the contents of a validation output file.
//!
//! Everything downstream of file opening works against [`ValidationDataset`], so
//! that the NetCDF backend (the `netcdf` feature, see [`crate::nc_dataset`]) and
//! the in-memory [`MemDataset`] are interchangeable.
use indexmap::IndexMap;

use crate::{error::DataError, meta::Attributes};

pub trait ValidationDataset {
    /// Names of the data variables, in file order. Coordinate variables
    /// (those named after a dimension) are not included.
    fn variable_names(&self) -> Vec<String>;

    /// Whether a variable named `name` exists, whether or not it is a coordinate.
    fn has_variable(&self, name: &str) -> bool;

    /// The string-valued global attributes.
    fn global_attributes(&self) -> Attributes;

    /// All values of a variable, flattened, as `f64`. Fill values become NaN.
    fn values(&self, name: &str) -> Result<Vec<f64>, DataError>;
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemDataset {
    attrs: Attributes,
    coords: IndexMap<String, Vec<f64>>,
    vars: IndexMap<String, Vec<f64>>,
}

impl MemDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Add a data variable.
    pub fn with_var<S: Into<String>>(mut self, name: S, values: Vec<f64>) -> Self {
        self.vars.insert(name.into(), values);
        self
    }

    /// Add a coordinate variable, which is readable but not listed by [`ValidationDataset::variable_names`].
    pub fn with_coord<S: Into<String>>(mut self, name: S, values: Vec<f64>) -> Self {
        self.coords.insert(name.into(), values);
        self
    }
}

impl ValidationDataset for MemDataset {
    fn variable_names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.vars.contains_key(name) || self.coords.contains_key(name)
    }

    fn global_attributes(&self) -> Attributes {
        self.attrs.clone()
    }

    fn values(&self, name: &str) -> Result<Vec<f64>, DataError> {
        self.vars.get(name)
            .or_else(|| self.coords.get(name))
            .cloned()
            .ok_or_else(|| DataError::missing(&[name], &[name]))
    }
}
