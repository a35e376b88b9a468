//! [`ValidationDataset`] backed by a NetCDF file.
use std::path::Path;

use log::debug;
use netcdf::{AttributeValue, Extents};

use crate::{dataset::ValidationDataset, error::DataError, meta::Attributes};

pub struct NcDataset {
    file: netcdf::File,
}

impl NcDataset {
    pub fn open(path: &Path) -> netcdf::Result<Self> {
        let file = netcdf::open(path)?;
        Ok(Self { file })
    }

    fn fill_values(var: &netcdf::Variable) -> Vec<f64> {
        ["_FillValue", "missing_value"]
            .into_iter()
            .filter_map(|name| var.attribute(name))
            .filter_map(|att| att.value().ok())
            .filter_map(|value| attr_as_f64(&value))
            .collect()
    }
}

impl ValidationDataset for NcDataset {
    fn variable_names(&self) -> Vec<String> {
        self.file.variables()
            .filter(|var| {
                let name = var.name();
                !(var.dimensions().len() == 1 && var.dimensions()[0].name() == name)
            })
            .map(|var| var.name())
            .collect()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn global_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        for att in self.file.attributes() {
            match att.value() {
                Ok(AttributeValue::Str(s)) => {
                    attrs.insert(att.name().to_string(), s);
                },
                Ok(AttributeValue::Strs(mut items)) if items.len() == 1 => {
                    attrs.insert(att.name().to_string(), items.remove(0));
                },
                Ok(_) => debug!("Skipping non-string global attribute '{}'", att.name()),
                Err(e) => debug!("Could not read global attribute '{}': {e}", att.name()),
            }
        }
        attrs
    }

    fn values(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let var = self.file.variable(name)
            .ok_or_else(|| DataError::missing(&[name], &[name]))?;
        let fills = Self::fill_values(&var);

        let arr = var.get::<f64, _>(Extents::All)
            .map_err(|e| DataError::Backend { varname: name.to_string(), reason: e.to_string() })?;

        let values = arr.iter()
            .map(|&v| if fills.contains(&v) { f64::NAN } else { v })
            .collect();
        Ok(values)
    }
}

fn attr_as_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(v) => Some(*v),
        AttributeValue::Float(v) => Some(*v as f64),
        AttributeValue::Int(v) => Some(*v as f64),
        AttributeValue::Short(v) => Some(*v as f64),
        AttributeValue::Schar(v) => Some(*v as f64),
        AttributeValue::Uchar(v) => Some(*v as f64),
        AttributeValue::Ushort(v) => Some(*v as f64),
        AttributeValue::Uint(v) => Some(*v as f64),
        AttributeValue::Longlong(v) => Some(*v as f64),
        AttributeValue::Ulonglong(v) => Some(*v as f64),
        _ => None,
    }
}
