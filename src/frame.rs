//! Loading metric values, with their coordinates, out of a dataset.
use std::{fmt::Display, str::FromStr};

use indexmap::IndexMap;

use crate::{config::IndexNames, dataset::ValidationDataset, error::DataError};

/// A geographic bounding box, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Extent {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }

    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid extent '{0}': expected four comma separated numbers x_min,x_max,y_min,y_max")]
pub struct ExtentParseError(String);

impl FromStr for Extent {
    type Err = ExtentParseError;

    /// Parse an extent given as `x_min,x_max,y_min,y_max`, i.e. longitudes first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s.split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ExtentParseError(s.to_string()))?;

        if let [lon_min, lon_max, lat_min, lat_max] = values[..] {
            Ok(Self { lon_min, lon_max, lat_min, lat_max })
        } else {
            Err(ExtentParseError(s.to_string()))
        }
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.lon_min, self.lon_max, self.lat_min, self.lat_max)
    }
}

/// Values of one or more variables at the locations where all of them are valid.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFrame {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub columns: IndexMap<String, Vec<f64>>,
}

impl MetricFrame {
    /// Number of locations (rows)
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    pub fn column(&self, varname: &str) -> Option<&[f64]> {
        self.columns.get(varname).map(|v| v.as_slice())
    }
}

/// Read `variables` and the coordinates from `ds`.
///
/// Locations where any of `variables` is NaN are dropped, as are locations
/// outside of `extent`, if given. All requested variables must exist; if any
/// do not, the error lists every one of them.
pub fn load_data<D: ValidationDataset + ?Sized, S: AsRef<str>>(
    ds: &D,
    variables: &[S],
    extent: Option<&Extent>,
    index: &IndexNames,
) -> Result<MetricFrame, DataError> {
    let missing: Vec<&str> = [index.lat.as_str(), index.lon.as_str()].into_iter()
        .chain(variables.iter().map(|v| v.as_ref()))
        .filter(|v| !ds.has_variable(v))
        .collect();
    if !missing.is_empty() {
        return Err(DataError::missing(variables, &missing));
    }

    let lat = ds.values(&index.lat)?;
    let lon = ds.values(&index.lon)?;
    let nrow = lat.len();
    if lon.len() != nrow {
        return Err(DataError::LengthMismatch { varname: index.lon.clone(), got: lon.len(), expected: nrow });
    }

    let mut raw_columns = IndexMap::with_capacity(variables.len());
    for varname in variables {
        let varname = varname.as_ref();
        let values = ds.values(varname)?;
        if values.len() != nrow {
            return Err(DataError::LengthMismatch { varname: varname.to_string(), got: values.len(), expected: nrow });
        }
        raw_columns.insert(varname.to_string(), values);
    }

    let keep: Vec<bool> = (0..nrow)
        .map(|i| {
            let in_extent = extent.map(|e| e.contains(lat[i], lon[i])).unwrap_or(true);
            in_extent && raw_columns.values().all(|col| !col[i].is_nan())
        })
        .collect();

    let subset = |values: Vec<f64>| -> Vec<f64> {
        values.into_iter()
            .zip(keep.iter())
            .filter_map(|(v, &k)| k.then_some(v))
            .collect()
    };

    Ok(MetricFrame {
        lat: subset(lat),
        lon: subset(lon),
        columns: raw_columns.into_iter().map(|(k, v)| (k, subset(v))).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemDataset;
    use rstest::{fixture, rstest};

    const NAN: f64 = f64::NAN;

    #[fixture]
    fn dataset() -> MemDataset {
        MemDataset::new()
            .with_var("lat", vec![10.0, 20.0, 30.0, 40.0])
            .with_var("lon", vec![-5.0, 5.0, 15.0, 25.0])
            .with_var("R_between_1-ISMN_2-C3S", vec![0.1, NAN, 0.3, 0.4])
            .with_var("R_between_1-ISMN_3-SMAP", vec![0.5, 0.6, 0.7, NAN])
            .with_var("short", vec![1.0])
    }

    #[rstest]
    fn test_drop_nan_rows(dataset: MemDataset) {
        let vars = ["R_between_1-ISMN_2-C3S", "R_between_1-ISMN_3-SMAP"];
        let frame = load_data(&dataset, &vars, None, &IndexNames::default()).unwrap();
        assert_eq!(frame.lat, vec![10.0, 30.0]);
        assert_eq!(frame.lon, vec![-5.0, 15.0]);
        assert_eq!(frame.column(vars[0]).unwrap(), &[0.1, 0.3]);
        assert_eq!(frame.column(vars[1]).unwrap(), &[0.5, 0.7]);

        let frame = load_data(&dataset, &vars[1..], None, &IndexNames::default()).unwrap();
        assert_eq!(frame.len(), 3);
    }

    #[rstest]
    fn test_extent(dataset: MemDataset) {
        let extent: Extent = "0,20,0,35".parse().unwrap();
        let frame = load_data(&dataset, &["R_between_1-ISMN_3-SMAP"], Some(&extent), &IndexNames::default()).unwrap();
        assert_eq!(frame.lat, vec![20.0, 30.0]);
        assert_eq!(frame.column("R_between_1-ISMN_3-SMAP").unwrap(), &[0.6, 0.7]);
    }

    #[test]
    fn test_extent_is_inclusive() {
        let ds = MemDataset::new()
            .with_var("lat", vec![0.0, 35.0, 36.0, 10.0])
            .with_var("lon", vec![0.0, 20.0, 20.0, 20.000001])
            .with_var("bias_between_1-GLDAS_2-C3S", vec![1.0, 2.0, 3.0, 4.0]);
        let extent: Extent = "0,20,0,35".parse().unwrap();
        let frame = load_data(&ds, &["bias_between_1-GLDAS_2-C3S"], Some(&extent), &IndexNames::default()).unwrap();
        assert_eq!(frame.lat, vec![0.0, 35.0]);
        assert_eq!(frame.lon, vec![0.0, 20.0]);
        assert_eq!(frame.column("bias_between_1-GLDAS_2-C3S").unwrap(), &[1.0, 2.0]);
    }

    #[rstest]
    fn test_missing_variables(dataset: MemDataset) {
        let vars = ["R_between_1-ISMN_2-C3S", "R_between_1-ISMN_4-ERA5", "bias_between_1-ISMN_2-C3S"];
        let err = load_data(&dataset, &vars, None, &IndexNames::default()).unwrap_err();
        match &err {
            DataError::MissingVariables { requested, missing } => {
                assert_eq!(requested.len(), 3);
                assert_eq!(missing, &vec!["R_between_1-ISMN_4-ERA5", "bias_between_1-ISMN_2-C3S"]);
            },
            _ => panic!("unexpected error: {err}"),
        }
        assert!(err.to_string().contains("R_between_1-ISMN_2-C3S"));
    }

    #[rstest]
    fn test_length_mismatch(dataset: MemDataset) {
        let err = load_data(&dataset, &["short"], None, &IndexNames::default()).unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { got: 1, expected: 4, .. }));
    }

    #[rstest]
    #[case("1,2,3,4", Some(Extent { lon_min: 1.0, lon_max: 2.0, lat_min: 3.0, lat_max: 4.0 }))]
    #[case(" -10.5, 10 ,-5,5", Some(Extent { lon_min: -10.5, lon_max: 10.0, lat_min: -5.0, lat_max: 5.0 }))]
    #[case("1,2,3", None)]
    #[case("1,2,3,4,5", None)]
    #[case("a,2,3,4", None)]
    fn test_parse_extent(#[case] s: &str, #[case] expected: Option<Extent>) {
        assert_eq!(s.parse::<Extent>().ok(), expected);
    }
}
