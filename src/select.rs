//! Choosing which variables of a validation file to work with.
use itertools::Itertools;
use log::warn;

use crate::{
    config::PlotConfig,
    dataset::ValidationDataset,
    meta::{BatchPolicy, MetaResolver, N_OBS},
};

/// All variables except the index variables (latitude, longitude and the extra index names).
///
/// An index name that is not among `all_vars` is reported with a warning, not an error.
pub fn default_variables<S: AsRef<str>>(all_vars: &[S], index_names: &[&str]) -> Vec<String> {
    for &index in index_names {
        if !all_vars.iter().any(|v| v.as_ref() == index) {
            warn!("{index} is not in variables.");
        }
    }

    all_vars.iter()
        .map(|v| v.as_ref())
        .filter(|v| !index_names.contains(v))
        .map(|v| v.to_string())
        .collect()
}

/// The metrics available in `ds`, in order of first appearance.
///
/// Variables whose names cannot be decoded are skipped with a warning, and the
/// metrics listed in [`PlotConfig::excluded_metrics`] are never returned.
pub fn get_metrics<D: ValidationDataset + ?Sized>(ds: &D, config: &PlotConfig) -> Vec<String> {
    let variables = default_variables(&ds.variable_names(), &config.index.all());
    let attrs = ds.global_attributes();
    let varmeta = MetaResolver::new(&config.names)
        .resolve_all(&attrs, &variables, BatchPolicy::SkipAndWarn)
        // SkipAndWarn never returns an error
        .unwrap_or_default();

    varmeta.into_values()
        .map(|meta| meta.metric)
        .unique()
        .filter(|metric| !config.is_excluded_metric(metric))
        .collect()
}

/// The variables of `varnames` containing `metric`.
///
/// `n_obs` does not follow the `<metric>_between_...` pattern, so it is always
/// returned as the only variable for that metric. Matching is case insensitive.
pub fn get_var<S: AsRef<str>>(varnames: &[S], metric: &str) -> Vec<String> {
    if metric == N_OBS {
        return vec![N_OBS.to_string()];
    }

    let prefix = format!("{}_between", metric.to_lowercase());
    varnames.iter()
        .map(|v| v.as_ref())
        .filter(|v| v.to_lowercase().starts_with(&prefix))
        .map(|v| v.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemDataset;
    use rstest::{fixture, rstest};

    #[fixture]
    fn dataset() -> MemDataset {
        MemDataset::new()
            .with_var("lat", vec![])
            .with_var("lon", vec![])
            .with_var("gpi", vec![])
            .with_var("R_between_1-ISMN_2-C3S", vec![])
            .with_var("R_between_1-ISMN_3-SMAP", vec![])
            .with_var("p_R_between_1-ISMN_2-C3S", vec![])
            .with_var("tau_between_1-ISMN_2-C3S", vec![])
            .with_var("n_obs", vec![])
            .with_var("rmsd_between_1-ISMN_2-C3S", vec![])
            .with_var("idx", vec![])
    }

    #[test]
    fn test_default_variables() {
        let all = ["lat", "R_between_1-ISMN_2-C3S", "lon", "gpi", "n_obs"];
        let vars = default_variables(&all, &["lat", "lon", "gpi"]);
        assert_eq!(vars, vec!["R_between_1-ISMN_2-C3S", "n_obs"]);

        // Missing index names are not an error
        let all = ["R_between_1-ISMN_2-C3S"];
        let vars = default_variables(&all, &["lat", "lon", "gpi"]);
        assert_eq!(vars, vec!["R_between_1-ISMN_2-C3S"]);
    }

    #[rstest]
    fn test_get_metrics(dataset: MemDataset) {
        let metrics = get_metrics(&dataset, &PlotConfig::default());
        assert_eq!(metrics, vec!["R", "p_R", "n_obs", "rmsd"]);
    }

    #[rstest]
    fn test_get_metrics_nothing_excluded(dataset: MemDataset) {
        let mut config = PlotConfig::default();
        config.excluded_metrics.clear();
        let metrics = get_metrics(&dataset, &config);
        assert_eq!(metrics, vec!["R", "p_R", "tau", "n_obs", "rmsd"]);
    }

    #[rstest]
    #[case("R", vec!["R_between_1-ISMN_2-C3S", "R_between_1-ISMN_3-SMAP"])]
    #[case("r", vec!["R_between_1-ISMN_2-C3S", "R_between_1-ISMN_3-SMAP"])]
    #[case("p_R", vec!["p_R_between_1-ISMN_2-C3S"])]
    #[case("n_obs", vec!["n_obs"])]
    #[case("ubRMSD", vec![])]
    fn test_get_var(dataset: MemDataset, #[case] metric: &str, #[case] expected: Vec<&str>) {
        let vars = get_var(&dataset.variable_names(), metric);
        assert_eq!(vars, expected);
    }
}
