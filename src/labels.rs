//! Titles, axis labels and file names for the plots.
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;

use crate::{
    config::PlotConfig,
    meta::{VarName, VariableMetadata, N_OBS},
    stats,
};

/// Format `x` the way C's `%g` (and Python's `{:g}`) does, with `sig` significant digits.
///
/// Trailing zeros are removed. Scientific notation is used when the exponent is
/// below -4 or at least `sig`.
pub fn format_g(x: f64, sig: usize) -> String {
    if x.is_nan() {
        return "nan".to_string();
    } else if x.is_infinite() {
        return if x > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    } else if x == 0.0 {
        return "0".to_string();
    }

    let sig = sig.max(1);
    // Formatting in scientific notation first gives the exponent after rounding
    // to `sig` digits, which decides between the two notations.
    let sci = format!("{:.*e}", sig - 1, x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if exp < -4 || exp >= sig as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_trailing_zeros(mantissa), exp.abs())
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        trim_trailing_zeros(&format!("{x:.decimals$}")).to_string()
    }
}

fn trim_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Greedily wrap `text` at spaces so that no line exceeds `width` characters,
/// unless a single word is longer than that.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = vec![];
    for word in text.split(' ').filter(|w| !w.is_empty()) {
        match lines.last_mut() {
            Some(line) if line.chars().count() + 1 + word.chars().count() <= width => {
                line.push(' ');
                line.push_str(word);
            },
            _ => lines.push(word.to_string()),
        }
    }
    lines
}

/// Human readable name of a metric, falling back to the metric itself.
pub fn metric_name<'c>(metric: &'c str, config: &'c PlotConfig) -> &'c str {
    config.metrics.get(metric)
        .map(|s| s.name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(metric)
}

/// Axis or color bar label for `metric`: its name, then its description with the
/// unit of the `reference` dataset filled in.
///
/// If the description needs a unit but none is configured for `reference`, the
/// description is left out.
pub fn metric_label(metric: &str, reference: &str, config: &PlotConfig) -> String {
    let name = metric_name(metric, config);
    let description = match config.metrics.get(metric) {
        Some(style) if style.description.contains("{}") => {
            if let Some(unit) = config.units.get(reference) {
                style.description.replace("{}", unit)
            } else {
                debug!("No unit configured for dataset '{reference}', omitting it from the {metric} label");
                String::new()
            }
        },
        Some(style) => style.description.clone(),
        None => String::new(),
    };
    format!("{name}{description}")
}

/// Label of a single box: the dataset name and version, then optionally the
/// median, standard deviation and number of observations of `values`.
/// Lines are separated by `\n`. The version is parenthesized only when the
/// statistics follow it.
pub fn box_label(meta: &VariableMetadata, values: &[f64], print_stats: bool) -> String {
    let ds = &meta.dataset;
    if !print_stats {
        return format!("{}\n{}", ds.pretty_name, ds.version_pretty_name);
    }

    let median = stats::median(values).unwrap_or(f64::NAN);
    let std = stats::std_dev(values).unwrap_or(f64::NAN);
    format!(
        "{}\n({})\nmedian: {}\nstd. dev.: {}\nN obs.: {}",
        ds.pretty_name,
        ds.version_pretty_name,
        format_g(median, 3),
        format_g(std, 3),
        stats::count(values)
    )
}

/// Title for a boxplot of the variables in `varmeta`, which must all share a metric and reference.
///
/// Dataset names are appended to the current line as long as it stays within
/// `max_len` characters, and start a new line otherwise. Returns `None` if
/// `varmeta` is empty.
pub fn boxplot_title(varmeta: &IndexMap<String, VariableMetadata>, max_len: usize) -> Option<String> {
    let (_, first) = varmeta.first()?;
    let reference = &first.reference;

    if first.metric == N_OBS {
        return Some(format!(
            "Number of spatial and temporal matches between {} ({})",
            reference.pretty_name, reference.version_pretty_name
        ));
    }

    let mut lines = vec![];
    let mut current = format!("Comparing {} ({}) to ", reference.pretty_name, reference.version_pretty_name);
    for meta in varmeta.values() {
        let to_append = format!("{}, ", meta.dataset.pretty_name);
        if current.chars().count() + to_append.chars().count() <= max_len {
            current.push_str(&to_append);
        } else {
            lines.push(std::mem::replace(&mut current, to_append));
        }
    }
    lines.push(current);

    let mut title = lines.join("\n");
    // Drop the final ", " and turn the last remaining one into " and "
    title.truncate(title.len() - 2);
    if let Some((head, tail)) = title.rsplit_once(", ") {
        title = format!("{head} and {tail}");
    }
    Some(title)
}

/// Title for the map of a single variable, wrapped at the configured title length.
pub fn map_title(meta: &VariableMetadata, config: &PlotConfig) -> String {
    let name = metric_name(&meta.metric, config);
    let reference = &meta.reference;
    let dataset = &meta.dataset;
    let title = if meta.metric == N_OBS {
        format!("{name} for {} ({})", reference.pretty_name, reference.version_pretty_name)
    } else {
        format!(
            "{name} between {} ({}) and {} ({})",
            reference.pretty_name, reference.version_pretty_name,
            dataset.pretty_name, dataset.version_pretty_name
        )
    };
    wrap_words(&title, config.map.max_title_len).join("\n")
}

/// File name (without extension) of the boxplot for `metric`
pub fn boxplot_file_stem(metric: &str) -> String {
    format!("boxplot_{metric}")
}

/// File name (without extension) of the map of `varname`.
///
/// Variables with a dataset pair give `overview_<pair>_<metric>`, others (i.e. `n_obs`)
/// give `overview_<metric>`.
pub fn mapplot_file_stem(varname: &str, metric: &str) -> String {
    let pair_name = varname.parse::<VarName>()
        .ok()
        .and_then(|v| v.pair_name())
        .unwrap_or_else(|| varname.to_string());

    if pair_name == metric {
        format!("overview_{metric}")
    } else {
        format!("overview_{pair_name}_{metric}")
    }
}

/// Summarize which variables are about to be plotted, for logging.
pub(crate) fn describe_vars<S: AsRef<str>>(varnames: &[S]) -> String {
    varnames.iter().map(|v| v.as_ref()).join(", ")
}
