//! Everything that goes into a figure, worked out before any drawing happens.
//!
//! A [`BoxplotPlan`] or [`MapPlan`] holds the data, labels, value ranges and output
//! file name for one figure. Building them needs only the dataset and the
//! [`PlotConfig`]; turning them into images is the job of [`crate::render`].
use indexmap::IndexMap;
use log::{debug, warn};

use crate::{
    config::{ColormapClass, PlotConfig},
    dataset::ValidationDataset,
    error::{DataError, ReaderError},
    frame::{load_data, Extent, MetricFrame},
    grid::{grid_interval, plot_extent, to_grid, Grid2D},
    labels,
    meta::{BatchPolicy, MetaResolver, VariableMetadata},
    select::get_var,
    stats::value_range,
};

/// Image formats that figures can be saved as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    Png,
    #[strum(to_string = "jpeg", serialize = "jpg")]
    Jpeg,
    Webp,
    Svg,
    Pdf,
    Eps,
}

/// Settings a caller may override for a single figure.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Title to use instead of the generated one
    pub title: Option<String>,
    /// Y axis (boxplot) or color bar (map) label to use instead of the generated one
    pub label: Option<String>,
    pub add_title: bool,
    /// Print statistics under the boxes; uses the configured default if `None`
    pub print_stats: Option<bool>,
    /// Map region to show instead of the one computed from the data
    pub plot_extent: Option<Extent>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self { title: None, label: None, add_title: true, print_stats: None, plot_extent: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSeries {
    pub varname: String,
    /// Text under the box; lines separated by `\n`
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxplotPlan {
    pub metric: String,
    pub title: Option<String>,
    pub y_label: String,
    pub y_range: Option<(f64, f64)>,
    pub boxes: Vec<BoxSeries>,
    pub width: usize,
    pub height: usize,
    pub file_stem: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapData {
    /// Individual locations, drawn as markers
    Points { lat: Vec<f64>, lon: Vec<f64>, values: Vec<f64> },
    /// Values on a regular grid, drawn as an image
    Grid(Grid2D),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPlan {
    pub varname: String,
    pub metric: String,
    pub title: Option<String>,
    pub colorbar_label: String,
    pub colormap: ColormapClass,
    pub value_range: Option<(f64, f64)>,
    pub extent: Extent,
    /// Spacing of grid lines in degrees
    pub grid_interval: f64,
    pub data: MapData,
    pub marker_size: usize,
    pub width: usize,
    pub height: usize,
    pub file_stem: String,
}

/// Find the variables for `metric` in `ds` and load them with their metadata.
///
/// Any variable name that cannot be decoded is an error here: the caller asked
/// for this metric specifically.
pub fn load_metric<D: ValidationDataset + ?Sized>(
    ds: &D,
    metric: &str,
    extent: Option<&Extent>,
    config: &PlotConfig,
) -> Result<(MetricFrame, IndexMap<String, VariableMetadata>), ReaderError> {
    let variables = get_var(&ds.variable_names(), metric);
    if variables.is_empty() {
        return Err(DataError::NoVariablesForMetric(metric.to_string()).into());
    }
    debug!("Loading {} for metric {metric}", labels::describe_vars(&variables));

    let (frame, varmeta) = load_variables(ds, &variables, extent, config)?;
    Ok((frame, varmeta))
}

/// Load the given variables with their metadata.
pub fn load_variables<D: ValidationDataset + ?Sized, S: AsRef<str>>(
    ds: &D,
    variables: &[S],
    extent: Option<&Extent>,
    config: &PlotConfig,
) -> Result<(MetricFrame, IndexMap<String, VariableMetadata>), ReaderError> {
    let attrs = ds.global_attributes();
    let varmeta = MetaResolver::new(&config.names)
        .resolve_all(&attrs, variables, BatchPolicy::FailFast)?;
    let frame = load_data(ds, variables, extent, &config.index)?;
    Ok((frame, varmeta))
}

/// Plan a boxplot with one box per variable in `varmeta`.
///
/// The variables must share their metric and reference dataset; the first one's
/// metadata is used for the title and axis label.
pub fn plan_boxplot(
    frame: &MetricFrame,
    varmeta: &IndexMap<String, VariableMetadata>,
    config: &PlotConfig,
    opts: &PlotOptions,
) -> Result<BoxplotPlan, DataError> {
    let (_, first) = varmeta.first()
        .ok_or_else(|| DataError::NoVariablesForMetric(String::new()))?;
    let metric = first.metric.clone();
    let print_stats = opts.print_stats.unwrap_or(config.boxplot.print_stats);

    let mut boxes = Vec::with_capacity(varmeta.len());
    for (varname, meta) in varmeta.iter() {
        let values = frame.column(varname)
            .ok_or_else(|| DataError::missing(&[varname], &[varname.as_str()]))?
            .to_vec();
        boxes.push(BoxSeries {
            varname: varname.clone(),
            label: labels::box_label(meta, &values, print_stats),
            values,
        });
    }

    let title = if opts.add_title {
        opts.title.clone()
            .or_else(|| labels::boxplot_title(varmeta, config.boxplot.title_len_per_box * boxes.len()))
    } else {
        None
    };

    let y_label = opts.label.clone()
        .unwrap_or_else(|| labels::metric_label(&metric, &first.reference.short_name, config));
    let y_range = value_range(boxes.iter().map(|b| b.values.as_slice()), &metric, config);

    Ok(BoxplotPlan {
        file_stem: labels::boxplot_file_stem(&metric),
        metric,
        title,
        y_label,
        y_range,
        width: config.boxplot.width_per_box * (1 + boxes.len()),
        height: config.boxplot.height,
        boxes,
    })
}

/// Plan a map of a single variable.
///
/// Comparisons involving one of the configured scattered datasets are drawn as
/// markers at each location; everything else is put back on its grid, or drawn as
/// markers if the locations turn out not to form a regular grid.
pub fn plan_mapplot(
    frame: &MetricFrame,
    varname: &str,
    meta: &VariableMetadata,
    config: &PlotConfig,
    opts: &PlotOptions,
) -> Result<MapPlan, DataError> {
    let column = frame.column(varname)
        .ok_or_else(|| DataError::missing(&[varname], &[varname]))?;

    // The frame may hold other variables too, so only keep the locations where this one is valid
    let (mut lat, mut lon, mut values) = (vec![], vec![], vec![]);
    for ((&y, &x), &v) in frame.lat.iter().zip(frame.lon.iter()).zip(column.iter()) {
        if !v.is_nan() {
            lat.push(y);
            lon.push(x);
            values.push(v);
        }
    }

    let scattered = config.is_scattered(&meta.reference.short_name, &meta.dataset.short_name);
    let extent = opts.plot_extent
        .or_else(|| plot_extent(&lat, &lon, !scattered, config.map.pad))
        .ok_or_else(|| DataError::NoValidData(varname.to_string()))?;

    let value_range = value_range([values.as_slice()], &meta.metric, config);

    let data = if scattered {
        MapData::Points { lat, lon, values }
    } else if let Some(grid) = to_grid(&lat, &lon, &values) {
        MapData::Grid(grid)
    } else {
        warn!("Could not put '{varname}' on a regular grid, plotting individual points instead");
        MapData::Points { lat, lon, values }
    };

    let title = if opts.add_title {
        Some(opts.title.clone().unwrap_or_else(|| labels::map_title(meta, config)))
    } else {
        None
    };

    let colormap = config.metrics.get(&meta.metric)
        .map(|s| s.colormap)
        .unwrap_or(ColormapClass::SeqWorse);

    Ok(MapPlan {
        varname: varname.to_string(),
        metric: meta.metric.clone(),
        title,
        colorbar_label: opts.label.clone()
            .unwrap_or_else(|| labels::metric_label(&meta.metric, &meta.reference.short_name, config)),
        colormap,
        value_range,
        grid_interval: grid_interval(&extent, &config.map.grid_intervals),
        extent,
        data,
        marker_size: config.map.marker_size,
        width: config.map.width,
        height: config.map.height,
        file_stem: labels::mapplot_file_stem(varname, &meta.metric),
    })
}
