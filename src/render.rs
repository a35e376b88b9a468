//! Drawing of [`BoxplotPlan`]s and [`MapPlan`]s with `plotly`, and the batch
//! [`plot_all`] that makes every figure for a validation file.
//!
//! Saving images requires the `kaleido` executable that the `plotly/kaleido`
//! feature downloads at build time.
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use plotly::{
    common::{Anchor, ColorBar, ColorScale, ColorScalePalette, Font, Marker, Mode, Title},
    layout::{Annotation, Axis},
    BoxPlot, HeatMap, ImageFormat, Layout, Plot, Scatter,
};

use crate::{
    config::{ColormapClass, PlotConfig, WatermarkPosition},
    dataset::ValidationDataset,
    error::{DataError, ReaderError},
    frame::Extent,
    plan::{self, BoxplotPlan, MapData, MapPlan, OutputFormat, PlotOptions},
    select::get_metrics,
};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Could not create output directory {}: {source}", .path.display())]
    OutputDir{path: PathBuf, source: std::io::Error},
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl From<DataError> for RenderError {
    fn from(value: DataError) -> Self {
        Self::Reader(value.into())
    }
}

/// Where and how figures are saved.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub out_dir: PathBuf,
    /// File name (without extension) to use instead of the generated one
    pub out_name: Option<String>,
    /// One file is written per format
    pub formats: Vec<OutputFormat>,
    /// Resolution multiplier passed to the image export
    pub scale: f64,
}

impl SaveOptions {
    pub fn new(out_dir: PathBuf, formats: Vec<OutputFormat>) -> Self {
        Self { out_dir, out_name: None, formats, scale: 1.0 }
    }
}

/// The directory figures of `input_file` go into when none is given:
/// a directory named like the file in the current working directory.
pub fn default_out_dir(input_file: &Path) -> std::io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let name = input_file.file_name().unwrap_or(input_file.as_os_str());
    Ok(cwd.join(name))
}

impl From<OutputFormat> for ImageFormat {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Png => ImageFormat::PNG,
            OutputFormat::Jpeg => ImageFormat::JPEG,
            OutputFormat::Webp => ImageFormat::WEBP,
            OutputFormat::Svg => ImageFormat::SVG,
            OutputFormat::Pdf => ImageFormat::PDF,
            OutputFormat::Eps => ImageFormat::EPS,
        }
    }
}

fn palette(colormap: ColormapClass) -> ColorScale {
    let palette = match colormap {
        ColormapClass::DivBetter => ColorScalePalette::RdBu,
        ColormapClass::DivNeutral => ColorScalePalette::Picnic,
        ColormapClass::SeqWorse => ColorScalePalette::YlOrRd,
        ColormapClass::SeqBetter => ColorScalePalette::YlGnBu,
    };
    ColorScale::Palette(palette)
}

/// Plotly text uses HTML line breaks
fn html_lines(s: &str) -> String {
    s.replace('\n', "<br>")
}

fn with_watermark(layout: Layout, config: &PlotConfig) -> Layout {
    let wm = &config.watermark;
    let (y, anchor) = match wm.position {
        WatermarkPosition::Top => (1.0, Anchor::Bottom),
        WatermarkPosition::Bottom => (-0.15, Anchor::Top),
        WatermarkPosition::None => return layout,
    };

    let annotation = Annotation::new()
        .text(&wm.text)
        .x_ref("paper")
        .y_ref("paper")
        .x(0.5)
        .y(y)
        .y_anchor(anchor)
        .show_arrow(false)
        .font(Font::new().size(wm.font_size).color("grey"));
    layout.annotations(vec![annotation])
}

pub fn render_boxplot(plan: &BoxplotPlan, config: &PlotConfig) -> Plot {
    let mut plot = Plot::new();
    for b in plan.boxes.iter() {
        let trace = BoxPlot::<f64, f64>::new(b.values.clone())
            .name(&html_lines(&b.label));
        plot.add_trace(trace);
    }

    let mut y_axis = Axis::new().title(Title::new(&plan.y_label));
    if let Some((lo, hi)) = plan.y_range {
        y_axis = y_axis.range(vec![lo, hi]);
    }

    let mut layout = Layout::new()
        .show_legend(false)
        .y_axis(y_axis);
    if let Some(title) = &plan.title {
        layout = layout.title(Title::new(&html_lines(title)));
    }
    plot.set_layout(with_watermark(layout, config));
    plot
}

pub fn render_mapplot(plan: &MapPlan, config: &PlotConfig) -> Plot {
    let mut plot = Plot::new();
    let colorbar = ColorBar::new().title(Title::new(&html_lines(&plan.colorbar_label)));

    match &plan.data {
        MapData::Points { lat, lon, values } => {
            let mut marker = Marker::new()
                .size(plan.marker_size)
                .color_array(values.clone())
                .color_scale(palette(plan.colormap))
                .show_scale(true)
                .color_bar(colorbar);
            if let Some((lo, hi)) = plan.value_range {
                marker = marker.cmin(lo).cmax(hi);
            }
            let trace = Scatter::new(lon.clone(), lat.clone())
                .mode(Mode::Markers)
                .marker(marker)
                .name(&plan.varname);
            plot.add_trace(trace);
        },
        MapData::Grid(grid) => {
            // Rows go through serde_json so that missing cells serialize as null
            // and the color limits can share the row type.
            let z: Vec<serde_json::Value> = grid.z.iter().map(|row| serde_json::json!(row)).collect();
            let mut trace = HeatMap::new(grid.lon.clone(), grid.lat.clone(), z)
                .color_scale(palette(plan.colormap))
                .color_bar(colorbar)
                .name(&plan.varname);
            if let Some((lo, hi)) = plan.value_range {
                trace = trace.zmin(serde_json::json!(lo)).zmax(serde_json::json!(hi));
            }
            plot.add_trace(trace);
        },
    }

    let e = &plan.extent;
    let mut layout = Layout::new()
        .show_legend(false)
        .x_axis(Axis::new()
            .title(Title::new("Longitude (°)"))
            .range(vec![e.lon_min, e.lon_max])
            .dtick(plan.grid_interval)
            .show_grid(true))
        .y_axis(Axis::new()
            .title(Title::new("Latitude (°)"))
            .range(vec![e.lat_min, e.lat_max])
            .dtick(plan.grid_interval)
            .show_grid(true));
    if let Some(title) = &plan.title {
        layout = layout.title(Title::new(&html_lines(title)));
    }
    plot.set_layout(with_watermark(layout, config));
    plot
}

/// Write `plot` once per requested format into `save.out_dir`, returning the paths written.
pub fn save_plot(plot: &Plot, file_stem: &str, width: usize, height: usize, save: &SaveOptions)
-> Result<Vec<PathBuf>, RenderError> {
    std::fs::create_dir_all(&save.out_dir)
        .map_err(|e| RenderError::OutputDir { path: save.out_dir.clone(), source: e })?;

    let stem = save.out_name.as_deref().unwrap_or(file_stem);
    let mut written = vec![];
    for &fmt in save.formats.iter() {
        let path = save.out_dir.join(format!("{stem}.{fmt}"));
        plot.write_image(&path, fmt.into(), width, height, save.scale);
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Make and save the boxplot of all variables for `metric`.
pub fn boxplot<D: ValidationDataset + ?Sized>(
    ds: &D,
    metric: &str,
    extent: Option<&Extent>,
    opts: &PlotOptions,
    save: &SaveOptions,
    config: &PlotConfig,
) -> Result<Vec<PathBuf>, RenderError> {
    let (frame, varmeta) = plan::load_metric(ds, metric, extent, config)?;
    let plan = plan::plan_boxplot(&frame, &varmeta, config, opts)?;
    let plot = render_boxplot(&plan, config);
    save_plot(&plot, &plan.file_stem, plan.width, plan.height, save)
}

/// Make and save the map of a single variable.
pub fn mapplot<D: ValidationDataset + ?Sized>(
    ds: &D,
    varname: &str,
    extent: Option<&Extent>,
    opts: &PlotOptions,
    save: &SaveOptions,
    config: &PlotConfig,
) -> Result<Vec<PathBuf>, RenderError> {
    let (frame, varmeta) = plan::load_variables(ds, &[varname], extent, config)?;
    let meta = varmeta.get(varname)
        .ok_or_else(|| DataError::missing(&[varname], &[varname]))?;
    let plan = plan::plan_mapplot(&frame, varname, meta, config, opts)?;
    let plot = render_mapplot(&plan, config);
    save_plot(&plot, &plan.file_stem, plan.width, plan.height, save)
}

/// Settings for [`plot_all`]
#[derive(Debug, Clone)]
pub struct PlotAllOptions {
    /// Metrics to plot; all metrics in the file if `None`
    pub metrics: Option<Vec<String>>,
    pub extent: Option<Extent>,
    pub boxplot: PlotOptions,
    pub mapplot: PlotOptions,
    pub show_progress: bool,
}

impl Default for PlotAllOptions {
    fn default() -> Self {
        Self {
            metrics: None,
            extent: None,
            boxplot: PlotOptions::default(),
            mapplot: PlotOptions::default(),
            show_progress: true,
        }
    }
}

/// Make a boxplot for every metric and a map for every variable.
///
/// Figures for each metric go into a subdirectory of `out_dir` named after the
/// metric. `save.out_name` is ignored, since every figure needs its own name.
/// Maps of variables left without valid values by the extent are skipped.
pub fn plot_all<D: ValidationDataset + ?Sized>(
    ds: &D,
    opts: &PlotAllOptions,
    save: &SaveOptions,
    config: &PlotConfig,
) -> Result<Vec<PathBuf>, RenderError> {
    let metrics = match &opts.metrics {
        Some(m) => m.clone(),
        None => get_metrics(ds, config),
    };

    let pb = if opts.show_progress {
        ProgressBar::new(metrics.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let style = ProgressStyle::with_template(
        "{prefix} {msg} {wide_bar} [{human_pos}/{human_len}]"
    ).unwrap();
    pb.set_style(style);
    pb.set_prefix("Plotting metric");

    let mut written = vec![];
    for metric in metrics.iter() {
        pb.set_message(metric.clone());
        let metric_save = SaveOptions {
            out_dir: save.out_dir.join(metric),
            out_name: None,
            formats: save.formats.clone(),
            scale: save.scale,
        };

        let (frame, varmeta) = plan::load_metric(ds, metric, opts.extent.as_ref(), config)?;

        let box_plan = plan::plan_boxplot(&frame, &varmeta, config, &opts.boxplot)?;
        let plot = render_boxplot(&box_plan, config);
        written.extend(save_plot(&plot, &box_plan.file_stem, box_plan.width, box_plan.height, &metric_save)?);

        for (varname, meta) in varmeta.iter() {
            let map_plan = match plan::plan_mapplot(&frame, varname, meta, config, &opts.mapplot) {
                Ok(p) => p,
                Err(DataError::NoValidData(_)) => {
                    warn!("No valid data for '{varname}', skipping its map");
                    continue;
                },
                Err(e) => return Err(e.into()),
            };
            let plot = render_mapplot(&map_plan, config);
            written.extend(save_plot(&plot, &map_plan.file_stem, map_plan.width, map_plan.height, &metric_save)?);
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::MemDataset, plan::{load_metric, plan_boxplot, plan_mapplot}};

    fn dataset() -> MemDataset {
        MemDataset::new()
            .with_attr("val_dc_pretty_name0", "ISMN")
            .with_var("lat", vec![40.0, 41.0, 42.0])
            .with_var("lon", vec![-100.0, -99.0, -98.0])
            .with_var("R_between_1-ISMN_2-C3S", vec![0.5, 0.6, 0.7])
            .with_var("R_between_1-ISMN_3-SMAP", vec![0.4, 0.3, 0.2])
    }

    #[test]
    fn test_render_boxplot_traces() {
        let config = PlotConfig::default();
        let ds = dataset();
        let (frame, varmeta) = load_metric(&ds, "R", None, &config).unwrap();
        let plan = plan_boxplot(&frame, &varmeta, &config, &PlotOptions::default()).unwrap();
        let json = render_boxplot(&plan, &config).to_json();

        assert!(json.contains("\"type\":\"box\""));
        assert!(json.contains("SMAP level 3<br>(unknown version)"));
        assert!(json.contains(&config.watermark.text));
    }

    #[test]
    fn test_render_mapplot_points() {
        let mut config = PlotConfig::default();
        config.watermark.position = WatermarkPosition::None;
        let ds = dataset();
        let (frame, varmeta) = load_metric(&ds, "R", None, &config).unwrap();
        let varname = "R_between_1-ISMN_2-C3S";
        let plan = plan_mapplot(&frame, varname, &varmeta[varname], &config, &PlotOptions::default()).unwrap();
        let json = render_mapplot(&plan, &config).to_json();

        assert!(json.contains("\"mode\":\"markers\""));
        assert!(json.contains("\"cmin\":-1.0"));
        assert!(!json.contains(&config.watermark.text));
    }

    #[test]
    fn test_default_out_dir() {
        let dir = default_out_dir(Path::new("/data/validation/0-ISMN.nc")).unwrap();
        assert!(dir.ends_with("0-ISMN.nc"));
        assert_eq!(dir.parent(), std::env::current_dir().ok().as_deref());
    }
}
