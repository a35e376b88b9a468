//! Command line interface definitions
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use qa4sm_reader::{frame::Extent, plan::OutputFormat};

#[derive(Debug, Parser)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Commands,

    /// TOML file overriding parts of the built-in configuration.
    /// Run the `config` subcommand to see what can be set.
    #[clap(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Commands {
    /// List the metrics available in a validation file
    Metrics(MetricsCli),
    /// Print the dataset metadata decoded from variable names
    Meta(MetaCli),
    /// Make a boxplot comparing all datasets for one metric
    Boxplot(BoxplotCli),
    /// Make a map of one variable
    Mapplot(MapplotCli),
    /// Make boxplots of every metric and maps of every variable
    PlotAll(PlotAllCli),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct MetricsCli {
    /// The validation netCDF file
    pub(crate) nc_file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct MetaCli {
    /// The validation netCDF file
    pub(crate) nc_file: PathBuf,

    /// Variables to decode. If none are given, all variables except the
    /// coordinates and index variables are used.
    pub(crate) variables: Vec<String>,

    /// Print JSON instead of a table
    #[clap(long)]
    pub(crate) json: bool,

    /// Fail on the first variable whose name cannot be decoded, rather than
    /// skipping it with a warning.
    #[clap(long)]
    pub(crate) strict: bool,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct BoxplotCli {
    /// The validation netCDF file
    pub(crate) nc_file: PathBuf,

    /// The metric to plot, e.g. "R" or "ubRMSD"
    pub(crate) metric: String,

    #[clap(flatten)]
    pub(crate) plot: PlotCli,

    /// Do not print median, standard deviation and number of observations under the boxes
    #[clap(long)]
    pub(crate) no_stats: bool,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct MapplotCli {
    /// The validation netCDF file
    pub(crate) nc_file: PathBuf,

    /// The variable to plot, e.g. "R_between_1-ISMN_2-C3S"
    pub(crate) variable: String,

    #[clap(flatten)]
    pub(crate) plot: PlotCli,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PlotAllCli {
    /// The validation netCDF file
    pub(crate) nc_file: PathBuf,

    /// Metric to plot; may be repeated. If not given, all metrics in the file are plotted.
    #[clap(short = 'm', long = "metric")]
    pub(crate) metrics: Vec<String>,

    #[clap(flatten)]
    pub(crate) plot: PlotCli,

    /// Do not show a progress bar
    #[clap(long)]
    pub(crate) no_progress: bool,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PlotCli {
    /// Only plot data within this region, given as lon_min,lon_max,lat_min,lat_max
    #[clap(long, allow_hyphen_values = true)]
    pub(crate) extent: Option<Extent>,

    /// Directory to write the figures to. Defaults to a directory named
    /// like the input file in the current directory.
    #[clap(short = 'o', long)]
    pub(crate) out_dir: Option<PathBuf>,

    /// File name (without extension) to use instead of the generated one.
    /// Ignored by plot-all.
    #[clap(long)]
    pub(crate) out_name: Option<String>,

    /// Image formats to write, comma separated
    #[clap(short = 't', long, value_delimiter = ',', default_value = "png")]
    pub(crate) out_type: Vec<OutputFormat>,

    /// Title to use instead of the generated one
    #[clap(long, conflicts_with = "no_title")]
    pub(crate) title: Option<String>,

    /// Leave the title off
    #[clap(long)]
    pub(crate) no_title: bool,

    /// Axis or color bar label to use instead of the generated one
    #[clap(long)]
    pub(crate) label: Option<String>,

    /// Resolution multiplier for the written images
    #[clap(long, default_value_t = 1.0)]
    pub(crate) scale: f64,
}
