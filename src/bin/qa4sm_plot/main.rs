use std::{path::Path, process::ExitCode};

use clap::Parser;
use error_stack::ResultExt;
use qa4sm_reader::{
    config::PlotConfig,
    dataset::ValidationDataset,
    logging::init_logging,
    meta::{BatchPolicy, MetaResolver, VariableMetadata},
    nc_dataset::NcDataset,
    plan::PlotOptions,
    render::{self, PlotAllOptions, SaveOptions},
    select::{default_variables, get_metrics},
};
use tabled::{settings::Style, Table, Tabled};

mod cli;

use cli::{BoxplotCli, Cli, Commands, MapplotCli, MetaCli, MetricsCli, PlotAllCli, PlotCli};

fn main() -> ExitCode {
    let clargs = Cli::parse();
    init_logging(clargs.verbosity.log_level_filter());

    match driver(clargs) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qa4sm_plot did not complete successfully:\n{e:?}");
            ExitCode::FAILURE
        }
    }
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let config = PlotConfig::load(clargs.config.as_deref())
        .change_context(CliError::ReadingConfig)?;

    match clargs.command {
        Commands::Metrics(args) => print_metrics(args, &config),
        Commands::Meta(args) => print_meta(args, &config),
        Commands::Boxplot(args) => make_boxplot(args, &config),
        Commands::Mapplot(args) => make_mapplot(args, &config),
        Commands::PlotAll(args) => make_all(args, &config),
        Commands::Config => {
            let s = config.to_toml_string().change_context(CliError::ReadingConfig)?;
            println!("{s}");
            Ok(())
        },
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("An error occurred while reading the configuration")]
    ReadingConfig,
    #[error("An error occurred while opening the validation file")]
    OpeningFile,
    #[error("An error occurred while decoding the variable names")]
    DecodingNames,
    #[error("An error occurred while making the plots")]
    Plotting,
    #[error("An error occurred while writing the output")]
    WritingOutput,
}

fn open_dataset(path: &Path) -> error_stack::Result<NcDataset, CliError> {
    NcDataset::open(path)
        .change_context(CliError::OpeningFile)
        .attach_printable_lazy(|| format!("File was {}", path.display()))
}

fn print_metrics(args: MetricsCli, config: &PlotConfig) -> error_stack::Result<(), CliError> {
    let ds = open_dataset(&args.nc_file)?;
    for metric in get_metrics(&ds, config) {
        println!("{metric}");
    }
    Ok(())
}

#[derive(Tabled)]
struct MetaRow {
    variable: String,
    metric: String,
    reference: String,
    #[tabled(rename = "ref. version")]
    ref_version: String,
    dataset: String,
    #[tabled(rename = "version")]
    ds_version: String,
}

impl MetaRow {
    fn new(varname: &str, meta: &VariableMetadata) -> Self {
        Self {
            variable: varname.to_string(),
            metric: meta.metric.clone(),
            reference: format!("{}-{}", meta.reference.number, meta.reference.pretty_name),
            ref_version: meta.reference.version_pretty_name.clone(),
            dataset: format!("{}-{}", meta.dataset.number, meta.dataset.pretty_name),
            ds_version: meta.dataset.version_pretty_name.clone(),
        }
    }
}

fn print_meta(args: MetaCli, config: &PlotConfig) -> error_stack::Result<(), CliError> {
    let ds = open_dataset(&args.nc_file)?;
    let variables = if args.variables.is_empty() {
        default_variables(&ds.variable_names(), &config.index.all())
    } else {
        args.variables
    };
    let policy = if args.strict { BatchPolicy::FailFast } else { BatchPolicy::SkipAndWarn };

    let varmeta = MetaResolver::new(&config.names)
        .resolve_all(&ds.global_attributes(), &variables, policy)
        .change_context(CliError::DecodingNames)?;

    if args.json {
        let s = serde_json::to_string_pretty(&varmeta)
            .change_context(CliError::WritingOutput)?;
        println!("{s}");
    } else {
        let rows = varmeta.iter().map(|(varname, meta)| MetaRow::new(varname, meta));
        let mut table = Table::new(rows);
        table.with(Style::blank());
        println!("{table}");
    }
    Ok(())
}

fn plot_options(args: &PlotCli) -> PlotOptions {
    PlotOptions {
        title: args.title.clone(),
        label: args.label.clone(),
        add_title: !args.no_title,
        ..Default::default()
    }
}

fn save_options(args: &PlotCli, nc_file: &Path) -> error_stack::Result<SaveOptions, CliError> {
    let out_dir = match &args.out_dir {
        Some(d) => d.clone(),
        None => render::default_out_dir(nc_file).change_context(CliError::WritingOutput)?,
    };
    Ok(SaveOptions {
        out_dir,
        out_name: args.out_name.clone(),
        formats: args.out_type.clone(),
        scale: args.scale,
    })
}

fn make_boxplot(args: BoxplotCli, config: &PlotConfig) -> error_stack::Result<(), CliError> {
    let ds = open_dataset(&args.nc_file)?;
    let mut opts = plot_options(&args.plot);
    if args.no_stats {
        opts.print_stats = Some(false);
    }
    let save = save_options(&args.plot, &args.nc_file)?;

    render::boxplot(&ds, &args.metric, args.plot.extent.as_ref(), &opts, &save, config)
        .change_context(CliError::Plotting)
        .attach_printable_lazy(|| format!("Metric was {}", args.metric))?;
    Ok(())
}

fn make_mapplot(args: MapplotCli, config: &PlotConfig) -> error_stack::Result<(), CliError> {
    let ds = open_dataset(&args.nc_file)?;
    let opts = plot_options(&args.plot);
    let save = save_options(&args.plot, &args.nc_file)?;

    render::mapplot(&ds, &args.variable, args.plot.extent.as_ref(), &opts, &save, config)
        .change_context(CliError::Plotting)
        .attach_printable_lazy(|| format!("Variable was {}", args.variable))?;
    Ok(())
}

fn make_all(args: PlotAllCli, config: &PlotConfig) -> error_stack::Result<(), CliError> {
    let ds = open_dataset(&args.nc_file)?;
    if args.plot.out_name.is_some() {
        log::warn!("--out-name is ignored when plotting everything");
    }

    let opts = PlotAllOptions {
        metrics: if args.metrics.is_empty() { None } else { Some(args.metrics.clone()) },
        extent: args.plot.extent,
        boxplot: plot_options(&args.plot),
        mapplot: plot_options(&args.plot),
        show_progress: !args.no_progress,
    };
    let save = save_options(&args.plot, &args.nc_file)?;

    let written = render::plot_all(&ds, &opts, &save, config)
        .change_context(CliError::Plotting)?;
    log::info!("Wrote {} files to {}", written.len(), save.out_dir.display());
    Ok(())
}
