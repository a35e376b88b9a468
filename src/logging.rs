use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    Config,
};

/// Crates whose messages are capped at `Warn` no matter the requested verbosity.
static NOISY_DEPENDENCIES: &'static [&'static str] = &["plotly", "netcdf"];

/// Send log messages at `level` and above to stderr, leaving stdout for tables.
pub fn init_logging(level: LevelFilter) {
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{h({d(%Y-%m-%d %H:%M:%S)} [{l}] in {M})} - {m}{n}",
        )))
        .target(Target::Stderr)
        .build();

    let dep_level = level.min(LevelFilter::Warn);
    let loggers = NOISY_DEPENDENCIES
        .iter()
        .map(|&name| Logger::builder().build(name, dep_level));

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .loggers(loggers)
        .build(Root::builder().appender("stderr").build(level))
        .expect("Failed to configure logger");

    log4rs::init_config(config).expect("Failed to initialize logger");
}
