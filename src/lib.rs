pub mod config;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod grid;
pub mod labels;
pub mod logging;
pub mod meta;
pub mod plan;
pub mod select;
pub mod stats;

#[cfg(feature = "netcdf")]
pub mod nc_dataset;
#[cfg(feature = "plotting")]
pub mod render;
