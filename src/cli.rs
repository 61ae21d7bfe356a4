//! Defines command-line interface options using `clap` for the sedicube application.

use clap::Parser;
use std::path::PathBuf;

/// A CLI tool for inspecting sedimentary data cubes
#[derive(Parser, Debug)]
#[command(
    version,
    name = "sedicube",
    about = "App for working with NetCDF sedimentary data cubes"
)]
pub struct Args {
    /// Path to the NetCDF file
    #[arg(short, long)]
    pub file: PathBuf,

    /// List all variables and coordinates in the cube
    #[arg(long)]
    pub list_vars: bool,

    /// Describe a specific variable (shape, units, and attributes)
    #[arg(long)]
    pub describe: Option<String>,

    /// Compute quick statistics (min/mean/max/std) for a variable
    #[arg(long)]
    pub summary: Option<String>,

    /// Build a stratigraphic volume from the named elevation variable
    #[arg(long)]
    pub strat: Option<String>,

    /// Vertical bin size for the stratigraphic volume
    #[arg(long, default_value_t = 0.05)]
    pub dz: f64,

    /// Path to save the stratigraphic volume as NetCDF
    #[arg(long)]
    pub output_netcdf: Option<PathBuf>,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
