//! Entry point for the sedicube application.
//! Handles CLI parsing, cube loading, and dispatches operations like building
//! stratigraphic volumes or printing metadata.

use clap::Parser;
use sedicube::cli::Args;
use sedicube::cube_io::{open_cube, write_volume_to_netcdf};
use sedicube::metadata::{compute_variable_summary, describe_variable, print_cube_summary, print_variable_summary};
use sedicube::parallel::{get_parallel_info, ParallelConfig};
use sedicube::strat::StratigraphyCube;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Configure the thread pool before any parallel work
    if let Some(threads) = args.threads {
        ParallelConfig::with_threads(threads).setup_global_pool()?;
    }
    if args.verbose {
        get_parallel_info().print_info();
    }

    // Open the cube
    let cube = open_cube(&args.file)?;
    println!("Successfully opened cube: {}", args.file.display());

    if args.list_vars {
        print_cube_summary(&cube)?;
    }

    if let Some(var) = &args.describe {
        describe_variable(&cube, var)?;
    }

    if let Some(var) = &args.summary {
        let summary = compute_variable_summary(&cube, var)?;
        print_variable_summary(&summary);
    }

    if let Some(elevation_var) = &args.strat {
        println!(
            "Building stratigraphic volume from '{}' with dz = {}",
            elevation_var, args.dz
        );
        let volume = StratigraphyCube::from_data_cube(&cube, elevation_var, args.dz)?;
        let (nz, n1, n2) = volume.shape();
        println!("✅ Volume ready: {} × {} × {} bins", nz, n1, n2);

        if let Some(output_path) = &args.output_netcdf {
            write_volume_to_netcdf(&volume, output_path)?;
            println!("✅ Saved volume to {}", output_path.display());
        }
    }

    Ok(())
}
