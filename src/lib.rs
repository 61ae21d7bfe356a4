//! sedicube: sedimentary data cube processing and analysis
//!
//! A Rust library for analyzing time series of gridded surface observations
//! from depositional systems (laboratory experiments, numerical models, and
//! field surveys). sedicube turns a `time × dim1 × dim2` stack of bed
//! elevations into stratigraphic interpretations: which moments in time are
//! preserved in the final deposit, what the deposit looks like on a fixed
//! vertical grid, and how channels reworked the surface along the way.
//!
//! ## Key Features
//!
//! - **Lazy Slicing**: NetCDF-backed cubes read only the sub-blocks a
//!   caller asks for
//! - **Stratigraphy Engine**: Parallel preservation scans and materialized
//!   elevation-indexed volumes, with optional subsidence adjustment
//! - **Sections**: Strike, dip, path, radial, and circular sections through
//!   cubes and volumes
//! - **Planform Analysis**: Masks, shoreline metrics, channel geometry, and
//!   surface deposit timing
//! - **Mobility Statistics**: Channel decay, planform overlap, and
//!   abandonment over mask stacks
//!
//! ## Module Organization
//!
//! The library is organized into logical modules:
//!
//! - [`source`]: Data source abstraction (in-memory and NetCDF-backed)
//! - [`cube`]: Data cubes and coordinates
//! - [`strat`]: Preservation state and stratigraphic volumes
//! - [`section`]: Section and planform extraction
//! - [`mask`]: Binary mask generators
//! - [`plan`]: Planform metrics
//! - [`mobility`]: Channel mobility statistics
//! - [`cube_io`]: NetCDF cube I/O
//! - [`metadata`]: Cube inspection and variable description
//! - [`parallel`]: Parallel processing configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sedicube::prelude::*;
//!
//! // Open a NetCDF dataset as a lazily sliced cube
//! let cube = sedicube::cube_io::open_cube("data.nc").unwrap();
//!
//! // Compute which time steps are preserved in the final deposit
//! cube.compute_preservation("eta").unwrap();
//!
//! // Materialize the deposit on a fixed vertical grid
//! let volume = StratigraphyCube::from_data_cube(&cube, "eta", 0.05).unwrap();
//! println!("volume shape: {:?}", volume.shape());
//! ```
//!
//! The library is designed to handle large multi-dimensional datasets
//! efficiently and provides clear error reporting for debugging and
//! analysis.

// Core modules
pub mod cube;
pub mod cube_io;
pub mod errors;
pub mod mask;
pub mod metadata;
pub mod mobility;
pub mod parallel;
pub mod plan;
pub mod section;
pub mod source;
pub mod strat;

// Internal modules
pub mod cli;

// Direct re-exports for the public API
pub use cube::*;
pub use errors::*;
pub use section::*;
pub use source::*;
pub use strat::*;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::cube::{CubeCoordinates, CubeVariable, DataCube};
    pub use crate::cube_io::{open_cube, write_volume_to_netcdf, StratVolumeWriter};
    pub use crate::errors::{Result, SedicubeError};
    pub use crate::parallel::ParallelConfig;
    pub use crate::section::{PathSpec, Planform, Section, StratSection};
    pub use crate::source::{DataSource, MemorySource, NetCdfSource};
    pub use crate::strat::{
        Preservation, StratOptions, StratigraphyCube, StratigraphyView, Subsidence,
    };
}
