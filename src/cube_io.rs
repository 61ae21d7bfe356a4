//! NetCDF cube I/O
//!
//! This module provides functions for opening NetCDF datasets as lazily
//! sliced data cubes and writing materialized stratigraphic volumes to new
//! NetCDF files with proper metadata.

use crate::cube::{CubeCoordinates, DataCube};
use crate::errors::Result;
use crate::source::{DataSource, NetCdfSource};
use crate::strat::StratigraphyCube;
use chrono::Utc;
use ndarray::Array3;
use netcdf::create;
use std::{fs, path::Path};

/// Candidate coordinate variable names, tried in order per axis.
const TIME_NAMES: &[&str] = &["time", "t"];
const DIM1_NAMES: &[&str] = &["x", "dim1", "lat", "latitude"];
const DIM2_NAMES: &[&str] = &["y", "dim2", "lon", "longitude"];

/// Open a NetCDF file as a lazily sliced data cube.
///
/// Every 3-D variable in the file becomes a cube variable. Coordinate axes
/// are read from conventionally named 1-D variables (`time`, `x`, `y` and
/// common alternatives); axes without a coordinate variable fall back to
/// index coordinates.
pub fn open_cube<P: AsRef<Path>>(path: P) -> Result<DataCube> {
    let source = NetCdfSource::open(path)?;

    let names = source.variable_names();
    let shape = names
        .first()
        .map(|name| source.shape(name))
        .transpose()?
        .unwrap_or((0, 0, 0));
    let (nt, n1, n2) = shape;

    let read_axis = |candidates: &[&str], len: usize| -> Vec<f64> {
        for name in candidates {
            if let Ok(values) = source.read_coordinate(name) {
                if values.len() == len {
                    return values;
                }
            }
        }
        (0..len).map(|i| i as f64).collect()
    };

    let coords = CubeCoordinates::new(
        read_axis(TIME_NAMES, nt),
        read_axis(DIM1_NAMES, n1),
        read_axis(DIM2_NAMES, n2),
    )?;

    DataCube::new(Box::new(source), coords)
}

/// Fill value written for bins with no deposit.
const TIME_INDEX_FILL: i32 = -1;

/// Writer for materialized stratigraphic volumes
pub struct StratVolumeWriter<'a> {
    output_path: &'a Path,
}

impl<'a> StratVolumeWriter<'a> {
    /// Create a new volume writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write a stratigraphic volume to a NetCDF file.
    ///
    /// The file carries the `z`, `dim1`, `dim2` coordinate variables, one
    /// f32 variable per volume variable (NaN where no deposit), and the
    /// recorded source time step as an i32 `time_index` variable with -1
    /// where no deposit.
    pub fn write_volume(&self, volume: &StratigraphyCube) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;
        let (nz, n1, n2) = volume.shape();

        // Define dimensions and coordinate variables
        file.add_dimension("z", nz)?;
        file.add_dimension("dim1", n1)?;
        file.add_dimension("dim2", n2)?;

        let mut z_var = file.add_variable::<f64>("z", &["z"])?;
        z_var.put_values(volume.z(), ..)?;
        z_var.put_attribute("long_name", "elevation bin lower edge")?;

        let mut d1_var = file.add_variable::<f64>("dim1", &["dim1"])?;
        d1_var.put_values(volume.dim1(), ..)?;

        let mut d2_var = file.add_variable::<f64>("dim2", &["dim2"])?;
        d2_var.put_values(volume.dim2(), ..)?;

        // One variable per carried cube variable
        for name in volume.variables() {
            let data = volume.get(&name)?;
            let mut var = file.add_variable::<f32>(&name, &["z", "dim1", "dim2"])?;
            var.put_attribute("_FillValue", f32::NAN)?;
            var.put(data.view().into_dyn(), ..)?;
        }

        // Recorded source time steps; -1 marks empty bins
        let indices: Array3<i32> = volume
            .time_index()
            .mapv(|slot| slot.map(|t| t as i32).unwrap_or(TIME_INDEX_FILL));
        let mut idx_var = file.add_variable::<i32>("time_index", &["z", "dim1", "dim2"])?;
        idx_var.put_attribute("_FillValue", TIME_INDEX_FILL)?;
        idx_var.put_attribute("long_name", "source time step of the deposit in each bin")?;
        idx_var.put(indices.view().into_dyn(), ..)?;

        // Global attributes
        file.add_attribute("dz", volume.dz())?;
        file.add_attribute("elevation_variable", volume.elevation_var().to_string())?;
        file.add_attribute(
            "history",
            format!("Created by sedicube on {}", Utc::now().to_rfc3339()),
        )?;

        Ok(())
    }
}

/// Writes a stratigraphic volume to a new NetCDF file.
pub fn write_volume_to_netcdf(volume: &StratigraphyCube, output_path: &Path) -> Result<()> {
    let writer = StratVolumeWriter::new(output_path);
    writer.write_volume(volume)
}
