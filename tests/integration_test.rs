use ndarray::Array3;
use netcdf::{create, open};
use sedicube::cube_io::{open_cube, write_volume_to_netcdf};
use sedicube::errors::SedicubeError;
use sedicube::metadata::compute_variable_summary;
use sedicube::section::{PathSpec, Section};
use sedicube::source::{DataSource, NetCdfSource};
use sedicube::strat::StratigraphyCube;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Write a small delta-like dataset: eta aggrades by 0.1 per step with a
/// spatial gradient, velocity grows with time.
fn write_demo_dataset(path: &Path) {
    let (nt, n1, n2) = (4usize, 3usize, 5usize);
    let eta = Array3::from_shape_fn((nt, n1, n2), |(t, i, j)| {
        t as f32 * 0.1 + (i + j) as f32 * 0.01
    });
    let velocity = Array3::from_shape_fn((nt, n1, n2), |(t, i, j)| (t + i + j) as f32);

    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", nt).expect("Failed to add dimension time");
    file.add_dimension("x", n1).expect("Failed to add dimension x");
    file.add_dimension("y", n2).expect("Failed to add dimension y");

    let time: Vec<f64> = (0..nt).map(|t| t as f64 * 10.0).collect();
    let x: Vec<f64> = (0..n1).map(|i| i as f64 * 50.0).collect();
    let y: Vec<f64> = (0..n2).map(|j| j as f64 * 50.0).collect();

    let mut time_var = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time variable");
    time_var.put_values(&time, ..).expect("Failed to write time");
    let mut x_var = file
        .add_variable::<f64>("x", &["x"])
        .expect("Failed to add x variable");
    x_var.put_values(&x, ..).expect("Failed to write x");
    let mut y_var = file
        .add_variable::<f64>("y", &["y"])
        .expect("Failed to add y variable");
    y_var.put_values(&y, ..).expect("Failed to write y");

    let mut eta_var = file
        .add_variable::<f32>("eta", &["time", "x", "y"])
        .expect("Failed to add eta variable");
    eta_var
        .put_attribute("units", "meters")
        .expect("Failed to add units");
    eta_var.put(eta.view(), ..).expect("Failed to write eta");

    let mut vel_var = file
        .add_variable::<f32>("velocity", &["time", "x", "y"])
        .expect("Failed to add velocity variable");
    vel_var
        .put(velocity.view(), ..)
        .expect("Failed to write velocity");
}

#[test]
fn test_open_cube_reads_coordinates() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("demo.nc");
    write_demo_dataset(&file_path);

    let cube = open_cube(&file_path).expect("Failed to open cube");
    assert_eq!(cube.shape(), (4, 3, 5));

    let mut names = cube.variables().to_vec();
    names.sort();
    assert_eq!(names, vec!["eta".to_string(), "velocity".to_string()]);

    // physical coordinates come from the file
    assert_eq!(cube.coords().time(), &[0.0, 10.0, 20.0, 30.0]);
    assert_eq!(cube.coords().dx(), 50.0);

    // attributes survive the metadata path
    let meta = cube.metadata("eta").expect("Failed to read metadata");
    assert_eq!(meta.units.as_deref(), Some("meters"));
}

#[test]
fn test_netcdf_source_reads_only_requested_block() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("demo.nc");
    write_demo_dataset(&file_path);

    let source = NetCdfSource::open(&file_path).expect("Failed to open source");
    let block = source
        .read_block("eta", 1..3, 0..2, 2..4)
        .expect("Failed to read block");
    assert_eq!(block.dim(), (2, 2, 2));
    // block[[0,0,0]] is eta at (t=1, i=0, j=2)
    assert!((block[[0, 0, 0]] - (0.1 + 0.02)).abs() < 1e-6);
    assert!((block[[1, 1, 1]] - (0.2 + 0.04)).abs() < 1e-6);

    // out-of-range requests are rejected, not clamped
    let result = source.read_block("eta", 0..5, 0..1, 0..1);
    assert!(matches!(result, Err(SedicubeError::InvalidSlice { .. })));
}

#[test]
fn test_missing_variable_names_offender() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("demo.nc");
    write_demo_dataset(&file_path);

    let cube = open_cube(&file_path).expect("Failed to open cube");
    match cube.load("discharge") {
        Err(SedicubeError::VariableNotFound { var }) => assert_eq!(var, "discharge"),
        other => panic!("expected variable error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_end_to_end_stratigraphy_workflow() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("demo.nc");
    write_demo_dataset(&file_path);

    let cube = Arc::new(open_cube(&file_path).expect("Failed to open cube"));

    // a section cut before stratigraphy exists
    let section = Section::new(cube.clone(), PathSpec::Strike { dim1: 0.0 })
        .expect("Failed to build section");
    assert!(matches!(
        section.preserved("eta"),
        Err(SedicubeError::StratigraphyNotComputed)
    ));

    cube.compute_preservation("eta")
        .expect("Failed to compute preservation");

    // monotone aggradation: every sample preserved along the section
    let preserved = section.preserved("eta").expect("Failed to read section");
    assert_eq!(preserved.dim(), (4, 5));
    assert!(preserved.iter().all(|v| v.is_finite()));

    // materialize and export the volume
    let volume =
        StratigraphyCube::from_data_cube(&cube, "eta", 0.05).expect("Failed to build volume");
    let out_path = temp_dir.path().join("volume.nc");
    write_volume_to_netcdf(&volume, &out_path).expect("Failed to write volume");

    // reopen and check the exported structure
    let file = open(&out_path).expect("Failed to reopen volume");
    let (nz, n1, n2) = volume.shape();
    assert_eq!(file.dimension("z").expect("z dimension").len(), nz);
    assert_eq!(file.dimension("dim1").expect("dim1 dimension").len(), n1);
    assert_eq!(file.dimension("dim2").expect("dim2 dimension").len(), n2);

    let idx_var = file.variable("time_index").expect("time_index variable");
    let indices: Vec<i32> = idx_var
        .get_values::<i32, _>(..)
        .expect("Failed to read time_index");
    // empty bins carry the fill value, filled bins a valid time step
    assert!(indices.iter().any(|&v| v == -1));
    assert!(indices.iter().all(|&v| (-1..4).contains(&v)));

    let eta_var = file.variable("eta").expect("eta variable");
    let exported: Vec<f32> = eta_var
        .get_values::<f32, _>(..)
        .expect("Failed to read exported eta");
    assert_eq!(exported.len(), nz * n1 * n2);
}

#[test]
fn test_variable_summary_over_netcdf() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("demo.nc");
    write_demo_dataset(&file_path);

    let cube = open_cube(&file_path).expect("Failed to open cube");
    let summary = compute_variable_summary(&cube, "velocity").expect("Failed to summarize");
    assert_eq!(summary.min, 0.0);
    assert_eq!(summary.max, 9.0);
    assert_eq!(summary.valid_count, summary.total_count);
}
