//! Cube inspection and variable description functionality
//!
//! This module provides functions for examining a cube's structure, listing
//! variables and coordinates, and summarizing variable values.

use crate::cube::DataCube;
use crate::errors::Result;

/// Quick statistics for a variable, NaN samples excluded
#[derive(Debug, Clone)]
pub struct VariableSummary {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std_dev: f32,
    pub valid_count: usize,
    pub total_count: usize,
}

/// Lists the cube's coordinates and variables in a clean, organized format.
pub fn print_cube_summary(cube: &DataCube) -> Result<()> {
    let (nt, n1, n2) = cube.shape();

    println!("\n Coordinates");
    println!("===============");
    println!("    time = {}", nt);
    println!("    dim1 = {}", n1);
    println!("    dim2 = {}", n2);
    println!("    cell spacing = {}", cube.coords().dx());

    println!("\n Variables");
    println!("=============");
    let mut names: Vec<&String> = cube.variables().iter().collect();
    names.sort();
    for name in names {
        let meta = cube.metadata(name)?;
        match meta.units {
            Some(units) => println!(
                "    {} ({} × {} × {}) [{}]",
                name, nt, n1, n2, units
            ),
            None => println!("    {} ({} × {} × {})", name, nt, n1, n2),
        }
    }

    match cube.preservation() {
        Some(p) => {
            let (_, mask1, mask2) = p.mask().dim();
            println!(
                "\n Stratigraphy: computed ({} × {} preserved-voxel columns)",
                mask1, mask2
            );
        }
        None => println!("\n Stratigraphy: not computed"),
    }

    Ok(())
}

/// Describes a specific variable showing its shape, units, and attributes.
pub fn describe_variable(cube: &DataCube, var_name: &str) -> Result<()> {
    let meta = cube.metadata(var_name)?;

    println!("\n Variable Description: {}", var_name);
    println!("={}", "=".repeat(var_name.len() + 25));

    println!(" Dimensions: [time, dim1, dim2]");
    println!(
        " Shape: ({})",
        meta.shape
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" × ")
    );
    if let Some(units) = &meta.units {
        println!(" Units: {}", units);
    }

    if meta.attributes.is_empty() {
        println!("\n  Attributes: (none)");
    } else {
        println!("\n  Attributes:");
        let mut keys: Vec<&String> = meta.attributes.keys().collect();
        keys.sort();
        for key in keys {
            println!("   • {}: {}", key, meta.attributes[key]);
        }
    }

    let total_elements: usize = meta.shape.iter().product();
    let total_bytes = total_elements * std::mem::size_of::<f32>();
    println!("\n Storage Information:");
    println!("    Total elements: {}", total_elements);
    if total_bytes < 1024 * 1024 {
        println!("    Total size: {:.2} KB", total_bytes as f64 / 1024.0);
    } else {
        println!(
            "    Total size: {:.2} MB",
            total_bytes as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(())
}

/// Computes quick statistics (min/mean/max/std) on a variable.
///
/// Loads the variable in full; NaN samples are excluded from every
/// statistic.
pub fn compute_variable_summary(cube: &DataCube, var_name: &str) -> Result<VariableSummary> {
    let data = cube.load(var_name)?;
    let total_count = data.len();

    let valid: Vec<f32> = data.iter().cloned().filter(|v| v.is_finite()).collect();
    let valid_count = valid.len();

    let min = valid.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = valid.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mean = valid.iter().sum::<f32>() / valid_count.max(1) as f32;
    let std_dev = (valid.iter().map(|&x| (x - mean).powi(2)).sum::<f32>()
        / valid_count.max(1) as f32)
        .sqrt();

    Ok(VariableSummary {
        name: var_name.to_string(),
        min,
        max,
        mean,
        std_dev,
        valid_count,
        total_count,
    })
}

/// Display a variable summary in the standard report format.
pub fn print_variable_summary(summary: &VariableSummary) {
    println!("\n Summary for Variable: {}", summary.name);
    println!("================================");
    println!("   Min: {}", summary.min);
    println!("   Max: {}", summary.max);
    println!("   Mean: {:.4}", summary.mean);
    println!("   Std Dev: {:.4}", summary.std_dev);
    println!(
        "   Valid samples: {} / {}",
        summary.valid_count, summary.total_count
    );
}
