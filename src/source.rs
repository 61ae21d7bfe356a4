//! Data source abstraction for lazily sliced cube variables
//!
//! A `DataSource` hands out sub-blocks of named `t-dim1-dim2` variables. The
//! on-disk implementation reads only the requested index ranges, so slicing
//! cost scales with the requested sub-volume rather than the dataset size.

use crate::errors::{Result, SedicubeError};
use ndarray::Array3;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

/// Metadata for a cube variable
#[derive(Debug, Clone)]
pub struct VariableMetadata {
    pub name: String,
    pub shape: Vec<usize>,
    pub units: Option<String>,
    pub attributes: HashMap<String, JsonValue>,
}

/// Read-only access to named 3-D variables, by sub-block.
pub trait DataSource {
    /// List all variable names in the source, in a stable order.
    fn variable_names(&self) -> Vec<String>;

    /// Shape of a variable as `(time, dim1, dim2)`.
    fn shape(&self, name: &str) -> Result<(usize, usize, usize)>;

    /// Read a sub-block of a variable.
    ///
    /// Implementations must only materialize the requested ranges.
    fn read_block(
        &self,
        name: &str,
        time: Range<usize>,
        dim1: Range<usize>,
        dim2: Range<usize>,
    ) -> Result<Array3<f32>>;

    /// Metadata for a variable. Default builds it from the shape alone.
    fn metadata(&self, name: &str) -> Result<VariableMetadata> {
        let (nt, n1, n2) = self.shape(name)?;
        Ok(VariableMetadata {
            name: name.to_string(),
            shape: vec![nt, n1, n2],
            units: None,
            attributes: HashMap::new(),
        })
    }
}

fn check_ranges(
    name: &str,
    shape: (usize, usize, usize),
    time: &Range<usize>,
    dim1: &Range<usize>,
    dim2: &Range<usize>,
) -> Result<()> {
    let (nt, n1, n2) = shape;
    for (axis, r, len) in [("time", time, nt), ("dim1", dim1, n1), ("dim2", dim2, n2)] {
        if r.start >= r.end || r.end > len {
            return Err(SedicubeError::InvalidSlice {
                message: format!(
                    "range {}:{} on axis '{}' of '{}' (length {})",
                    r.start, r.end, axis, name, len
                ),
            });
        }
    }
    Ok(())
}

/// In-memory data source backed by owned arrays.
#[derive(Debug, Default)]
pub struct MemorySource {
    arrays: Vec<(String, Array3<f32>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self { arrays: Vec::new() }
    }

    /// Add a named variable. All variables must share one shape.
    pub fn insert(&mut self, name: &str, data: Array3<f32>) -> Result<()> {
        if let Some((_, first)) = self.arrays.first() {
            if first.dim() != data.dim() {
                return Err(SedicubeError::ShapeMismatch {
                    var: name.to_string(),
                    expected: vec![first.dim().0, first.dim().1, first.dim().2],
                    actual: vec![data.dim().0, data.dim().1, data.dim().2],
                });
            }
        }
        if self.arrays.iter().any(|(n, _)| n == name) {
            return Err(SedicubeError::Generic(format!(
                "Variable '{}' is already present in the source",
                name
            )));
        }
        self.arrays.push((name.to_string(), data));
        Ok(())
    }

    fn find(&self, name: &str) -> Result<&Array3<f32>> {
        self.arrays
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
            .ok_or_else(|| SedicubeError::VariableNotFound {
                var: name.to_string(),
            })
    }
}

impl DataSource for MemorySource {
    fn variable_names(&self) -> Vec<String> {
        self.arrays.iter().map(|(n, _)| n.clone()).collect()
    }

    fn shape(&self, name: &str) -> Result<(usize, usize, usize)> {
        Ok(self.find(name)?.dim())
    }

    fn read_block(
        &self,
        name: &str,
        time: Range<usize>,
        dim1: Range<usize>,
        dim2: Range<usize>,
    ) -> Result<Array3<f32>> {
        let arr = self.find(name)?;
        check_ranges(name, arr.dim(), &time, &dim1, &dim2)?;
        Ok(arr
            .slice(ndarray::s![time.clone(), dim1.clone(), dim2.clone()])
            .to_owned())
    }
}

/// On-disk data source backed by a read-only NetCDF file.
///
/// Only 3-D variables are exposed; coordinate vectors and scalars in the
/// file are skipped from `variable_names`.
pub struct NetCdfSource {
    file: netcdf::File,
}

impl NetCdfSource {
    /// Open a NetCDF file for deferred reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = netcdf::open(path)?;
        Ok(Self { file })
    }

    pub fn file(&self) -> &netcdf::File {
        &self.file
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| SedicubeError::VariableNotFound {
                var: name.to_string(),
            })
    }

    /// Read a 1-D coordinate variable in full, as f64.
    pub fn read_coordinate(&self, name: &str) -> Result<Vec<f64>> {
        let var = self.variable(name)?;
        if var.dimensions().len() != 1 {
            return Err(SedicubeError::InvalidSlice {
                message: format!("coordinate variable '{}' is not one-dimensional", name),
            });
        }
        Ok(var.get_values::<f64, _>(..)?)
    }
}

impl DataSource for NetCdfSource {
    fn variable_names(&self) -> Vec<String> {
        self.file
            .variables()
            .filter(|v| v.dimensions().len() == 3)
            .map(|v| v.name().to_string())
            .collect()
    }

    fn shape(&self, name: &str) -> Result<(usize, usize, usize)> {
        let var = self.variable(name)?;
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        match dims.as_slice() {
            [nt, n1, n2] => Ok((*nt, *n1, *n2)),
            other => Err(SedicubeError::ShapeMismatch {
                var: name.to_string(),
                expected: vec![0, 0, 0],
                actual: other.to_vec(),
            }),
        }
    }

    fn read_block(
        &self,
        name: &str,
        time: Range<usize>,
        dim1: Range<usize>,
        dim2: Range<usize>,
    ) -> Result<Array3<f32>> {
        let shape = self.shape(name)?;
        check_ranges(name, shape, &time, &dim1, &dim2)?;
        let var = self.variable(name)?;

        // Ranged read: only the requested sub-block comes off disk.
        let values: Vec<f32> =
            var.get_values::<f32, _>((time.clone(), dim1.clone(), dim2.clone()))?;
        let block_shape = (time.len(), dim1.len(), dim2.len());
        Ok(Array3::from_shape_vec(block_shape, values)?)
    }

    fn metadata(&self, name: &str) -> Result<VariableMetadata> {
        let (nt, n1, n2) = self.shape(name)?;
        let var = self.variable(name)?;

        let mut attributes = HashMap::new();
        let mut units = None;
        for attr in var.attributes() {
            let value = match attr.value() {
                Ok(netcdf::AttributeValue::Str(s)) => {
                    if attr.name() == "units" {
                        units = Some(s.clone());
                    }
                    JsonValue::String(s)
                }
                Ok(netcdf::AttributeValue::Float(v)) => JsonValue::from(v),
                Ok(netcdf::AttributeValue::Double(v)) => JsonValue::from(v),
                Ok(netcdf::AttributeValue::Int(v)) => JsonValue::from(v),
                Ok(netcdf::AttributeValue::Short(v)) => JsonValue::from(v),
                _ => continue,
            };
            attributes.insert(attr.name().to_string(), value);
        }

        Ok(VariableMetadata {
            name: name.to_string(),
            shape: vec![nt, n1, n2],
            units,
            attributes,
        })
    }
}
