//! Data cubes: named 3-D variables sharing common coordinate axes
//!
//! A `DataCube` binds one or more `t-dim1-dim2` variables from a
//! `DataSource` to a shared coordinate system. Variables stay on their
//! source until sliced, so a NetCDF-backed cube only reads the sub-blocks a
//! caller asks for. The cube also carries the (write-once) preservation
//! state computed by the stratigraphy engine.

use crate::errors::{Result, SedicubeError};
use crate::source::{DataSource, MemorySource, VariableMetadata};
use crate::strat::{Preservation, StratOptions, StratigraphyView};
use ndarray::{Array2, Array3};
use std::ops::Range;
use std::sync::OnceLock;

/// Shared coordinate axes for a cube.
///
/// Time is non-decreasing; the spatial axes are strictly monotonic. Spatial
/// cell spacing is assumed uniform within each axis.
#[derive(Debug, Clone)]
pub struct CubeCoordinates {
    time: Vec<f64>,
    dim1: Vec<f64>,
    dim2: Vec<f64>,
}

impl CubeCoordinates {
    pub fn new(time: Vec<f64>, dim1: Vec<f64>, dim2: Vec<f64>) -> Result<Self> {
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(SedicubeError::InvalidParameter {
                param: "time".to_string(),
                message: "time coordinates must be non-decreasing".to_string(),
            });
        }
        for (name, axis) in [("dim1", &dim1), ("dim2", &dim2)] {
            let increasing = axis.windows(2).all(|w| w[1] > w[0]);
            let decreasing = axis.windows(2).all(|w| w[1] < w[0]);
            if !(increasing || decreasing) {
                return Err(SedicubeError::InvalidParameter {
                    param: name.to_string(),
                    message: "spatial coordinates must be strictly monotonic".to_string(),
                });
            }
        }
        Ok(Self { time, dim1, dim2 })
    }

    /// Index-valued coordinates for a given shape.
    pub fn from_shape(nt: usize, n1: usize, n2: usize) -> Self {
        Self {
            time: (0..nt).map(|i| i as f64).collect(),
            dim1: (0..n1).map(|i| i as f64).collect(),
            dim2: (0..n2).map(|i| i as f64).collect(),
        }
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn dim1(&self) -> &[f64] {
        &self.dim1
    }

    pub fn dim2(&self) -> &[f64] {
        &self.dim2
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.time.len(), self.dim1.len(), self.dim2.len())
    }

    /// Spatial cell edge length, from the dim1 axis. Unit spacing if the
    /// axis is degenerate.
    pub fn dx(&self) -> f64 {
        if self.dim1.len() > 1 {
            (self.dim1[1] - self.dim1[0]).abs()
        } else {
            1.0
        }
    }

    /// Nearest grid index along dim1 for a physical coordinate.
    pub fn nearest_dim1(&self, coord: f64) -> usize {
        nearest_index(&self.dim1, coord)
    }

    /// Nearest grid index along dim2 for a physical coordinate.
    pub fn nearest_dim2(&self, coord: f64) -> usize {
        nearest_index(&self.dim2, coord)
    }
}

fn nearest_index(axis: &[f64], coord: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &v) in axis.iter().enumerate() {
        let d = (v - coord).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// A named, lazily loaded cube of co-registered 3-D variables.
pub struct DataCube {
    source: Box<dyn DataSource>,
    variables: Vec<String>,
    coords: CubeCoordinates,
    shape: (usize, usize, usize),
    preservation: OnceLock<Preservation>,
}

impl DataCube {
    /// Bind a data source to a coordinate system.
    ///
    /// Fails if the source is empty, or if any variable's shape differs
    /// from the coordinate axis lengths.
    pub fn new(source: Box<dyn DataSource>, coords: CubeCoordinates) -> Result<Self> {
        let variables = source.variable_names();
        if variables.is_empty() {
            return Err(SedicubeError::Generic(
                "Data source contains no 3-D variables".to_string(),
            ));
        }
        let shape = coords.shape();
        for name in &variables {
            let var_shape = source.shape(name)?;
            if var_shape != shape {
                return Err(SedicubeError::ShapeMismatch {
                    var: name.clone(),
                    expected: vec![shape.0, shape.1, shape.2],
                    actual: vec![var_shape.0, var_shape.1, var_shape.2],
                });
            }
        }
        Ok(Self {
            source,
            variables,
            coords,
            shape,
            preservation: OnceLock::new(),
        })
    }

    /// Build an in-memory cube from named arrays with index coordinates.
    pub fn from_arrays(arrays: Vec<(&str, Array3<f32>)>) -> Result<Self> {
        let mut source = MemorySource::new();
        let mut shape = None;
        for (name, data) in arrays {
            shape.get_or_insert(data.dim());
            source.insert(name, data)?;
        }
        let (nt, n1, n2) = shape.ok_or_else(|| {
            SedicubeError::Generic("Cannot build a cube from no variables".to_string())
        })?;
        Self::new(
            Box::new(source),
            CubeCoordinates::from_shape(nt, n1, n2),
        )
    }

    /// Ordered variable names.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub fn coords(&self) -> &CubeCoordinates {
        &self.coords
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    /// Handle to a named variable; fails with the offending name if absent.
    pub fn get(&self, name: &str) -> Result<CubeVariable<'_>> {
        if !self.contains(name) {
            return Err(SedicubeError::VariableNotFound {
                var: name.to_string(),
            });
        }
        Ok(CubeVariable {
            cube: self,
            name: name.to_string(),
        })
    }

    /// Read a sub-block of a variable; only the requested ranges are
    /// materialized from the source.
    pub fn slice(
        &self,
        name: &str,
        time: Range<usize>,
        dim1: Range<usize>,
        dim2: Range<usize>,
    ) -> Result<Array3<f32>> {
        if !self.contains(name) {
            return Err(SedicubeError::VariableNotFound {
                var: name.to_string(),
            });
        }
        self.source.read_block(name, time, dim1, dim2)
    }

    /// Load a variable in full. Explicit; nothing else reads whole arrays.
    pub fn load(&self, name: &str) -> Result<Array3<f32>> {
        let (nt, n1, n2) = self.shape;
        self.slice(name, 0..nt, 0..n1, 0..n2)
    }

    /// Read a single horizontal slab `(dim1, dim2)` at a time index.
    pub fn slab(&self, name: &str, time_idx: usize) -> Result<Array2<f32>> {
        let (nt, n1, n2) = self.shape;
        if time_idx >= nt {
            return Err(SedicubeError::InvalidSlice {
                message: format!("time index {} out of range (length {})", time_idx, nt),
            });
        }
        let block = self.slice(name, time_idx..time_idx + 1, 0..n1, 0..n2)?;
        Ok(block.index_axis_move(ndarray::Axis(0), 0))
    }

    /// Variable metadata from the underlying source.
    pub fn metadata(&self, name: &str) -> Result<VariableMetadata> {
        if !self.contains(name) {
            return Err(SedicubeError::VariableNotFound {
                var: name.to_string(),
            });
        }
        self.source.metadata(name)
    }

    /// Compute and store preservation state from an elevation variable.
    ///
    /// The state is write-once: the first successful computation wins and
    /// later calls return the stored state without recomputing, even when
    /// they name a different elevation variable. A cube holds one
    /// preservation state; use a separate cube to compare elevation
    /// variables. Sections created against this cube before the call
    /// observe the state on their next preserved-view query.
    pub fn compute_preservation(&self, elevation_var: &str) -> Result<&Preservation> {
        self.compute_preservation_with(elevation_var, &StratOptions::default())
    }

    /// As `compute_preservation`, with cancellation/progress/subsidence options.
    pub fn compute_preservation_with(
        &self,
        elevation_var: &str,
        options: &StratOptions,
    ) -> Result<&Preservation> {
        if let Some(existing) = self.preservation.get() {
            return Ok(existing);
        }
        let eta = self.load(elevation_var)?;
        let computed = Preservation::compute_with(&eta, options)?;
        // A concurrent caller may have won the race; either value is
        // identical because the cube is immutable.
        Ok(self.preservation.get_or_init(|| computed))
    }

    /// The preservation state, if computed.
    pub fn preservation(&self) -> Option<&Preservation> {
        self.preservation.get()
    }
}

impl StratigraphyView for DataCube {
    fn is_preserved(&self, t: usize, i: usize, j: usize) -> bool {
        self.preservation
            .get()
            .map(|p| p.is_preserved(t, i, j))
            .unwrap_or(false)
    }
}

/// Borrowed handle to one variable of a cube.
pub struct CubeVariable<'a> {
    cube: &'a DataCube,
    name: String,
}

impl<'a> CubeVariable<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.cube.shape()
    }

    pub fn slice(
        &self,
        time: Range<usize>,
        dim1: Range<usize>,
        dim2: Range<usize>,
    ) -> Result<Array3<f32>> {
        self.cube.slice(&self.name, time, dim1, dim2)
    }

    pub fn load(&self) -> Result<Array3<f32>> {
        self.cube.load(&self.name)
    }

    pub fn slab(&self, time_idx: usize) -> Result<Array2<f32>> {
        self.cube.slab(&self.name, time_idx)
    }
}
