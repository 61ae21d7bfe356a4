//! Section and planform extraction
//!
//! Declarative path specifications are resolved to ordered integer index
//! traces into a cube's grid, then values are gathered lazily per request.
//! A `Section` keeps a non-owning reference to its source cube and re-reads
//! the cube's preservation state at query time, so sections built before
//! stratigraphy was computed observe it afterward.

use crate::cube::{CubeCoordinates, DataCube};
use crate::errors::{Result, SedicubeError};
use crate::strat::{StratigraphyCube, StratigraphyView};
use ndarray::Array2;
use std::sync::Arc;

/// Declarative specification of a 1-D path across the spatial grid, in
/// physical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSpec {
    /// Fixed dim1 coordinate, varying over all of dim2.
    Strike { dim1: f64 },
    /// Fixed dim2 coordinate, varying over all of dim1.
    Dip { dim2: f64 },
    /// Explicit ordered list of `(dim1, dim2)` coordinate pairs.
    Path { points: Vec<(f64, f64)> },
    /// From an origin outward along a fixed azimuth (radians from the
    /// +dim1 axis toward +dim2) until the domain edge.
    Radial { origin: (f64, f64), azimuth: f64 },
    /// Fixed radius around an origin, varying angle.
    Circular { origin: (f64, f64), radius: f64 },
}

/// Resolve a path specification to an ordered integer index trace.
///
/// Nearest-neighbor snapping to the grid; consecutive duplicate cells are
/// collapsed. Resolution is a pure function of the specification and the
/// axes, so resolving the same spec twice yields identical traces.
pub fn resolve_path(spec: &PathSpec, coords: &CubeCoordinates) -> Result<Vec<(usize, usize)>> {
    resolve_on_axes(spec, coords.dim1(), coords.dim2())
}

pub(crate) fn resolve_on_axes(
    spec: &PathSpec,
    dim1: &[f64],
    dim2: &[f64],
) -> Result<Vec<(usize, usize)>> {
    let snap = |axis: &[f64], coord: f64| -> usize {
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
    };
    let in_domain = |p: (f64, f64)| -> bool {
        let (lo1, hi1) = axis_bounds(dim1);
        let (lo2, hi2) = axis_bounds(dim2);
        p.0 >= lo1 && p.0 <= hi1 && p.1 >= lo2 && p.1 <= hi2
    };
    let step = if dim1.len() > 1 {
        (dim1[1] - dim1[0]).abs() / 2.0
    } else {
        0.5
    };

    let mut trace: Vec<(usize, usize)> = Vec::new();
    let mut push = |cell: (usize, usize), trace: &mut Vec<(usize, usize)>| {
        if trace.last() != Some(&cell) {
            trace.push(cell);
        }
    };

    match spec {
        PathSpec::Strike { dim1: c } => {
            let i = snap(dim1, *c);
            for j in 0..dim2.len() {
                trace.push((i, j));
            }
        }
        PathSpec::Dip { dim2: c } => {
            let j = snap(dim2, *c);
            for i in 0..dim1.len() {
                trace.push((i, j));
            }
        }
        PathSpec::Path { points } => {
            for &(c1, c2) in points {
                push((snap(dim1, c1), snap(dim2, c2)), &mut trace);
            }
        }
        PathSpec::Radial { origin, azimuth } => {
            let (dir1, dir2) = (azimuth.cos(), azimuth.sin());
            let mut r = 0.0;
            loop {
                let p = (origin.0 + dir1 * r, origin.1 + dir2 * r);
                if !in_domain(p) {
                    break;
                }
                push((snap(dim1, p.0), snap(dim2, p.1)), &mut trace);
                r += step;
            }
        }
        PathSpec::Circular { origin, radius } => {
            if !(*radius > 0.0) {
                return Err(SedicubeError::InvalidParameter {
                    param: "radius".to_string(),
                    message: format!("circular path radius must be positive, got {}", radius),
                });
            }
            let circumference = std::f64::consts::TAU * radius;
            let samples = ((circumference / step).ceil() as usize).max(8);
            for n in 0..samples {
                let theta = std::f64::consts::TAU * n as f64 / samples as f64;
                let p = (
                    origin.0 + radius * theta.cos(),
                    origin.1 + radius * theta.sin(),
                );
                if in_domain(p) {
                    push((snap(dim1, p.0), snap(dim2, p.1)), &mut trace);
                }
            }
        }
    }

    if trace.is_empty() {
        return Err(SedicubeError::EmptyPath);
    }
    Ok(trace)
}

fn axis_bounds(axis: &[f64]) -> (f64, f64) {
    let first = *axis.first().unwrap_or(&0.0);
    let last = *axis.last().unwrap_or(&0.0);
    (first.min(last), first.max(last))
}

fn distance_along(trace: &[(usize, usize)], dim1: &[f64], dim2: &[f64]) -> Vec<f64> {
    let mut distance = Vec::with_capacity(trace.len());
    let mut total = 0.0;
    for (k, &(i, j)) in trace.iter().enumerate() {
        if k > 0 {
            let (pi, pj) = trace[k - 1];
            total += ((dim1[i] - dim1[pi]).powi(2) + (dim2[j] - dim2[pj]).powi(2)).sqrt();
        }
        distance.push(total);
    }
    distance
}

/// A 2-D (time × along-path) view into a live data cube.
pub struct Section {
    cube: Arc<DataCube>,
    spec: PathSpec,
    trace: Vec<(usize, usize)>,
    distance: Vec<f64>,
}

impl Section {
    pub fn new(cube: Arc<DataCube>, spec: PathSpec) -> Result<Self> {
        let trace = resolve_path(&spec, cube.coords())?;
        let distance = distance_along(&trace, cube.coords().dim1(), cube.coords().dim2());
        Ok(Self {
            cube,
            spec,
            trace,
            distance,
        })
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    /// Resolved index trace into the source grid.
    pub fn trace(&self) -> &[(usize, usize)] {
        &self.trace
    }

    /// Along-path physical distance of each trace cell.
    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Gather the spacetime view of a variable: `(time, along-path)`.
    ///
    /// One column of the source is read per trace cell; the full variable
    /// is never loaded.
    pub fn spacetime(&self, var: &str) -> Result<Array2<f32>> {
        let (nt, _, _) = self.cube.shape();
        let mut out = Array2::from_elem((nt, self.trace.len()), f32::NAN);
        for (p, &(i, j)) in self.trace.iter().enumerate() {
            let column = self.cube.slice(var, 0..nt, i..i + 1, j..j + 1)?;
            for t in 0..nt {
                out[[t, p]] = column[[t, 0, 0]];
            }
        }
        Ok(out)
    }

    /// Gather the preserved view of a variable: spacetime values with
    /// unpreserved samples masked to NaN.
    ///
    /// Reads the cube's preservation state at query time; fails with the
    /// recoverable `StratigraphyNotComputed` condition if none has been
    /// computed yet.
    pub fn preserved(&self, var: &str) -> Result<Array2<f32>> {
        let preservation = self
            .cube
            .preservation()
            .ok_or(SedicubeError::StratigraphyNotComputed)?;
        let mut values = self.spacetime(var)?;
        for (p, &(i, j)) in self.trace.iter().enumerate() {
            for t in 0..values.dim().0 {
                if !preservation.is_preserved(t, i, j) {
                    values[[t, p]] = f32::NAN;
                }
            }
        }
        Ok(values)
    }
}

/// A 2-D (elevation × along-path) view into a materialized
/// `StratigraphyCube`.
pub struct StratSection {
    volume: Arc<StratigraphyCube>,
    trace: Vec<(usize, usize)>,
    distance: Vec<f64>,
}

impl StratSection {
    pub fn new(volume: Arc<StratigraphyCube>, spec: PathSpec) -> Result<Self> {
        let trace = resolve_on_axes(&spec, volume.dim1(), volume.dim2())?;
        let distance = distance_along(&trace, volume.dim1(), volume.dim2());
        Ok(Self {
            volume,
            trace,
            distance,
        })
    }

    pub fn trace(&self) -> &[(usize, usize)] {
        &self.trace
    }

    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Elevation-indexed values of a variable along the path: `(z, along-path)`.
    pub fn values(&self, var: &str) -> Result<Array2<f32>> {
        let volume = self.volume.get(var)?;
        let nz = self.volume.z().len();
        let mut out = Array2::from_elem((nz, self.trace.len()), f32::NAN);
        for (p, &(i, j)) in self.trace.iter().enumerate() {
            for k in 0..nz {
                out[[k, p]] = volume[[k, i, j]];
            }
        }
        Ok(out)
    }

    /// Source time step recorded at each `(z, along-path)` cell.
    pub fn time_index(&self) -> Array2<Option<usize>> {
        let nz = self.volume.z().len();
        let mut out = Array2::from_elem((nz, self.trace.len()), None);
        for (p, &(i, j)) in self.trace.iter().enumerate() {
            for k in 0..nz {
                out[[k, p]] = self.volume.time_index_at(k, i, j);
            }
        }
        out
    }
}

/// A horizontal slab of a cube at a fixed time index.
pub struct Planform {
    cube: Arc<DataCube>,
    time_idx: usize,
}

impl Planform {
    pub fn new(cube: Arc<DataCube>, time_idx: usize) -> Result<Self> {
        let (nt, _, _) = cube.shape();
        if time_idx >= nt {
            return Err(SedicubeError::InvalidSlice {
                message: format!("time index {} out of range (length {})", time_idx, nt),
            });
        }
        Ok(Self { cube, time_idx })
    }

    pub fn time_idx(&self) -> usize {
        self.time_idx
    }

    /// Lazily read the `(dim1, dim2)` slab of a variable at this time.
    pub fn get(&self, var: &str) -> Result<Array2<f32>> {
        self.cube.slab(var, self.time_idx)
    }
}
