//! Stratigraphy engine: preservation state and materialized volumes
//!
//! Given the bed-elevation history `eta(t, dim1, dim2)` of a cube, this
//! module determines which time steps remain part of the final deposit at
//! each spatial column, and can re-index the cube onto a fixed vertical
//! elevation grid (a `StratigraphyCube`).
//!
//! Preservation at a column depends only on that column's elevation series,
//! so the computation is a parallel map over columns.

use crate::cube::DataCube;
use crate::errors::{Result, SedicubeError};
use ndarray::{Array2, Array3, ArrayView1, ArrayViewMut1, Axis, Zip};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Capability to answer "is the voxel at `(t, dim1, dim2)` preserved?"
///
/// Implemented by `Preservation` and by `DataCube` (which answers `false`
/// until its preservation state has been computed).
pub trait StratigraphyView {
    fn is_preserved(&self, t: usize, i: usize, j: usize) -> bool;
}

/// Subsidence information used to adjust the elevation history before
/// preservation is computed. Positive distances are subsidence, negative
/// are uplift.
#[derive(Debug, Clone)]
pub enum Subsidence {
    /// Constant distance subsided per time step, everywhere.
    Uniform(f32),
    /// Cumulative distance subsided at each time index, everywhere.
    PerStep(Vec<f32>),
    /// Cumulative distance subsided per voxel, shaped like the elevation
    /// history.
    Volume(Array3<f32>),
}

/// Options for a bulk preservation computation.
///
/// All fields are optional; `StratOptions::default()` computes without
/// subsidence, cancellation, or progress reporting.
#[derive(Default)]
pub struct StratOptions {
    /// Cooperative cancellation flag; when set, the computation stops and
    /// returns `SedicubeError::Cancelled`.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Called with `(columns_done, columns_total)` as columns complete.
    pub progress: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
    /// Subsidence adjustment applied to the elevation history first.
    pub sigma_dist: Option<Subsidence>,
}

/// Boolean preservation state for a cube's elevation history.
#[derive(Debug, Clone)]
pub struct Preservation {
    mask: Array3<bool>,
    voxel_count: Array2<usize>,
}

impl Preservation {
    /// Compute preservation from an elevation history with default options.
    pub fn compute(eta: &Array3<f32>) -> Result<Self> {
        Self::compute_with(eta, &StratOptions::default())
    }

    /// Compute preservation from an elevation history.
    ///
    /// Each spatial column is scanned forward in time while maintaining the
    /// elevation of the current top of the preserved section. A step
    /// strictly above the top adds new section and advances the top; a step
    /// below the top deposits nothing new. A step exactly at the top
    /// re-attributes the record surface to that (most recent) step, so a
    /// constant series preserves only its final sample.
    pub fn compute_with(eta: &Array3<f32>, options: &StratOptions) -> Result<Self> {
        let (nt, n1, n2) = eta.dim();
        if nt == 0 || n1 == 0 || n2 == 0 {
            return Err(SedicubeError::InvalidParameter {
                param: "eta".to_string(),
                message: "elevation history has an empty axis".to_string(),
            });
        }

        let adjusted;
        let eta = match &options.sigma_dist {
            Some(sigma) => {
                adjusted = adjust_elevation_by_subsidence(eta, sigma)?;
                &adjusted
            }
            None => eta,
        };

        let mut mask = Array3::from_elem((nt, n1, n2), false);
        let total = n1 * n2;
        let done = AtomicUsize::new(0);

        Zip::from(mask.lanes_mut(Axis(0)))
            .and(eta.lanes(Axis(0)))
            .par_for_each(|mask_col, eta_col| {
                if let Some(flag) = &options.cancel {
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                }
                preserved_column(eta_col, mask_col);
                if let Some(progress) = &options.progress {
                    let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                    progress(count, total);
                }
            });

        if let Some(flag) = &options.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(SedicubeError::Cancelled);
            }
        }

        let voxel_count = mask.map_axis(Axis(0), |col| col.iter().filter(|&&p| p).count());
        Ok(Self { mask, voxel_count })
    }

    /// Boolean `(time, dim1, dim2)` preservation volume.
    pub fn mask(&self) -> &Array3<bool> {
        &self.mask
    }

    /// Number of preserved time steps per spatial column.
    pub fn voxel_count(&self) -> &Array2<usize> {
        &self.voxel_count
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.mask.dim()
    }
}

impl StratigraphyView for Preservation {
    fn is_preserved(&self, t: usize, i: usize, j: usize) -> bool {
        self.mask.get((t, i, j)).copied().unwrap_or(false)
    }
}

/// Forward scan of one column's elevation series.
///
/// `top` holds the elevation of the current top of the preserved section
/// and never recedes. Non-finite samples deposit nothing.
fn preserved_column(eta: ArrayView1<f32>, mut mask: ArrayViewMut1<bool>) {
    let mut top = f32::NEG_INFINITY;
    let mut holder: Option<usize> = None;
    for (t, &e) in eta.iter().enumerate() {
        if !e.is_finite() {
            continue;
        }
        if e > top {
            mask[t] = true;
            top = e;
            holder = Some(t);
        } else if e == top {
            // Stasis at the record surface: the surface belongs to the most
            // recent step that occupied it.
            if let Some(h) = holder {
                mask[h] = false;
            }
            mask[t] = true;
            holder = Some(t);
        }
    }
}

/// Adjust an elevation history by subsidence distances.
///
/// Constant inputs are treated as per-time-step distances; vector and
/// volume inputs as cumulative distances at each time index (following the
/// convention of the laboratory datasets this supports).
pub fn adjust_elevation_by_subsidence(
    eta: &Array3<f32>,
    sigma_dist: &Subsidence,
) -> Result<Array3<f32>> {
    let (nt, n1, n2) = eta.dim();
    match sigma_dist {
        Subsidence::Uniform(d) => {
            let mut out = eta.to_owned();
            for (t, mut slab) in out.axis_iter_mut(Axis(0)).enumerate() {
                let shift = *d * (nt - 1 - t) as f32;
                slab.mapv_inplace(|e| e - shift);
            }
            Ok(out)
        }
        Subsidence::PerStep(cumulative) => {
            if cumulative.len() != nt {
                return Err(SedicubeError::InvalidParameter {
                    param: "sigma_dist".to_string(),
                    message: format!(
                        "cumulative subsidence has {} entries for {} time steps",
                        cumulative.len(),
                        nt
                    ),
                });
            }
            let max = cumulative.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let mut out = eta.to_owned();
            for (t, mut slab) in out.axis_iter_mut(Axis(0)).enumerate() {
                let shift = max - cumulative[t];
                slab.mapv_inplace(|e| e - shift);
            }
            Ok(out)
        }
        Subsidence::Volume(cumulative) => {
            if cumulative.dim() != eta.dim() {
                return Err(SedicubeError::InvalidParameter {
                    param: "sigma_dist".to_string(),
                    message: "subsidence volume shape does not match elevation history"
                        .to_string(),
                });
            }
            // per-column base: cumulative max over time, minus the column value
            let col_max = cumulative.map_axis(Axis(0), |col| {
                col.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
            });
            let mut out = eta.to_owned();
            for t in 0..nt {
                for i in 0..n1 {
                    for j in 0..n2 {
                        out[[t, i, j]] -= col_max[[i, j]] - cumulative[[t, i, j]];
                    }
                }
            }
            Ok(out)
        }
    }
}

/// A materialized, elevation-indexed stratigraphic volume.
///
/// The leading axis is a fixed vertical grid `z` with spacing `dz` instead
/// of time. Each bin of each column records which source time step (if any)
/// deposited through that elevation, and the value of every cube variable
/// at that time step. Bins above the final deposit are empty (`None` time
/// index, NaN values).
///
/// Frozen: owns its arrays and is independent of the source cube after
/// construction.
pub struct StratigraphyCube {
    z: Vec<f64>,
    dz: f64,
    dim1: Vec<f64>,
    dim2: Vec<f64>,
    elevation_var: String,
    time_index: Array3<Option<usize>>,
    variables: Vec<(String, Array3<f32>)>,
}

impl StratigraphyCube {
    /// Materialize a stratigraphic volume from a data cube.
    pub fn from_data_cube(cube: &DataCube, elevation_var: &str, dz: f64) -> Result<Self> {
        Self::from_data_cube_with(cube, elevation_var, dz, &StratOptions::default())
    }

    /// As `from_data_cube`, with cancellation/progress/subsidence options.
    pub fn from_data_cube_with(
        cube: &DataCube,
        elevation_var: &str,
        dz: f64,
        options: &StratOptions,
    ) -> Result<Self> {
        if !(dz > 0.0) {
            return Err(SedicubeError::InvalidParameter {
                param: "dz".to_string(),
                message: format!("vertical bin size must be positive, got {}", dz),
            });
        }

        let eta = cube.load(elevation_var)?;
        let adjusted;
        let eta = match &options.sigma_dist {
            Some(sigma) => {
                adjusted = adjust_elevation_by_subsidence(&eta, sigma)?;
                &adjusted
            }
            None => &eta,
        };
        // subsidence already applied above, do not re-apply inside compute
        let scan_options = StratOptions {
            cancel: options.cancel.clone(),
            progress: options.progress.clone(),
            sigma_dist: None,
        };
        let preservation = Preservation::compute_with(eta, &scan_options)?;

        let finite = eta.iter().cloned().filter(|e| e.is_finite());
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for e in finite {
            min = min.min(e as f64);
            max = max.max(e as f64);
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(SedicubeError::InvalidParameter {
                param: "elevation_var".to_string(),
                message: format!("variable '{}' has no finite values", elevation_var),
            });
        }

        // z grid spans [min, max + dz), so the bin holding the highest
        // surface exists
        let mut z = Vec::new();
        let mut k = 0usize;
        loop {
            let v = min + k as f64 * dz;
            if v >= max + dz {
                break;
            }
            z.push(v);
            k += 1;
        }
        let nz = z.len();
        let (nt, n1, n2) = eta.dim();

        // map every z bin to the source time step that deposited through it
        let mut time_index: Array3<Option<usize>> = Array3::from_elem((nz, n1, n2), None);
        for i in 0..n1 {
            for j in 0..n2 {
                let mut k = 0usize;
                for t in 0..nt {
                    if !preservation.is_preserved(t, i, j) {
                        continue;
                    }
                    let e = eta[[t, i, j]] as f64;
                    while k < nz && z[k] <= e {
                        time_index[[k, i, j]] = Some(t);
                        k += 1;
                    }
                }
            }
        }

        // carry every cube variable into the volume at the recorded steps
        let mut variables = Vec::with_capacity(cube.variables().len());
        for name in cube.variables() {
            let src = cube.load(name)?;
            let mut vol = Array3::from_elem((nz, n1, n2), f32::NAN);
            for ((idx, slot), out) in time_index.indexed_iter().zip(vol.iter_mut()) {
                if let Some(t) = slot {
                    *out = src[[*t, idx.1, idx.2]];
                }
            }
            variables.push((name.clone(), vol));
        }

        Ok(Self {
            z,
            dz,
            dim1: cube.coords().dim1().to_vec(),
            dim2: cube.coords().dim2().to_vec(),
            elevation_var: elevation_var.to_string(),
            time_index,
            variables,
        })
    }

    /// Vertical bin lower edges.
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn dz(&self) -> f64 {
        self.dz
    }

    pub fn dim1(&self) -> &[f64] {
        &self.dim1
    }

    pub fn dim2(&self) -> &[f64] {
        &self.dim2
    }

    /// Shape as `(z, dim1, dim2)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.time_index.dim()
    }

    /// Name of the elevation variable the volume was built from.
    pub fn elevation_var(&self) -> &str {
        &self.elevation_var
    }

    pub fn variables(&self) -> Vec<String> {
        self.variables.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Elevation-indexed values of a variable; NaN where no deposit.
    pub fn get(&self, name: &str) -> Result<&Array3<f32>> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
            .ok_or_else(|| SedicubeError::VariableNotFound {
                var: name.to_string(),
            })
    }

    /// Source time step recorded in each bin; `None` where no deposit.
    pub fn time_index(&self) -> &Array3<Option<usize>> {
        &self.time_index
    }

    /// Source time step at one bin of one column.
    pub fn time_index_at(&self, k: usize, i: usize, j: usize) -> Option<usize> {
        self.time_index.get((k, i, j)).copied().flatten()
    }

    /// `[low, high)` elevation bounds of bin `k`.
    pub fn bin_bounds(&self, k: usize) -> Option<(f64, f64)> {
        self.z.get(k).map(|&lo| (lo, lo + self.dz))
    }

    /// Index of the bin containing an elevation, if in range.
    pub fn bin_of(&self, elevation: f64) -> Option<usize> {
        if self.z.is_empty() || elevation < self.z[0] {
            return None;
        }
        let k = ((elevation - self.z[0]) / self.dz) as usize;
        (k < self.z.len()).then_some(k)
    }
}

/// Deposit thickness between two bounding surfaces.
///
/// Returns `top - bottom`, with non-positive differences (no deposition or
/// net erosion) set to NaN.
pub fn compute_thickness_surfaces(
    top: &Array2<f32>,
    bottom: &Array2<f32>,
) -> Result<Array2<f32>> {
    if top.dim() != bottom.dim() {
        return Err(SedicubeError::ShapeMismatch {
            var: "bottom_surface".to_string(),
            expected: vec![top.dim().0, top.dim().1],
            actual: vec![bottom.dim().0, bottom.dim().1],
        });
    }
    let mut difference = top - bottom;
    difference.mapv_inplace(|d| if d <= 0.0 { f32::NAN } else { d });
    Ok(difference)
}

/// Spatially resolved net-to-gross of a deposit volume.
///
/// The leading axis of `volume` is vertical. Voxels at or above
/// `net_threshold` count as net; all finite deposit voxels count as gross.
/// If no threshold is given, the midpoint of the finite value range is
/// used. `background`, when supplied, marks voxels excluded from the
/// deposit. Columns with no gross deposit are NaN.
pub fn compute_net_to_gross(
    volume: &Array3<f32>,
    net_threshold: Option<f32>,
    background: Option<&Array3<bool>>,
) -> Result<Array2<f32>> {
    if let Some(bg) = background {
        if bg.dim() != volume.dim() {
            return Err(SedicubeError::ShapeMismatch {
                var: "background".to_string(),
                expected: vec![volume.dim().0, volume.dim().1, volume.dim().2],
                actual: vec![bg.dim().0, bg.dim().1, bg.dim().2],
            });
        }
    }

    let threshold = match net_threshold {
        Some(t) => t,
        None => {
            let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
            for &v in volume.iter().filter(|v| v.is_finite()) {
                lo = lo.min(v);
                hi = hi.max(v);
            }
            (lo + hi) / 2.0
        }
    };

    let (nz, n1, n2) = volume.dim();
    let mut out = Array2::from_elem((n1, n2), f32::NAN);
    for i in 0..n1 {
        for j in 0..n2 {
            let mut net = 0usize;
            let mut gross = 0usize;
            for k in 0..nz {
                let v = volume[[k, i, j]];
                if !v.is_finite() {
                    continue;
                }
                if let Some(bg) = background {
                    if bg[[k, i, j]] {
                        continue;
                    }
                }
                gross += 1;
                if v >= threshold {
                    net += 1;
                }
            }
            if gross > 0 {
                out[[i, j]] = net as f32 / gross as f32;
            }
        }
    }
    Ok(out)
}
