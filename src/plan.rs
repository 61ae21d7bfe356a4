//! Planform metrics
//!
//! Scalar and per-pixel statistics over planform masks and slices: delta
//! area, shoreline length and roughness, channel geometry along a section
//! trace, and surface deposit timing.

use crate::errors::{Result, SedicubeError};
use ndarray::{Array2, ArrayView3};

/// Land (delta) area: true-pixel count times the cell area `dx * dx`.
pub fn compute_land_area(land: &Array2<bool>, dx: f64) -> f64 {
    land.iter().filter(|&&v| v).count() as f64 * dx * dx
}

/// Shoreline length by nearest-neighbor line tracing.
///
/// Shoreline pixels are organized into an ordered polyline: starting from
/// the pixel nearest `origin`, repeatedly hop to the nearest unused pixel
/// while it lies within a capture distance of 10 cells. A second pass
/// extends the line backward from the starting pixel so shorelines that
/// run both ways from the origin are fully traced. The result is the
/// summed segment length, scaled by `dx`.
///
/// Pixels further than the capture distance from either end are left out;
/// the trace is a heuristic, not a topological contour.
pub fn compute_shoreline_length(shore: &Array2<bool>, dx: f64, origin: (f64, f64)) -> Result<f64> {
    let pts: Vec<(f64, f64)> = shore
        .indexed_iter()
        .filter(|(_, &v)| v)
        .map(|((i, j), _)| (i as f64, j as f64))
        .collect();
    if pts.is_empty() {
        return Err(SedicubeError::EmptyPath);
    }

    let dist = |a: (f64, f64), b: (f64, f64)| -> f64 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    };
    let dist_max = 100.0_f64.sqrt();

    let mut used = vec![false; pts.len()];
    let nearest_unused = |from: (f64, f64), used: &[bool]| -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (k, &p) in pts.iter().enumerate() {
            if used[k] {
                continue;
            }
            let d = dist(from, p);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((k, d));
            }
        }
        best
    };

    // forward pass from the origin-nearest pixel
    let (start, _) = nearest_unused(origin, &used).ok_or(SedicubeError::EmptyPath)?;
    used[start] = true;
    let mut forward = vec![pts[start]];
    let mut head = pts[start];
    while let Some((k, d)) = nearest_unused(head, &used) {
        if d > dist_max {
            break;
        }
        used[k] = true;
        head = pts[k];
        forward.push(head);
    }

    // backward pass from the starting pixel, over what remains
    let mut backward: Vec<(f64, f64)> = Vec::new();
    let mut anchor = pts[start];
    while let Some((k, d)) = nearest_unused(anchor, &used) {
        if d > dist_max {
            break;
        }
        used[k] = true;
        anchor = pts[k];
        backward.push(anchor);
    }

    backward.reverse();
    backward.extend(forward);
    let length: f64 = backward.windows(2).map(|w| dist(w[0], w[1])).sum();
    Ok(length * dx)
}

/// Shoreline roughness: shoreline length divided by the square root of the
/// land area.
pub fn compute_shoreline_roughness(
    shore: &Array2<bool>,
    land: &Array2<bool>,
    dx: f64,
    origin: (f64, f64),
) -> Result<f64> {
    let area = compute_land_area(land, dx);
    if !(area > 0.0) {
        return Err(SedicubeError::InvalidParameter {
            param: "land".to_string(),
            message: "land mask has no pixels, roughness is undefined".to_string(),
        });
    }
    let length = compute_shoreline_length(shore, dx, origin)?;
    Ok(length / area.sqrt())
}

/// Aggregate of per-channel measurements along a section trace.
#[derive(Debug, Clone)]
pub struct ChannelGeometry {
    pub mean: f64,
    pub stddev: f64,
    pub values: Vec<f64>,
}

impl ChannelGeometry {
    fn from_values(values: Vec<f64>) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            stddev: var.sqrt(),
            values,
        }
    }
}

/// Runs of consecutive channel pixels along a trace, as half-open
/// `start..end` index pairs into the trace.
fn channel_runs(channels: &Array2<bool>, trace: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (k, &(i, j)) in trace.iter().enumerate() {
        match (channels[[i, j]], start) {
            (true, None) => start = Some(k),
            (false, Some(s)) => {
                runs.push((s, k));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, trace.len()));
    }
    runs
}

/// Width of each channel crossed by a section trace, aggregated.
///
/// A channel is a maximal run of consecutive channel-mask pixels along the
/// trace; its width is the along-trace distance spanned by the run. Works
/// best with traces that cross channels roughly perpendicularly (circular
/// sections, for deltas).
pub fn compute_channel_width(
    channels: &Array2<bool>,
    trace: &[(usize, usize)],
    distance: &[f64],
) -> Result<ChannelGeometry> {
    if trace.len() != distance.len() {
        return Err(SedicubeError::InvalidParameter {
            param: "distance".to_string(),
            message: format!(
                "trace has {} cells but {} distances",
                trace.len(),
                distance.len()
            ),
        });
    }
    let runs = channel_runs(channels, trace);
    if runs.is_empty() {
        return Err(SedicubeError::EmptyPath);
    }
    let widths = runs
        .iter()
        .map(|&(s, e)| distance[e - 1] - distance[s])
        .collect();
    Ok(ChannelGeometry::from_values(widths))
}

/// How to reduce per-pixel depths within one crossed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthKind {
    /// Deepest pixel of the channel.
    Thalweg,
    /// Mean over the channel's pixels.
    Mean,
}

/// Depth of each channel crossed by a section trace, aggregated.
///
/// Channels are identified as in `compute_channel_width`; per channel the
/// depth is either the thalweg (max) or the mean of the depth field over
/// the run's pixels. NaN depth samples are ignored.
pub fn compute_channel_depth(
    channels: &Array2<bool>,
    depth: &Array2<f32>,
    trace: &[(usize, usize)],
    kind: DepthKind,
) -> Result<ChannelGeometry> {
    if depth.dim() != channels.dim() {
        return Err(SedicubeError::ShapeMismatch {
            var: "depth".to_string(),
            expected: vec![channels.dim().0, channels.dim().1],
            actual: vec![depth.dim().0, depth.dim().1],
        });
    }
    let runs = channel_runs(channels, trace);
    if runs.is_empty() {
        return Err(SedicubeError::EmptyPath);
    }
    let depths = runs
        .iter()
        .map(|&(s, e)| {
            let samples: Vec<f64> = trace[s..e]
                .iter()
                .map(|&(i, j)| depth[[i, j]] as f64)
                .filter(|d| d.is_finite())
                .collect();
            if samples.is_empty() {
                return f64::NAN;
            }
            match kind {
                DepthKind::Thalweg => samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                DepthKind::Mean => samples.iter().sum::<f64>() / samples.len() as f64,
            }
        })
        .collect();
    Ok(ChannelGeometry::from_values(depths))
}

/// Time index of last deposition for each pixel of the final surface.
///
/// For each pixel, the reported time is the first step at which the bed
/// came within `stasis_tol` of its final elevation and stayed effectively
/// static. Elevation changes smaller than the tolerance count as stasis.
pub fn compute_surface_deposit_time(
    eta_history: &ArrayView3<f32>,
    stasis_tol: f32,
) -> Result<Array2<usize>> {
    if !(stasis_tol > 0.0) {
        return Err(SedicubeError::InvalidParameter {
            param: "stasis_tol".to_string(),
            message: format!("stasis tolerance must be positive, got {}", stasis_tol),
        });
    }
    let (nt, n1, n2) = eta_history.dim();
    if nt == 0 {
        return Err(SedicubeError::InvalidParameter {
            param: "eta_history".to_string(),
            message: "elevation history has no time steps".to_string(),
        });
    }
    let mut out = Array2::zeros((n1, n2));
    for i in 0..n1 {
        for j in 0..n2 {
            let final_eta = eta_history[[nt - 1, i, j]];
            // first step already within tolerance of the final surface
            let mut date = 0;
            for t in 0..nt {
                if (eta_history[[t, i, j]] - final_eta).abs() < stasis_tol {
                    date = t;
                    break;
                }
            }
            out[[i, j]] = date;
        }
    }
    Ok(out)
}

/// Age of the surface deposit: steps elapsed since last deposition.
pub fn compute_surface_deposit_age(
    eta_history: &ArrayView3<f32>,
    stasis_tol: f32,
) -> Result<Array2<usize>> {
    let (nt, _, _) = eta_history.dim();
    let date = compute_surface_deposit_time(eta_history, stasis_tol)?;
    Ok(date.mapv(|d| nt - 1 - d))
}
