//! Binary mask generators over planform slices
//!
//! All generators take 2-D planform arrays (typically from
//! `Planform::get`) and return boolean classification arrays of the same
//! shape. Comparisons with NaN are false, so missing data never enters a
//! mask.

use crate::errors::{Result, SedicubeError};
use ndarray::Array2;

fn check_same_shape(name: &str, a: &Array2<f32>, b: &Array2<f32>) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(SedicubeError::ShapeMismatch {
            var: name.to_string(),
            expected: vec![a.dim().0, a.dim().1],
            actual: vec![b.dim().0, b.dim().1],
        });
    }
    Ok(())
}

/// Threshold mask: true where elevation is at or above the threshold.
pub fn elevation_mask(elevation: &Array2<f32>, threshold: f32) -> Array2<bool> {
    elevation.mapv(|e| e >= threshold)
}

/// Threshold mask: true where flow magnitude is at or above the threshold.
pub fn flow_mask(flow: &Array2<f32>, threshold: f32) -> Array2<bool> {
    flow.mapv(|v| v >= threshold)
}

/// Land mask: elevation threshold with an optional offset applied to the
/// threshold (useful to capture shallowly submerged delta top).
pub fn land_mask(elevation: &Array2<f32>, threshold: f32, offset: f32) -> Array2<bool> {
    elevation_mask(elevation, threshold + offset)
}

/// Wet mask: the complement of the land mask.
pub fn wet_mask(elevation: &Array2<f32>, threshold: f32) -> Array2<bool> {
    elevation.mapv(|e| e.is_finite() && e < threshold)
}

/// Channel mask: land-adjacent pixels carrying flow at or above the flow
/// threshold.
pub fn channel_mask(
    elevation: &Array2<f32>,
    flow: &Array2<f32>,
    elevation_threshold: f32,
    flow_threshold: f32,
) -> Result<Array2<bool>> {
    check_same_shape("flow", elevation, flow)?;
    let land = land_mask(elevation, elevation_threshold, 0.0);
    let fast = flow_mask(flow, flow_threshold);
    Ok(ndarray::Zip::from(&land)
        .and(&fast)
        .map_collect(|&l, &f| l && f))
}

/// Shoreline mask: land pixels with at least one wet 4-neighbor.
pub fn shoreline_mask(land: &Array2<bool>) -> Array2<bool> {
    let (n1, n2) = land.dim();
    let mut out = Array2::from_elem((n1, n2), false);
    for i in 0..n1 {
        for j in 0..n2 {
            if !land[[i, j]] {
                continue;
            }
            let mut wet_neighbor = false;
            if i > 0 && !land[[i - 1, j]] {
                wet_neighbor = true;
            }
            if i + 1 < n1 && !land[[i + 1, j]] {
                wet_neighbor = true;
            }
            if j > 0 && !land[[i, j - 1]] {
                wet_neighbor = true;
            }
            if j + 1 < n2 && !land[[i, j + 1]] {
                wet_neighbor = true;
            }
            out[[i, j]] = wet_neighbor;
        }
    }
    out
}

/// Edge mask: the land-water interface, including channel edges when a
/// channel mask is supplied (channels cut wet corridors through the land).
pub fn edge_mask(land: &Array2<bool>, channels: Option<&Array2<bool>>) -> Result<Array2<bool>> {
    let effective = match channels {
        Some(ch) => {
            if ch.dim() != land.dim() {
                return Err(SedicubeError::ShapeMismatch {
                    var: "channels".to_string(),
                    expected: vec![land.dim().0, land.dim().1],
                    actual: vec![ch.dim().0, ch.dim().1],
                });
            }
            ndarray::Zip::from(land)
                .and(ch)
                .map_collect(|&l, &c| l && !c)
        }
        None => land.clone(),
    };
    Ok(shoreline_mask(&effective))
}

/// Centerline mask: morphological thinning (Zhang-Suen) of a channel mask
/// down to one-pixel-wide skeletons.
pub fn centerline_mask(channels: &Array2<bool>) -> Array2<bool> {
    let mut img = channels.clone();
    let (n1, n2) = img.dim();
    if n1 < 3 || n2 < 3 {
        return img;
    }

    loop {
        let mut changed = false;
        for pass in 0..2 {
            let mut to_clear: Vec<(usize, usize)> = Vec::new();
            for i in 1..n1 - 1 {
                for j in 1..n2 - 1 {
                    if !img[[i, j]] {
                        continue;
                    }
                    // neighbors clockwise from north
                    let p = [
                        img[[i - 1, j]],
                        img[[i - 1, j + 1]],
                        img[[i, j + 1]],
                        img[[i + 1, j + 1]],
                        img[[i + 1, j]],
                        img[[i + 1, j - 1]],
                        img[[i, j - 1]],
                        img[[i - 1, j - 1]],
                    ];
                    let b: usize = p.iter().filter(|&&v| v).count();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    let a = (0..8)
                        .filter(|&k| !p[k] && p[(k + 1) % 8])
                        .count();
                    if a != 1 {
                        continue;
                    }
                    let (c1, c2) = if pass == 0 {
                        // north*east*south, east*south*west
                        (p[0] && p[2] && p[4], p[2] && p[4] && p[6])
                    } else {
                        // north*east*west, north*south*west
                        (p[0] && p[2] && p[6], p[0] && p[4] && p[6])
                    };
                    // delete only when both neighbor products vanish
                    if !c1 && !c2 {
                        to_clear.push((i, j));
                    }
                }
            }
            if !to_clear.is_empty() {
                changed = true;
                for (i, j) in to_clear {
                    img[[i, j]] = false;
                }
            }
        }
        if !changed {
            break;
        }
    }
    img
}

/// Fraction of true pixels in a mask.
pub fn mask_fraction(mask: &Array2<bool>) -> f64 {
    let total = mask.len();
    if total == 0 {
        return 0.0;
    }
    mask.iter().filter(|&&v| v).count() as f64 / total as f64
}
