//! Channel mobility statistics
//!
//! Statistics over time-stacks of channel and land masks that quantify how
//! quickly channels rework a delta surface. Each routine compares a set of
//! base maps against the maps that follow them within a time-lag window,
//! producing a `(base, lag)` array.

use crate::errors::{Result, SedicubeError};
use ndarray::{Array2, Array3};

fn count_true(map: &Array2<bool>) -> f64 {
    map.iter().filter(|&&v| v).count() as f64
}

fn slab(stack: &Array3<bool>, t: usize) -> Array2<bool> {
    stack.index_axis(ndarray::Axis(0), t).to_owned()
}

/// Validate base indices and a lag window against a mask stack.
///
/// Every `base + lag` index touched by the analysis must exist in the
/// stack, and the channel and land stacks must agree in shape.
fn check_window(
    channels: &Array3<bool>,
    land: Option<&Array3<bool>>,
    base: &[usize],
    window: usize,
) -> Result<()> {
    if let Some(land) = land {
        if land.dim() != channels.dim() {
            let (nt, n1, n2) = channels.dim();
            let (lt, l1, l2) = land.dim();
            return Err(SedicubeError::ShapeMismatch {
                var: "land".to_string(),
                expected: vec![nt, n1, n2],
                actual: vec![lt, l1, l2],
            });
        }
    }
    if base.is_empty() {
        return Err(SedicubeError::InvalidParameter {
            param: "base".to_string(),
            message: "at least one base time index is required".to_string(),
        });
    }
    if window == 0 {
        return Err(SedicubeError::InvalidParameter {
            param: "window".to_string(),
            message: "time-lag window must be at least 1".to_string(),
        });
    }
    let nt = channels.dim().0;
    let kmax = base.iter().max().copied().unwrap_or(0) + window;
    if kmax > nt {
        return Err(SedicubeError::InvalidParameter {
            param: "window".to_string(),
            message: format!(
                "base index {} with window {} exceeds the {} available time steps",
                kmax - window,
                window,
                nt
            ),
        });
    }
    Ok(())
}

/// Dry-fraction decay relative to each base map (Cazanacli et al., 2002).
///
/// Row `i`, column `k` holds the fraction of the base land map that no
/// channel has visited through lag `k` after `base[i]`. The fraction is not
/// normalized, so column 0 is the base map's own dry fraction rather
/// than 1.
pub fn calculate_channel_decay(
    channels: &Array3<bool>,
    land: &Array3<bool>,
    base: &[usize],
    window: usize,
) -> Result<Array2<f64>> {
    check_window(channels, Some(land), base, window)?;
    let mut dryfrac = Array2::zeros((base.len(), window));

    for (i, &b) in base.iter().enumerate() {
        let base_land = slab(land, b);
        let base_channels = slab(channels, b);
        let land_pixels = count_true(&base_land);
        if land_pixels == 0.0 {
            return Err(SedicubeError::InvalidParameter {
                param: "base".to_string(),
                message: format!("land map at base index {} has no land pixels", b),
            });
        }

        // land never yet visited by a channel
        let mut dry = ndarray::Zip::from(&base_land)
            .and(&base_channels)
            .map_collect(|&l, &c| l && !c);
        dryfrac[[i, 0]] = count_true(&dry) / land_pixels;

        for lag in 1..window {
            let step = slab(channels, b + lag);
            ndarray::Zip::from(&mut dry).and(&step).for_each(|d, &c| {
                if c {
                    *d = false;
                }
            });
            dryfrac[[i, lag]] = count_true(&dry) / land_pixels;
        }
    }
    Ok(dryfrac)
}

/// Normalized planform overlap statistic (Wickert et al., 2013).
///
/// `Ophi = 1 - D / (A * phi)` per base map and lag, where `D` counts
/// pixels whose channel state differs from the base map over the base
/// land area `A`, and `phi` is the expected mismatch for uncorrelated
/// maps with the observed wet fractions. 1 means identical planforms,
/// 0 means fully decorrelated.
pub fn calculate_planform_overlap(
    channels: &Array3<bool>,
    land: &Array3<bool>,
    base: &[usize],
    window: usize,
) -> Result<Array2<f64>> {
    check_window(channels, Some(land), base, window)?;
    let mut ophi = Array2::zeros((base.len(), window));

    for (j, &b) in base.iter().enumerate() {
        let mask = slab(land, b);
        let base_channels = slab(channels, b);
        let area = count_true(&mask);
        if area == 0.0 {
            return Err(SedicubeError::InvalidParameter {
                param: "base".to_string(),
                message: format!("land map at base index {} has no land pixels", b),
            });
        }
        let fwet_base = count_true(&base_channels) / area;
        let fdry_base = 1.0 - fwet_base;

        for lag in 0..window {
            let step = slab(channels, b + lag);
            let mut mismatch = 0.0;
            let mut wet_step = 0.0;
            ndarray::Zip::from(&mask)
                .and(&base_channels)
                .and(&step)
                .for_each(|&m, &cb, &cs| {
                    if !m {
                        return;
                    }
                    if cb != cs {
                        mismatch += 1.0;
                    }
                    if cs {
                        wet_step += 1.0;
                    }
                });
            let fwet_step = wet_step / area;
            let fdry_step = 1.0 - fwet_step;
            let phi = fwet_base * fdry_step + fdry_base * fwet_step;
            ophi[[j, lag]] = if phi > 0.0 {
                1.0 - mismatch / (area * phi)
            } else {
                f64::NAN
            };
        }
    }
    Ok(ophi)
}

/// Fraction of base-map channel pixels abandoned by each lag.
///
/// A pixel is abandoned when it was channelized in the base map but not in
/// the lagged map. Column 0 is always zero (a map cannot abandon itself).
pub fn calculate_channel_abandonment(
    channels: &Array3<bool>,
    base: &[usize],
    window: usize,
) -> Result<Array2<f64>> {
    check_window(channels, None, base, window)?;
    let mut abandoned = Array2::zeros((base.len(), window));

    for (i, &b) in base.iter().enumerate() {
        let base_channels = slab(channels, b);
        let base_area = count_true(&base_channels);
        if base_area == 0.0 {
            return Err(SedicubeError::InvalidParameter {
                param: "base".to_string(),
                message: format!("channel map at base index {} has no channel pixels", b),
            });
        }
        for lag in 1..window {
            let step = slab(channels, b + lag);
            let gone = ndarray::Zip::from(&base_channels)
                .and(&step)
                .fold(0.0, |acc, &cb, &cs| if cb && !cs { acc + 1.0 } else { acc });
            abandoned[[i, lag]] = gone / base_area;
        }
    }
    Ok(abandoned)
}

/// Time-averaged channel occupancy: per pixel, the fraction of maps in the
/// stack that flag it as channel.
pub fn channel_presence(channels: &Array3<bool>) -> Result<Array2<f64>> {
    let (nt, n1, n2) = channels.dim();
    if nt == 0 {
        return Err(SedicubeError::InvalidParameter {
            param: "channels".to_string(),
            message: "channel mask stack has no time steps".to_string(),
        });
    }
    let mut presence = Array2::zeros((n1, n2));
    for t in 0..nt {
        for i in 0..n1 {
            for j in 0..n2 {
                if channels[[t, i, j]] {
                    presence[[i, j]] += 1.0;
                }
            }
        }
    }
    Ok(presence / nt as f64)
}
