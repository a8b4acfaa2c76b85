//! Neighborhood-contrast saliency over the region table.

use log::debug;

use crate::error::{Error, Result};
use crate::features::RegionRecord;

pub const DEFAULT_NEIGHBORS: usize = 10;

/// A region paired with its centroid distance to the region being ranked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborDistance {
    pub distance: f32,
    pub id: usize,
}

/// All regions ordered by centroid distance to `regions[i]`, nearest first.
/// The region itself is included at distance 0. Order among equal distances is
/// unspecified.
pub fn rank_neighbors(regions: &[RegionRecord], i: usize) -> Vec<NeighborDistance> {
    let origin = &regions[i];
    let mut ranked: Vec<NeighborDistance> = regions
        .iter()
        .enumerate()
        .map(|(id, r)| {
            let dx = (origin.center_x - r.center_x) as f32;
            let dy = (origin.center_y - r.center_y) as f32;
            NeighborDistance { distance: (dx * dx + dy * dy).sqrt(), id }
        })
        .collect();
    ranked.sort_unstable_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked
}

/// Per-region contrast sums against the nearest neighbors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegionContrast {
    pub intensity: f32,
    pub rg: f32,
    pub by: f32,
}

pub fn region_contrasts(regions: &[RegionRecord], neighbors: usize) -> Vec<RegionContrast> {
    let take = neighbors.min(regions.len());
    (0..regions.len())
        .map(|i| {
            let r = &regions[i];
            rank_neighbors(regions, i).iter().take(take).fold(RegionContrast::default(), |acc, n| {
                let o = &regions[n.id];
                RegionContrast {
                    intensity: acc.intensity + (r.intensity - o.intensity).abs() as f32,
                    rg: acc.rg + (r.rg - o.rg).abs() as f32,
                    by: acc.by + (r.by - o.by).abs() as f32,
                }
            })
        })
        .collect()
}

/// Rescales `values` in place to span [0, 1]. A flat map becomes all zeros.
pub fn normalize_range(values: &mut [f32]) {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.is_empty() {
        return;
    }
    for v in values.iter_mut() {
        *v -= min;
        if min < max {
            *v /= max - min;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaliencyMaps {
    pub width: usize,
    pub height: usize,
    /// Normalized intensity conspicuity.
    pub intensity: Vec<f32>,
    /// Normalized color conspicuity.
    pub color: Vec<f32>,
    /// Mean of the two conspicuity maps.
    pub saliency: Vec<f32>,
}

/// Paints per-region contrasts back onto the pixel grid and combines them.
pub fn saliency_maps(
    labels: &[i32],
    width: usize,
    height: usize,
    regions: &[RegionRecord],
    neighbors: usize,
) -> Result<SaliencyMaps> {
    if labels.len() != width * height {
        return Err(Error::InvalidArgument(format!(
            "label map has {} entries, expected {}x{}",
            labels.len(),
            width,
            height
        )));
    }
    let contrasts = region_contrasts(regions, neighbors);
    let mut intensity = Vec::with_capacity(labels.len());
    let mut color = Vec::with_capacity(labels.len());
    for (index, &label) in labels.iter().enumerate() {
        let c = usize::try_from(label)
            .ok()
            .and_then(|l| contrasts.get(l))
            .ok_or(Error::LabelOutOfRange { index, label, num_labels: contrasts.len() })?;
        intensity.push(c.intensity);
        color.push((c.rg + c.by) / 2.0);
    }
    normalize_range(&mut intensity);
    normalize_range(&mut color);
    let saliency = intensity.iter().zip(&color).map(|(i, c)| (i + c) / 2.0).collect();
    debug!("saliency over {} regions with {} neighbors", regions.len(), neighbors.min(regions.len()));
    Ok(SaliencyMaps { width, height, intensity, color, saliency })
}
