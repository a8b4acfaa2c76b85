//! Per-region statistics and motion-coherence classification.

use image::RgbImage;
use log::debug;

use crate::color::Vec3;
use crate::error::{alloc_buffer, Error, Result};
use crate::motion::MotionField;

/// Thresholds deciding whether a region moves as one object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoherenceThresholds {
    /// Dispersion of the non-zero motion samples must stay strictly below this.
    pub max_dispersion: f64,
    /// Fraction of pixels carrying non-zero motion must reach at least this.
    pub min_coverage: f64,
}

impl Default for CoherenceThresholds {
    fn default() -> Self { Self { max_dispersion: 0.7, min_coverage: 0.7 } }
}

/// Statistics of one final label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionRecord {
    pub id: usize,
    pub size: usize,
    pub center_x: f64,
    pub center_y: f64,
    /// Mean RGB in 8-bit units.
    pub color: Vec3,
    /// Mean of (R + G + B) / 3 over channels scaled to [0, 1].
    pub intensity: f64,
    /// Mean red-green opponent contrast.
    pub rg: f64,
    /// Mean blue-yellow opponent contrast.
    pub by: f64,
    /// Mean of the non-zero motion samples, zero when there are none.
    pub flow: [f64; 2],
    /// Every non-zero motion vector seen inside the region.
    pub raw_flow: Vec<[f32; 2]>,
    pub coherent: bool,
    pub cluster: Option<usize>,
}

impl RegionRecord {
    pub fn new(id: usize) -> Self { Self { id, ..Default::default() } }

    /// Share of pixels with a non-zero motion vector.
    pub fn motion_coverage(&self) -> f64 {
        if self.size == 0 { 0.0 } else { self.raw_flow.len() as f64 / self.size as f64 }
    }
}

/// Per-pixel color channels derived once for the whole image.
struct OpponentMaps {
    intensity: Vec<f64>,
    rg: Vec<f64>,
    by: Vec<f64>,
}

fn opponent_maps(image: &RgbImage) -> Result<OpponentMaps> {
    let sz = image.width() as usize * image.height() as usize;
    let mut intensity = alloc_buffer(sz, 0.0f64)?;
    for (i, p) in image.pixels().enumerate() {
        intensity[i] = (p[0] as f64 + p[1] as f64 + p[2] as f64) / (3.0 * 255.0);
    }
    let max_i = intensity.iter().copied().fold(0.0f64, f64::max);

    let mut rg = alloc_buffer(sz, 0.0f64)?;
    let mut by = alloc_buffer(sz, 0.0f64)?;
    for (i, p) in image.pixels().enumerate() {
        let lum = intensity[i];
        // Near-black pixels keep zero chromaticity.
        if lum < 0.1 * max_i || lum <= 0.0 {
            continue;
        }
        let r = p[0] as f64 / 255.0 / lum;
        let g = p[1] as f64 / 255.0 / lum;
        let b = p[2] as f64 / 255.0 / lum;
        let red = (r - (g + b) / 2.0).max(0.0);
        let green = (g - (b + r) / 2.0).max(0.0);
        let blue = (b - (r + g) / 2.0).max(0.0);
        let yellow = ((r + g) / 2.0 - (r - g).abs() / 2.0 - b).max(0.0);
        rg[i] = (red - green).abs();
        by[i] = (blue - yellow).abs();
    }
    Ok(OpponentMaps { intensity, rg, by })
}

/// `|mean((mean_x - x) * (mean_y - y))|` over the samples, `None` when empty.
pub fn motion_dispersion(samples: &[[f32; 2]]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let (sx, sy) = samples.iter().fold((0.0f64, 0.0f64), |(ax, ay), v| (ax + v[0] as f64, ay + v[1] as f64));
    let (mx, my) = (sx / n, sy / n);
    let cov: f64 = samples.iter().map(|v| (mx - v[0] as f64) * (my - v[1] as f64)).sum();
    Some((cov / n).abs())
}

/// Whether a region's motion is consistent and covers enough of it.
pub fn is_coherent(region: &RegionRecord, thresholds: &CoherenceThresholds) -> bool {
    match motion_dispersion(&region.raw_flow) {
        Some(d) => d < thresholds.max_dispersion && region.motion_coverage() >= thresholds.min_coverage,
        None => false,
    }
}

/// Builds one record per label in `[0, num_labels)` from a single pass over the image.
pub fn aggregate_regions(
    labels: &[i32],
    num_labels: usize,
    image: &RgbImage,
    motion: &MotionField,
    thresholds: &CoherenceThresholds,
) -> Result<Vec<RegionRecord>> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    motion.check_matches(w, h)?;
    if labels.len() != w * h {
        return Err(Error::InvalidArgument(format!(
            "label map has {} entries, image is {}x{}",
            labels.len(),
            w,
            h
        )));
    }

    let maps = opponent_maps(image)?;
    let mut regions: Vec<RegionRecord> = (0..num_labels).map(RegionRecord::new).collect();
    let mut flow_sums = vec![[0.0f64; 2]; num_labels];

    for (index, ((&label, p), v)) in labels.iter().zip(image.pixels()).zip(motion.vectors()).enumerate() {
        if label < 0 || label as usize >= num_labels {
            return Err(Error::LabelOutOfRange { index, label, num_labels });
        }
        let li = label as usize;
        let r = &mut regions[li];
        r.size += 1;
        r.center_x += (index % w) as f64;
        r.center_y += (index / w) as f64;
        r.color = r.color.add(Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64));
        r.intensity += maps.intensity[index];
        r.rg += maps.rg[index];
        r.by += maps.by[index];
        flow_sums[li][0] += v[0] as f64;
        flow_sums[li][1] += v[1] as f64;
        if *v != [0.0, 0.0] {
            r.raw_flow.push(*v);
        }
    }

    let mut coherent = 0usize;
    for (r, flow) in regions.iter_mut().zip(&flow_sums) {
        let n = r.size.max(1) as f64;
        r.center_x /= n;
        r.center_y /= n;
        r.color = r.color.scale(1.0 / n);
        r.intensity /= n;
        r.rg /= n;
        r.by /= n;
        if !r.raw_flow.is_empty() {
            let m = r.raw_flow.len() as f64;
            r.flow = [flow[0] / m, flow[1] / m];
        }
        r.coherent = is_coherent(r, thresholds);
        if r.coherent {
            coherent += 1;
        }
    }
    debug!("aggregated {} regions, {} coherent", regions.len(), coherent);
    Ok(regions)
}
