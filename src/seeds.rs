use log::debug;

use crate::color::{LabImage, Vec3};
use crate::error::{Error, Result};

/// A cluster center. `id` is stable across iterations; position and color are not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seed {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub color: Vec3,
}

/// How many superpixels the caller wants, either directly or by region size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuperpixelTarget {
    /// Desired number of superpixels.
    Count(usize),
    /// Desired pixels per superpixel.
    Size(usize),
}

#[inline]
pub(crate) fn round_half_even(v: f64) -> i64 { v.round_ties_even() as i64 }

/// Grid step S for the requested target on a `width` x `height` image. Never less than 1.
pub fn step_size(width: usize, height: usize, target: SuperpixelTarget) -> Result<usize> {
    let size = match target {
        SuperpixelTarget::Count(0) => {
            return Err(Error::InvalidArgument("superpixel count must be positive".into()))
        }
        SuperpixelTarget::Size(0) => {
            return Err(Error::InvalidArgument("superpixel size must be positive".into()))
        }
        SuperpixelTarget::Count(k) => round_half_even((width * height) as f64 / k as f64),
        SuperpixelTarget::Size(s) => s as i64,
    };
    let step = round_half_even((size.max(0) as f64).sqrt());
    Ok(step.max(1) as usize)
}

struct AxisLayout {
    strips: usize,
    offset: usize,
    err_per_strip: f64,
}

impl AxisLayout {
    fn new(extent: usize, step: usize) -> Self {
        let (extent_i, step_i) = (extent as i64, step as i64);
        let mut strips = round_half_even(extent as f64 / step as f64);
        let mut err = extent_i - step_i * strips;
        if err < 0 {
            strips -= 1;
            err = extent_i - step_i * strips;
        }
        if strips <= 0 {
            // Image narrower than one step: a single centered seed.
            return Self { strips: 1, offset: extent / 2, err_per_strip: 0.0 };
        }
        Self { strips: strips as usize, offset: step / 2, err_per_strip: err as f64 / strips as f64 }
    }

    fn position(&self, strip: usize, step: usize) -> usize {
        strip * step + self.offset + round_half_even(strip as f64 * self.err_per_strip) as usize
    }
}

/// Lays seeds out on a regular grid with spacing `step`, reading each seed's color
/// from the pixel under it.
pub fn plan_seeds(image: &LabImage, step: usize) -> Vec<Seed> {
    let step = step.max(1);
    let (w, h) = (image.width(), image.height());
    let xs = AxisLayout::new(w, step);
    let ys = AxisLayout::new(h, step);

    let mut seeds = Vec::with_capacity(xs.strips * ys.strips);
    for sy in 0..ys.strips {
        let y = ys.position(sy, step).min(h - 1);
        for sx in 0..xs.strips {
            let x = xs.position(sx, step).min(w - 1);
            seeds.push(Seed { id: seeds.len(), x: x as f64, y: y as f64, color: image.get(x, y) });
        }
    }
    debug!("planned {} seeds ({}x{} strips, step {})", seeds.len(), xs.strips, ys.strips, step);
    seeds
}

/// Moves each seed to the lowest-edge pixel among itself and its 8 neighbors.
/// `edges` must hold one value per pixel and every seed must lie inside the image.
pub fn perturb_seeds(seeds: &mut [Seed], image: &LabImage, edges: &[f64]) -> Result<()> {
    const DX8: [i64; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
    const DY8: [i64; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
    if edges.len() != image.width() * image.height() {
        return Err(Error::InvalidArgument(format!(
            "edge map has {} values, expected {}x{}",
            edges.len(),
            image.width(),
            image.height()
        )));
    }
    let (w, h) = (image.width() as i64, image.height() as i64);
    if let Some(seed) = seeds.iter().find(|s| !(s.x >= 0.0 && s.x < w as f64 && s.y >= 0.0 && s.y < h as f64)) {
        return Err(Error::InvalidArgument(format!("seed {} at ({}, {}) lies outside the image", seed.id, seed.x, seed.y)));
    }

    let mut moved = 0usize;
    for seed in seeds.iter_mut() {
        let (ox, oy) = (seed.x as i64, seed.y as i64);
        let oind = (oy * w + ox) as usize;
        let mut best = oind;
        for i in 0..8 {
            let (nx, ny) = (ox + DX8[i], oy + DY8[i]);
            if nx >= 0 && nx < w && ny >= 0 && ny < h {
                let nind = (ny * w + nx) as usize;
                if edges[nind] < edges[best] {
                    best = nind;
                }
            }
        }
        if best != oind {
            let (bx, by) = (best % w as usize, best / w as usize);
            seed.x = bx as f64;
            seed.y = by as f64;
            seed.color = image.get(bx, by);
            moved += 1;
        }
    }
    debug!("perturbation moved {} of {} seeds", moved, seeds.len());
    Ok(())
}
