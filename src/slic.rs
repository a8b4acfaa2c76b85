use log::{debug, warn};
use std::thread;

use crate::color::{LabImage, Vec3};
use crate::error::{alloc_buffer, Error, Result};
use crate::seeds::Seed;

/// Fixed number of assignment/update rounds.
pub const SLIC_ITERATIONS: usize = 10;

/// Label of a pixel no seed has claimed yet.
pub const UNASSIGNED: i32 = -1;

#[derive(Default, Clone, Copy)]
struct Accum { count: usize, sum_x: f64, sum_y: f64, sum_l: f64, sum_a: f64, sum_b: f64 }

/// Localized weighted k-means over CIELAB + position.
///
/// Each seed only competes for pixels inside a `2*step` square around it, and the
/// spatial term is weighted by `(compactness / step)^2`. Seeds are moved to the
/// centroid of their pixels after every round. Returns the raw label map; `seeds`
/// hold the final centroids.
///
/// With `num_threads > 1` the assignment pass is split into bands of rows. Every band
/// visits the seeds in id order, so the labels do not depend on the thread count.
pub fn perform_slic(
    image: &LabImage,
    seeds: &mut [Seed],
    step: usize,
    compactness: f64,
    num_threads: usize,
) -> Result<Vec<i32>> {
    if step == 0 {
        return Err(Error::InvalidArgument("step size must be positive".into()));
    }
    if !(compactness.is_finite() && compactness > 0.0) {
        return Err(Error::InvalidArgument(format!("compactness must be positive, got {}", compactness)));
    }
    if let Some(seed) = seeds.iter().find(|s| s.id >= seeds.len()) {
        return Err(Error::InvalidArgument(format!("seed id {} out of range for {} seeds", seed.id, seeds.len())));
    }
    let (w, h) = (image.width(), image.height());
    let sz = w * h;
    let mut labels = alloc_buffer(sz, UNASSIGNED)?;
    let mut distances = alloc_buffer(sz, f64::MAX)?;

    let s = step as f64;
    let inv_wt = 1.0 / ((s / compactness) * (s / compactness));
    let num_threads = num_threads.clamp(1, h);
    let band_rows = (h + num_threads - 1) / num_threads;

    let mut empty = 0;
    for iter in 0..SLIC_ITERATIONS {
        distances.fill(f64::MAX);
        {
            let frozen: &[Seed] = &*seeds;
            if num_threads == 1 {
                assign_band(image, frozen, step, inv_wt, 0, &mut labels, &mut distances);
            } else {
                thread::scope(|scope| {
                    let bands = labels.chunks_mut(band_rows * w).zip(distances.chunks_mut(band_rows * w));
                    for (b, (lab_band, dist_band)) in bands.enumerate() {
                        scope.spawn(move || {
                            assign_band(image, frozen, step, inv_wt, b * band_rows, lab_band, dist_band)
                        });
                    }
                });
            }
        }
        empty = update_centroids(image, seeds, &labels);
        debug!("SLIC iter={} seeds={} empty={}", iter + 1, seeds.len(), empty);
    }

    if empty > 0 {
        warn!("{} seeds own no pixels after {} iterations", empty, SLIC_ITERATIONS);
    }
    let unassigned = labels.iter().filter(|&&l| l == UNASSIGNED).count();
    if unassigned > 0 {
        warn!("{} pixels were never reached by a seed window", unassigned);
    }
    Ok(labels)
}

/// Assigns the pixels of rows `row_start..row_start + labels.len() / width`.
fn assign_band(
    image: &LabImage,
    seeds: &[Seed],
    step: usize,
    inv_wt: f64,
    row_start: usize,
    labels: &mut [i32],
    distances: &mut [f64],
) {
    let (w, h) = (image.width(), image.height());
    let row_end = row_start + labels.len() / w;
    let offset = step as f64;
    let pixels = image.pixels();

    for seed in seeds {
        let y1 = (seed.y - offset).max(0.0) as usize;
        let y2 = (seed.y + offset).min(h as f64) as usize;
        let x1 = (seed.x - offset).max(0.0) as usize;
        let x2 = (seed.x + offset).min(w as f64) as usize;
        let (ylo, yhi) = (y1.max(row_start), y2.min(row_end));

        for y in ylo..yhi {
            let dy = y as f64 - seed.y;
            for x in x1..x2 {
                let i = y * w + x;
                let local = i - row_start * w;
                let dx = x as f64 - seed.x;
                let dist = pixels[i].dist_sq(seed.color) + (dx * dx + dy * dy) * inv_wt;
                if dist < distances[local] {
                    distances[local] = dist;
                    labels[local] = seed.id as i32;
                }
            }
        }
    }
}

/// Moves every seed to the mean color/position of its pixels. Returns how many seeds
/// owned no pixels; those stay where they were.
fn update_centroids(image: &LabImage, seeds: &mut [Seed], labels: &[i32]) -> usize {
    let w = image.width();
    let mut accums = vec![Accum::default(); seeds.len()];
    for (i, (&label, p)) in labels.iter().zip(image.pixels()).enumerate() {
        if label < 0 {
            continue;
        }
        let a = &mut accums[label as usize];
        a.count += 1;
        a.sum_x += (i % w) as f64;
        a.sum_y += (i / w) as f64;
        a.sum_l += p.x; a.sum_a += p.y; a.sum_b += p.z;
    }

    let mut empty = 0;
    for (seed, a) in seeds.iter_mut().zip(&accums) {
        if a.count == 0 {
            empty += 1;
            continue;
        }
        let inv = 1.0 / a.count as f64;
        seed.color = Vec3 { x: a.sum_l * inv, y: a.sum_a * inv, z: a.sum_b * inv };
        seed.x = a.sum_x * inv;
        seed.y = a.sum_y * inv;
    }
    empty
}
